pub mod cdp;
pub mod cookies;
pub mod error;
pub mod selectors;
pub mod session;
pub mod wait;

pub use error::SessionError;
pub use session::{
    AuthMethod, AuthState, DailyProblem, Language, LeetCodeSession, ProblemDetails,
    ProblemSession, RunOutcome, SessionOptions,
};
