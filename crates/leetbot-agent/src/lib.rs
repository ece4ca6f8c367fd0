pub mod llm;
pub mod prompts;
pub mod solver;
pub mod tools;

pub use llm::{ChatModel, ChatTurn, LlmConfig, LlmError, OpenAiChat, ToolCall};
pub use solver::{SolveReport, Solver, SolverLimits};
pub use tools::ToolAction;
