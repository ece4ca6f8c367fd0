//! The session manager: one authenticated browser session against
//! leetcode.com, exposing the scrape/act operations the agent loop drives.

use crate::cdp::CdpClient;
use crate::cookies::{CookieStore, StoredCookie};
use crate::error::SessionError;
use crate::selectors;
use crate::wait::{self, DEFAULT_WAIT};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use chrono::Utc;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// How long the human gets to finish sign-in and CAPTCHA.
const LOGIN_CONFIRM_TIMEOUT: Duration = Duration::from_secs(120);

/// The submission verdict panel repopulates asynchronously; give it a
/// moment before scraping.
const SUBMIT_SETTLE: Duration = Duration::from_secs(5);

/// Ctrl modifier flag for CDP key events.
const MODIFIER_CTRL: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python3,
    Cpp,
    Java,
    JavaScript,
    Rust,
}

impl Language {
    /// Label as it appears in the editor's language switcher.
    pub fn label(&self) -> &'static str {
        match self {
            Language::Python3 => "Python3",
            Language::Cpp => "C++",
            Language::Java => "Java",
            Language::JavaScript => "JavaScript",
            Language::Rust => "Rust",
        }
    }

    /// Labels the switcher button may currently show, used to locate it
    /// whatever language is active.
    pub const SWITCHER_LABELS: &'static [&'static str] = &[
        "C++",
        "Java",
        "Python3",
        "Python",
        "C#",
        "JavaScript",
        "TypeScript",
        "Go",
        "Rust",
        "Kotlin",
        "Swift",
    ];
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python3" | "python" => Ok(Language::Python3),
            "c++" | "cpp" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "javascript" | "js" => Ok(Language::JavaScript),
            "rust" => Ok(Language::Rust),
            other => Err(format!("unknown language: {}", other)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Today's challenge, as resolved from the GraphQL daily query.
#[derive(Debug, Clone)]
pub struct DailyProblem {
    /// Dated detail URL the workflow navigates to.
    pub url: String,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct ProblemDetails {
    pub statement: String,
    pub starter_code: String,
}

/// Free-text outcome of a test run or submission plus the pass/fail
/// classification the loop branches on.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub raw: String,
    pub passed: bool,
}

impl RunOutcome {
    /// Classify a result-panel text. Failure markers win over the presence
    /// of "Accepted"/"Passed" (a failing run still echoes expected output).
    pub fn classify(raw: String) -> Self {
        let lower = raw.to_lowercase();
        let failed = [
            "wrong answer",
            "runtime error",
            "compile error",
            "time limit exceeded",
            "memory limit exceeded",
            "output limit",
            "failed",
        ]
        .iter()
        .any(|marker| lower.contains(marker));
        let passed = !failed && (lower.contains("accepted") || lower.contains("passed"));
        RunOutcome { raw, passed }
    }
}

/// How authentication was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    CookieReplay,
    Interactive,
}

/// Authentication progress. `AwaitingConfirmation` is the explicit
/// human-in-the-loop state: credentials are filled, the workflow is
/// suspended until the human finishes sign-in (CAPTCHA included) or the
/// confirmation timeout elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    NotAuthenticated,
    ReplayingCookies,
    AwaitingConfirmation,
    Authenticated,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Open a visible browser window. Required for the interactive-login
    /// fallback; headless is fine for cookie replay.
    pub headed: bool,
    pub cookie_file: PathBuf,
    pub credentials: Option<Credentials>,
}

/// The seam between the session manager and the agent loop. The loop only
/// ever talks to this trait, so tests drive it with a scripted fake.
#[async_trait]
pub trait ProblemSession: Send {
    async fn authenticate(&mut self) -> Result<AuthMethod, SessionError>;
    async fn fetch_daily_problem(&mut self) -> Result<DailyProblem, SessionError>;
    async fn open_problem(&mut self, problem: &DailyProblem) -> Result<(), SessionError>;
    async fn select_language(&mut self, language: Language) -> Result<(), SessionError>;
    async fn problem_details(&mut self) -> Result<ProblemDetails, SessionError>;
    async fn insert_code(&mut self, code: &str) -> Result<(), SessionError>;
    async fn run_tests(&mut self, code: &str) -> Result<RunOutcome, SessionError>;
    async fn submit(&mut self) -> Result<RunOutcome, SessionError>;

    /// Release the browser. Must be called on every exit path; idempotent.
    async fn close(&mut self) -> Result<(), SessionError>;
}

#[derive(Debug, Deserialize)]
struct DailyQuestionWire {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct LeetCodeSession {
    options: SessionOptions,
    cookies: CookieStore,
    client: Option<CdpClient>,
    auth_state: AuthState,
}

impl LeetCodeSession {
    pub fn new(options: SessionOptions) -> Self {
        let cookies = CookieStore::new(options.cookie_file.clone());
        Self {
            options,
            cookies,
            client: None,
            auth_state: AuthState::NotAuthenticated,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth_state
    }

    /// Raw CDP client, for callers (and tests) that need direct page access.
    pub fn client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    /// Start the browser. Separate from `new` so construction is cheap and
    /// the caller controls when the process appears.
    pub async fn launch(&mut self) -> Result<(), SessionError> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = CdpClient::launch(self.options.headed).await?;
        self.client = Some(client);
        Ok(())
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(SessionError::NotReady)
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|e| SessionError::Navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), SessionError> {
        let page = self.page()?;
        page.reload()
            .await
            .map_err(|e| SessionError::Navigation(format!("reload: {}", e)))?;
        Ok(())
    }

    async fn try_cookie_auth(&mut self) -> Result<bool, SessionError> {
        let stored = self.cookies.load()?;
        if stored.is_empty() {
            return Ok(false);
        }
        self.navigate(selectors::BASE_URL).await?;
        let params: Vec<_> = stored.iter().map(StoredCookie::to_param).collect();
        self.page()?
            .set_cookies(params)
            .await
            .map_err(|e| SessionError::Interaction(format!("set cookies: {}", e)))?;
        self.reload().await?;
        self.is_authenticated().await
    }

    /// Check for the logged-in indicator on the problem set page.
    async fn is_authenticated(&self) -> Result<bool, SessionError> {
        self.navigate(selectors::PROBLEMSET_URL).await?;
        let check = wait::wait_until(
            self.page()?,
            "navbar avatar (login indicator)",
            &selectors::present_expr(selectors::NAVBAR_AVATAR),
            DEFAULT_WAIT,
        )
        .await;
        match check {
            Ok(()) => Ok(true),
            // The avatar never appearing means "not logged in", not a
            // session failure.
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn interactive_login(&mut self) -> Result<(), SessionError> {
        let creds = self.options.credentials.clone().ok_or_else(|| {
            SessionError::Authentication(
                "cookie replay failed and no credentials are configured".into(),
            )
        })?;

        self.navigate(selectors::LOGIN_URL).await?;
        let page = self.page()?;
        wait::wait_until(
            page,
            "login form",
            &selectors::present_expr(selectors::LOGIN_EMAIL),
            DEFAULT_WAIT,
        )
        .await?;

        for (selector, value) in [
            (selectors::LOGIN_EMAIL, creds.email.as_str()),
            (selectors::LOGIN_PASSWORD, creds.password.as_str()),
        ] {
            let filled: bool =
                wait::eval(page, &selectors::fill_input_expr(selector, value)).await?;
            if !filled {
                return Err(SessionError::Interaction(format!(
                    "login field {} not found",
                    selector
                )));
            }
        }

        self.auth_state = AuthState::AwaitingConfirmation;
        info!(
            "Awaiting external confirmation: complete sign-in and CAPTCHA in the browser window ({}s budget)",
            LOGIN_CONFIRM_TIMEOUT.as_secs()
        );

        wait::wait_for_url(
            self.page()?,
            "login confirmation",
            "problemset",
            LOGIN_CONFIRM_TIMEOUT,
        )
        .await
        .map_err(|_| {
            SessionError::Authentication("login was not confirmed within the time budget".into())
        })
    }

    async fn persist_cookies(&self) -> Result<(), SessionError> {
        let cookies = self
            .page()?
            .get_cookies()
            .await
            .map_err(|e| SessionError::Interaction(format!("get cookies: {}", e)))?;
        let stored: Vec<StoredCookie> = cookies.into_iter().map(Into::into).collect();
        self.cookies.save(&stored)
    }

    async fn press_ctrl_a(&self) -> Result<(), SessionError> {
        let page = self.page()?;
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let event = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key("a")
                .code("KeyA")
                .windows_virtual_key_code(65)
                .native_virtual_key_code(65)
                .modifiers(MODIFIER_CTRL)
                .build()
                .map_err(|e| SessionError::Interaction(format!("key event: {:?}", e)))?;
            page.execute(event)
                .await
                .map_err(|e| SessionError::Interaction(format!("select-all: {}", e)))?;
        }
        Ok(())
    }

    async fn click_button(&self, label: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        wait::wait_until(
            page,
            &format!("{} button", label),
            &selectors::button_present_expr(label),
            DEFAULT_WAIT,
        )
        .await?;
        let clicked: bool = wait::eval(page, &selectors::click_button_expr(label)).await?;
        if !clicked {
            return Err(SessionError::Interaction(format!(
                "{} button disappeared before click",
                label
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProblemSession for LeetCodeSession {
    /// Cookie replay first; interactive login (with cookie persistence)
    /// as the fallback.
    async fn authenticate(&mut self) -> Result<AuthMethod, SessionError> {
        self.page()?;

        if self.cookies.exists() {
            self.auth_state = AuthState::ReplayingCookies;
            match self.try_cookie_auth().await {
                Ok(true) => {
                    info!("Authenticated via cookie replay");
                    self.auth_state = AuthState::Authenticated;
                    return Ok(AuthMethod::CookieReplay);
                }
                Ok(false) => info!("Cookie replay rejected, falling back to interactive login"),
                Err(e) => warn!("Cookie replay failed ({}), falling back", e),
            }
        } else {
            info!(
                "No cookie file at {}, interactive login required",
                self.cookies.path().display()
            );
        }

        self.interactive_login().await.map_err(|e| {
            self.auth_state = AuthState::NotAuthenticated;
            e
        })?;
        self.persist_cookies().await?;
        self.auth_state = AuthState::Authenticated;
        info!("Authenticated via interactive login, cookies persisted");
        Ok(AuthMethod::Interactive)
    }

    async fn fetch_daily_problem(&mut self) -> Result<DailyProblem, SessionError> {
        let page = self.page()?;
        let params = EvaluateParams::builder()
            .expression(selectors::daily_question_expr())
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(SessionError::Script)?;
        let result = page
            .evaluate(params)
            .await
            .map_err(|e| SessionError::Script(format!("daily query: {}", e)))?;
        let payload: String = result
            .into_value()
            .map_err(|e| SessionError::Script(format!("daily query result: {}", e)))?;
        let wire: DailyQuestionWire = serde_json::from_str(&payload)?;

        if let Some(err) = wire.error {
            return Err(SessionError::Script(format!("daily query failed: {}", err)));
        }
        let (link, title) = match (wire.link, wire.title) {
            (Some(l), Some(t)) => (l, t),
            _ => {
                return Err(SessionError::Script(
                    "daily query response missing link/title".into(),
                ))
            }
        };
        let slug = wire
            .slug
            .unwrap_or_else(|| link.trim_matches('/').rsplit('/').next().unwrap_or("").into());

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let problem = DailyProblem {
            url: daily_url(&link, &today),
            title,
            slug,
        };
        info!("Today's challenge: {} ({})", problem.title, problem.url);
        Ok(problem)
    }

    async fn open_problem(&mut self, problem: &DailyProblem) -> Result<(), SessionError> {
        self.navigate(&problem.url).await
    }

    async fn select_language(&mut self, language: Language) -> Result<(), SessionError> {
        let page = self.page()?;

        wait::wait_until(
            page,
            "language switcher",
            &selectors::click_language_switcher_expr(Language::SWITCHER_LABELS),
            DEFAULT_WAIT,
        )
        .await?;
        wait::wait_until(
            page,
            "language dropdown",
            &selectors::present_expr(selectors::LANGUAGE_DROPDOWN),
            DEFAULT_WAIT,
        )
        .await?;
        wait::wait_until(
            page,
            &format!("{} option", language.label()),
            &selectors::click_language_option_expr(language.label()),
            DEFAULT_WAIT,
        )
        .await?;
        wait::wait_until(
            page,
            &format!("{} selected", language.label()),
            &selectors::language_selected_expr(language.label()),
            DEFAULT_WAIT,
        )
        .await?;

        // Reload so the editor re-renders the starter template for the
        // freshly selected language.
        self.reload().await
    }

    async fn problem_details(&mut self) -> Result<ProblemDetails, SessionError> {
        let page = self.page()?;
        let statement = wait::wait_for_text(
            page,
            "problem statement",
            selectors::PROBLEM_STATEMENT,
            DEFAULT_WAIT,
        )
        .await?;
        let starter_code =
            wait::wait_for_text(page, "starter code", selectors::EDITOR_LINES, DEFAULT_WAIT)
                .await?;
        Ok(ProblemDetails {
            statement,
            starter_code,
        })
    }

    /// Replace the editor's content: focus, select-all, then a single CDP
    /// `Input.insertText` (paste-like, so the editor's auto-indent cannot
    /// mangle the code). Inserting over the selection makes this
    /// idempotent.
    async fn insert_code(&mut self, code: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        wait::wait_until(
            page,
            "code editor",
            &selectors::present_expr(selectors::EDITOR_INPUT),
            DEFAULT_WAIT,
        )
        .await?;
        let focused: bool = wait::eval(page, &selectors::focus_editor_expr()).await?;
        if !focused {
            return Err(SessionError::Interaction(
                "editor input disappeared before focus".into(),
            ));
        }
        self.press_ctrl_a().await?;
        self.page()?
            .execute(InsertTextParams::new(code))
            .await
            .map_err(|e| SessionError::Interaction(format!("insert text: {}", e)))?;
        Ok(())
    }

    async fn run_tests(&mut self, code: &str) -> Result<RunOutcome, SessionError> {
        self.insert_code(code).await?;
        self.click_button("Run").await?;
        let raw = wait::wait_for_text(
            self.page()?,
            "test result panel",
            selectors::TEST_RESULT_PANEL,
            DEFAULT_WAIT,
        )
        .await?;
        let outcome = RunOutcome::classify(raw);
        info!(passed = outcome.passed, "Test run finished");
        Ok(outcome)
    }

    async fn submit(&mut self) -> Result<RunOutcome, SessionError> {
        self.click_button("Submit").await?;
        tokio::time::sleep(SUBMIT_SETTLE).await;
        let raw = wait::wait_for_text(
            self.page()?,
            "submission result panel",
            selectors::SUBMIT_RESULT_PANEL,
            DEFAULT_WAIT,
        )
        .await?;
        let outcome = RunOutcome::classify(raw);
        info!(passed = outcome.passed, "Submission finished");
        Ok(outcome)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        if self.auth_state == AuthState::Authenticated {
            // Refresh the cookie file with whatever the site rotated during
            // the run; failure here must not block shutdown.
            let cookies = client.page.get_cookies().await;
            match cookies {
                Ok(cookies) => {
                    let stored: Vec<StoredCookie> = cookies.into_iter().map(Into::into).collect();
                    if let Err(e) = self.cookies.save(&stored) {
                        warn!("Failed to flush cookies on close: {}", e);
                    }
                }
                Err(e) => warn!("Failed to read cookies on close: {}", e),
            }
        }
        client.close().await
    }
}

/// Dated detail URL for a daily problem link (`/problems/two-sum/`).
fn daily_url(link: &str, date: &str) -> String {
    format!(
        "{}{}description/?envType=daily-question&envId={}",
        selectors::BASE_URL,
        link,
        date
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_url_is_dated() {
        let url = daily_url("/problems/two-sum/", "2026-08-27");
        assert_eq!(
            url,
            "https://leetcode.com/problems/two-sum/description/?envType=daily-question&envId=2026-08-27"
        );
    }

    #[test]
    fn classify_accepted_passes() {
        let outcome = RunOutcome::classify("Accepted\nRuntime: 52 ms".into());
        assert!(outcome.passed);
    }

    #[test]
    fn classify_wrong_answer_fails_despite_expected_echo() {
        let outcome =
            RunOutcome::classify("Wrong Answer\nExpected: [0,1]\nOutput: [1,0]".into());
        assert!(!outcome.passed);
    }

    #[test]
    fn classify_runtime_error_fails() {
        let outcome = RunOutcome::classify("Runtime Error\nNameError: x".into());
        assert!(!outcome.passed);
    }

    #[test]
    fn classify_unknown_text_is_not_a_pass() {
        let outcome = RunOutcome::classify("Pending...".into());
        assert!(!outcome.passed);
    }

    #[test]
    fn language_parses_case_insensitively() {
        assert_eq!("python3".parse::<Language>().unwrap(), Language::Python3);
        assert_eq!("CPP".parse::<Language>().unwrap(), Language::Cpp);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[tokio::test]
    async fn operations_before_launch_report_not_ready() {
        let mut session = LeetCodeSession::new(SessionOptions {
            headed: false,
            cookie_file: "unused-cookies.json".into(),
            credentials: None,
        });
        assert_eq!(session.auth_state(), AuthState::NotAuthenticated);
        assert!(matches!(
            session.authenticate().await,
            Err(SessionError::NotReady)
        ));
        // A failed authenticate must not claim any progress.
        assert_eq!(session.auth_state(), AuthState::NotAuthenticated);
        assert!(matches!(
            session.fetch_daily_problem().await,
            Err(SessionError::NotReady)
        ));
        // Closing a never-launched session is fine.
        assert!(session.close().await.is_ok());
    }
}
