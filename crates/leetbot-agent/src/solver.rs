//! The agent loop: extract the daily problem, then let the model drive the
//! generate / test / submit / fix cycle through the tool menu, bounded by
//! explicit turn and repair budgets.

use crate::llm::{system_message, tool_message, user_message, ChatModel, LlmError};
use crate::prompts;
use crate::tools::{self, ToolAction};
use leetbot_session::session::{DailyProblem, Language, ProblemDetails, ProblemSession, RunOutcome};
use leetbot_session::SessionError;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct SolverLimits {
    /// Assistant turns before the workflow is cut off.
    pub max_turns: usize,
    /// Regenerate-and-retest cycles allowed after failing tests.
    pub max_fix_rounds: usize,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            max_turns: 24,
            max_fix_rounds: 3,
        }
    }
}

/// Terminal outcome of a workflow run.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub accepted: bool,
    /// Markdown summary, rendered into the result page.
    pub summary: String,
}

impl SolveReport {
    fn failure(summary: String) -> Self {
        SolveReport {
            accepted: false,
            summary,
        }
    }
}

/// Only model/API failures are fatal; session failures terminate the loop
/// with a failure report instead.
#[derive(thiserror::Error, Debug)]
pub enum SolveError {
    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub struct Solver<'a> {
    session: &'a mut dyn ProblemSession,
    model: &'a dyn ChatModel,
    limits: SolverLimits,
    language: Language,
}

impl<'a> Solver<'a> {
    pub fn new(session: &'a mut dyn ProblemSession, model: &'a dyn ChatModel) -> Self {
        Self {
            session,
            model,
            limits: SolverLimits::default(),
            language: Language::Python3,
        }
    }

    pub fn with_limits(mut self, limits: SolverLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Authenticate and scrape everything the conversation needs.
    async fn extract(&mut self) -> Result<(DailyProblem, ProblemDetails), SessionError> {
        self.session.authenticate().await?;
        let problem = self.session.fetch_daily_problem().await?;
        self.session.open_problem(&problem).await?;
        self.session.select_language(self.language).await?;
        let details = self.session.problem_details().await?;
        Ok((problem, details))
    }

    pub async fn run(&mut self) -> Result<SolveReport, SolveError> {
        let (problem, details) = match self.extract().await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Workflow aborted during extraction: {}", e);
                return Ok(SolveReport::failure(format!(
                    "Workflow aborted during extraction: {}",
                    e
                )));
            }
        };

        let tool_defs = tools::tool_definitions();
        let mut messages = vec![
            system_message(prompts::SYSTEM_PROMPT),
            user_message(&prompts::problem_prompt(
                &problem.title,
                &details.statement,
                &details.starter_code,
            )),
        ];

        let mut last_test: Option<RunOutcome> = None;
        let mut submission: Option<RunOutcome> = None;
        let mut fix_rounds = 0usize;

        for turn_index in 0..self.limits.max_turns {
            let turn = self.model.complete_with_tools(&messages, &tool_defs).await?;
            messages.push(turn.raw_message.clone());

            if turn.tool_calls.is_empty() {
                // The model stopped calling tools; treat its text as the
                // closing summary.
                let summary = turn
                    .text
                    .unwrap_or_else(|| "The assistant ended without a summary.".into());
                return Ok(SolveReport {
                    accepted: submission.as_ref().is_some_and(|o| o.passed),
                    summary,
                });
            }

            for call in &turn.tool_calls {
                info!(turn = turn_index, tool = %call.name, "dispatching tool call");
                let reply = match ToolAction::parse(&call.name, &call.arguments) {
                    Err(e) => format!("Tool error: {}", e),

                    Ok(ToolAction::GenerateCode) => {
                        let completion = self
                            .model
                            .complete_text(&prompts::generation_prompt(
                                &details.statement,
                                &details.starter_code,
                            ))
                            .await?;
                        let code = prompts::extract_code(&completion);
                        format!("Generated code:\n```python\n{}\n```", code)
                    }

                    Ok(ToolAction::FixCode { code, error }) => {
                        if fix_rounds >= self.limits.max_fix_rounds {
                            return Ok(SolveReport::failure(format!(
                                "Giving up: repair budget of {} rounds exhausted.",
                                self.limits.max_fix_rounds
                            )));
                        }
                        fix_rounds += 1;
                        let completion = self
                            .model
                            .complete_text(&prompts::repair_prompt(
                                &details.statement,
                                &code,
                                &error,
                            ))
                            .await?;
                        let fixed = prompts::extract_code(&completion);
                        format!("Repaired code:\n```python\n{}\n```", fixed)
                    }

                    Ok(ToolAction::TestCode { code }) => match self.session.run_tests(&code).await
                    {
                        Ok(outcome) => {
                            let reply = format!("Test Result:\n{}", outcome.raw);
                            last_test = Some(outcome);
                            reply
                        }
                        Err(e) => {
                            return Ok(SolveReport::failure(format!("Code testing failed: {}", e)))
                        }
                    },

                    // Submission only after a test pass; a refusal goes back
                    // to the model as the tool result.
                    Ok(ToolAction::SubmitCode) => match &last_test {
                        Some(outcome) if outcome.passed => match self.session.submit().await {
                            Ok(result) => {
                                let reply = format!("Submission Result:\n{}", result.raw);
                                submission = Some(result);
                                reply
                            }
                            Err(e) => {
                                return Ok(SolveReport::failure(format!(
                                    "Code submission failed: {}",
                                    e
                                )))
                            }
                        },
                        _ => "Refused: the last test run did not pass. \
                              Call fix_code and test_code before submitting."
                            .to_string(),
                    },

                    Ok(ToolAction::Finish { summary }) => {
                        return Ok(SolveReport {
                            accepted: submission.as_ref().is_some_and(|o| o.passed),
                            summary: summary.clone(),
                        });
                    }
                };
                messages.push(tool_message(&call.id, &reply));
            }
        }

        Ok(SolveReport {
            accepted: submission.as_ref().is_some_and(|o| o.passed),
            summary: format!(
                "Giving up: turn budget of {} exhausted before the workflow finished.",
                self.limits.max_turns
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatTurn, ToolCall};
    use async_trait::async_trait;
    use leetbot_session::session::AuthMethod;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FakeSession {
        calls: Vec<String>,
        auth_error: Option<SessionError>,
        statement: String,
        starter_code: String,
        test_outcomes: VecDeque<RunOutcome>,
        submit_outcome: Option<RunOutcome>,
    }

    impl FakeSession {
        fn new(statement: &str, starter_code: &str) -> Self {
            Self {
                calls: Vec::new(),
                auth_error: None,
                statement: statement.into(),
                starter_code: starter_code.into(),
                test_outcomes: VecDeque::new(),
                submit_outcome: None,
            }
        }

        fn with_test_outcomes(mut self, outcomes: Vec<&str>) -> Self {
            self.test_outcomes = outcomes
                .into_iter()
                .map(|raw| RunOutcome::classify(raw.into()))
                .collect();
            self
        }

        fn with_submit_outcome(mut self, raw: &str) -> Self {
            self.submit_outcome = Some(RunOutcome::classify(raw.into()));
            self
        }
    }

    #[async_trait]
    impl ProblemSession for FakeSession {
        async fn authenticate(&mut self) -> Result<AuthMethod, SessionError> {
            self.calls.push("authenticate".into());
            match self.auth_error.take() {
                Some(e) => Err(e),
                None => Ok(AuthMethod::CookieReplay),
            }
        }

        async fn fetch_daily_problem(&mut self) -> Result<DailyProblem, SessionError> {
            self.calls.push("fetch_daily_problem".into());
            Ok(DailyProblem {
                url: "https://leetcode.com/problems/two-sum/description/".into(),
                title: "Two Sum".into(),
                slug: "two-sum".into(),
            })
        }

        async fn open_problem(&mut self, _problem: &DailyProblem) -> Result<(), SessionError> {
            self.calls.push("open_problem".into());
            Ok(())
        }

        async fn select_language(&mut self, _language: Language) -> Result<(), SessionError> {
            self.calls.push("select_language".into());
            Ok(())
        }

        async fn problem_details(&mut self) -> Result<ProblemDetails, SessionError> {
            self.calls.push("problem_details".into());
            Ok(ProblemDetails {
                statement: self.statement.clone(),
                starter_code: self.starter_code.clone(),
            })
        }

        async fn insert_code(&mut self, _code: &str) -> Result<(), SessionError> {
            self.calls.push("insert_code".into());
            Ok(())
        }

        async fn run_tests(&mut self, _code: &str) -> Result<RunOutcome, SessionError> {
            self.calls.push("run_tests".into());
            self.test_outcomes
                .pop_front()
                .ok_or_else(|| SessionError::Interaction("no scripted test outcome".into()))
        }

        async fn submit(&mut self) -> Result<RunOutcome, SessionError> {
            self.calls.push("submit".into());
            self.submit_outcome
                .clone()
                .ok_or_else(|| SessionError::Interaction("no scripted submit outcome".into()))
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            self.calls.push("close".into());
            Ok(())
        }
    }

    struct FakeModel {
        turns: Mutex<VecDeque<ChatTurn>>,
        completions: Mutex<VecDeque<String>>,
    }

    impl FakeModel {
        fn new(turns: Vec<ChatTurn>, completions: Vec<&str>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
                completions: Mutex::new(completions.into_iter().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn complete_with_tools(
            &self,
            _messages: &[Value],
            _tools: &Value,
        ) -> Result<ChatTurn, LlmError> {
            self.turns
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Protocol("no scripted turn left".into()))
        }

        async fn complete_text(&self, _prompt: &str) -> Result<String, LlmError> {
            self.completions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Protocol("no scripted completion left".into()))
        }
    }

    fn tool_turn(calls: Vec<(&str, &str, Value)>) -> ChatTurn {
        let tool_calls: Vec<ToolCall> = calls
            .iter()
            .map(|(id, name, args)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args.clone(),
            })
            .collect();
        ChatTurn {
            text: None,
            tool_calls,
            raw_message: json!({"role": "assistant", "content": null}),
        }
    }

    fn text_turn(text: &str) -> ChatTurn {
        ChatTurn {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            raw_message: json!({"role": "assistant", "content": text}),
        }
    }

    const CODE: &str = "```python\ndef twoSum(nums, target):\n    return []\n```";

    #[tokio::test]
    async fn refuses_submission_until_tests_pass_then_submits() {
        // The model tries to submit right after a failing test; the guard
        // must bounce it back, and only the post-repair pass may submit.
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):")
            .with_test_outcomes(vec!["Wrong Answer\nExpected [0,1]", "Accepted"])
            .with_submit_outcome("Accepted");
        let model = FakeModel::new(
            vec![
                tool_turn(vec![("c1", "generate_code", json!({}))]),
                tool_turn(vec![("c2", "test_code", json!({"code": "bad"}))]),
                tool_turn(vec![("c3", "submit_code", json!({}))]),
                tool_turn(vec![(
                    "c4",
                    "fix_code",
                    json!({"code": "bad", "error": "Wrong Answer"}),
                )]),
                tool_turn(vec![("c5", "test_code", json!({"code": "good"}))]),
                tool_turn(vec![("c6", "submit_code", json!({}))]),
                tool_turn(vec![("c7", "finish", json!({"summary": "Verdict: Accepted"}))]),
            ],
            vec![CODE, CODE],
        );

        let report = Solver::new(&mut session, &model).run().await.unwrap();

        assert!(report.accepted);
        let submits: Vec<usize> = session
            .calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == "submit")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(submits.len(), 1, "exactly one submission: {:?}", session.calls);
        let last_run = session
            .calls
            .iter()
            .rposition(|c| c == "run_tests")
            .unwrap();
        assert!(submits[0] > last_run, "submission after the passing retest");
    }

    #[tokio::test]
    async fn submission_never_reaches_session_while_tests_fail() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):")
            .with_test_outcomes(vec!["Runtime Error\nNameError"]);
        let model = FakeModel::new(
            vec![
                tool_turn(vec![("c1", "test_code", json!({"code": "bad"}))]),
                tool_turn(vec![("c2", "submit_code", json!({}))]),
                tool_turn(vec![("c3", "finish", json!({"summary": "gave up"}))]),
            ],
            vec![],
        );

        let report = Solver::new(&mut session, &model).run().await.unwrap();

        assert!(!report.accepted);
        assert!(
            !session.calls.iter().any(|c| c == "submit"),
            "submit must not reach the session: {:?}",
            session.calls
        );
    }

    #[tokio::test]
    async fn end_to_end_accepted_flow() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):")
            .with_test_outcomes(vec!["Passed"])
            .with_submit_outcome("Accepted");
        let model = FakeModel::new(
            vec![
                tool_turn(vec![("c1", "generate_code", json!({}))]),
                tool_turn(vec![("c2", "test_code", json!({"code": "ok"}))]),
                tool_turn(vec![("c3", "submit_code", json!({}))]),
                tool_turn(vec![(
                    "c4",
                    "finish",
                    json!({"summary": "## Solved\nFinal verdict: **Accepted**"}),
                )]),
            ],
            vec![CODE],
        );

        let report = Solver::new(&mut session, &model).run().await.unwrap();

        assert!(report.accepted);
        assert!(report.summary.contains("Accepted"));
        assert_eq!(
            session.calls,
            vec![
                "authenticate",
                "fetch_daily_problem",
                "open_problem",
                "select_language",
                "problem_details",
                "run_tests",
                "submit"
            ]
        );
    }

    #[tokio::test]
    async fn extraction_failure_short_circuits_to_failure_report() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):");
        session.auth_error = Some(SessionError::Authentication("cookies rejected".into()));
        let model = FakeModel::new(vec![], vec![]);

        let report = Solver::new(&mut session, &model).run().await.unwrap();

        assert!(!report.accepted);
        assert!(report.summary.contains("Authentication failed"));
        assert_eq!(session.calls, vec!["authenticate"]);
    }

    #[tokio::test]
    async fn session_failure_during_testing_ends_with_failure_report() {
        // No scripted outcome: run_tests reports an interaction failure.
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):");
        let model = FakeModel::new(
            vec![tool_turn(vec![("c1", "test_code", json!({"code": "x"}))])],
            vec![],
        );

        let report = Solver::new(&mut session, &model).run().await.unwrap();

        assert!(!report.accepted);
        assert!(report.summary.contains("Code testing failed"));
    }

    #[tokio::test]
    async fn repair_budget_is_bounded() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):")
            .with_test_outcomes(vec!["failed"; 8]);
        let fix = ("f", "fix_code", json!({"code": "bad", "error": "failed"}));
        let test = ("t", "test_code", json!({"code": "bad"}));
        let model = FakeModel::new(
            vec![
                tool_turn(vec![test.clone()]),
                tool_turn(vec![fix.clone()]),
                tool_turn(vec![test.clone()]),
                tool_turn(vec![fix.clone()]),
                tool_turn(vec![test.clone()]),
                tool_turn(vec![fix.clone()]),
                tool_turn(vec![test.clone()]),
                tool_turn(vec![fix.clone()]),
            ],
            vec![CODE, CODE, CODE],
        );

        let report = Solver::new(&mut session, &model).run().await.unwrap();

        assert!(!report.accepted);
        assert!(report.summary.contains("repair budget"));
        // Three repairs ran; the fourth was cut off.
        assert_eq!(
            session.calls.iter().filter(|c| *c == "run_tests").count(),
            4
        );
    }

    #[tokio::test]
    async fn turn_budget_is_bounded() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):");
        let model = FakeModel::new(
            vec![
                tool_turn(vec![("c1", "generate_code", json!({}))]),
                tool_turn(vec![("c2", "generate_code", json!({}))]),
                tool_turn(vec![("c3", "generate_code", json!({}))]),
            ],
            vec![CODE, CODE, CODE],
        );

        let report = Solver::new(&mut session, &model)
            .with_limits(SolverLimits {
                max_turns: 2,
                max_fix_rounds: 3,
            })
            .run()
            .await
            .unwrap();

        assert!(!report.accepted);
        assert!(report.summary.contains("turn budget"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_back_not_fatal() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):");
        let model = FakeModel::new(
            vec![
                tool_turn(vec![("c1", "rm_rf", json!({}))]),
                tool_turn(vec![("c2", "finish", json!({"summary": "stopping"}))]),
            ],
            vec![],
        );

        let report = Solver::new(&mut session, &model).run().await.unwrap();
        assert!(!report.accepted);
        assert_eq!(report.summary, "stopping");
    }

    #[tokio::test]
    async fn model_error_is_fatal() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):");
        let model = FakeModel::new(vec![], vec![]);

        let result = Solver::new(&mut session, &model).run().await;
        assert!(matches!(result, Err(SolveError::Llm(_))));
    }

    #[tokio::test]
    async fn text_turn_without_tools_ends_the_loop() {
        let mut session = FakeSession::new("Two Sum", "def twoSum(...):");
        let model = FakeModel::new(vec![text_turn("Nothing more to do.")], vec![]);

        let report = Solver::new(&mut session, &model).run().await.unwrap();
        assert!(!report.accepted);
        assert_eq!(report.summary, "Nothing more to do.");
    }
}
