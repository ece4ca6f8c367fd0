//! Prompt templates and the fenced-code extraction they rely on.

use regex::Regex;
use std::sync::LazyLock;

pub const SYSTEM_PROMPT: &str = "\
You are an assistant that solves the daily LeetCode problem through a fixed tool menu.
Workflow: generate_code -> test_code -> if the tests passed, submit_code; \
if they failed, fix_code with the failing code and the error text, then test_code again.
Never call submit_code while the last test run failed.
When the submission result is known, call finish with a short markdown summary \
that quotes the final verdict and the submitted code.";

pub fn problem_prompt(title: &str, statement: &str, starter_code: &str) -> String {
    format!(
        "Please solve today's LeetCode problem: {title}\n\n\
         problem_statement:\n{statement}\n\n\
         code_template:\n{starter_code}"
    )
}

pub fn generation_prompt(statement: &str, starter_code: &str) -> String {
    format!(
        "You are given a LeetCode problem statement and a code template.\n\
         Generate a complete solution that fills in the template.\n\
         Reply with a single fenced block: ```python [code]```.\n\n\
         Problem Statement:\n{statement}\n\n\
         Code Template:\n{starter_code}"
    )
}

pub fn repair_prompt(statement: &str, code: &str, error: &str) -> String {
    format!(
        "You are given a problem statement, previously generated code and the error it produced.\n\
         Update the code to fix the error.\n\
         Reply with a single fenced block: ```python [code]```.\n\n\
         Problem Statement:\n{statement}\n\n\
         Error:\n{error}\n\n\
         Previous Code:\n{code}"
    )
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z0-9_+\-]*[ \t]*\r?\n(.*?)```").unwrap()
});

/// Pull the solution out of a completion. Takes the last fenced block so a
/// chatty preamble with inline snippets does not win; falls back to the
/// trimmed completion when there is no fence at all.
pub fn extract_code(completion: &str) -> String {
    FENCE
        .captures_iter(completion)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end().to_string())
        .unwrap_or_else(|| completion.trim().to_string())
}
