//! The fixed tool menu the model chooses from, as a tagged union. Wire
//! names are parsed into `ToolAction` once; dispatch is an explicit match
//! in the solver, not a lookup by name.

use serde_json::{json, Value};

#[derive(thiserror::Error, Debug)]
pub enum ToolParseError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool {tool} is missing required argument {argument}")]
    MissingArgument {
        tool: &'static str,
        argument: &'static str,
    },
}

/// Everything the model is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    /// Produce a first candidate solution from the problem statement.
    GenerateCode,
    /// Run the site's test harness against a candidate.
    TestCode { code: String },
    /// Submit the last tested candidate. Refused unless the last test
    /// passed.
    SubmitCode,
    /// Regenerate a candidate from the failing code and the error text.
    FixCode { code: String, error: String },
    /// End the workflow with a summary.
    Finish { summary: String },
}

impl ToolAction {
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolParseError> {
        let string_arg = |tool: &'static str, argument: &'static str| {
            arguments
                .get(argument)
                .and_then(|v| v.as_str())
                .map(ToOwned::to_owned)
                .ok_or(ToolParseError::MissingArgument { tool, argument })
        };

        match name {
            "generate_code" => Ok(ToolAction::GenerateCode),
            "test_code" => Ok(ToolAction::TestCode {
                code: string_arg("test_code", "code")?,
            }),
            "submit_code" => Ok(ToolAction::SubmitCode),
            "fix_code" => Ok(ToolAction::FixCode {
                code: string_arg("fix_code", "code")?,
                error: string_arg("fix_code", "error")?,
            }),
            "finish" => Ok(ToolAction::Finish {
                summary: string_arg("finish", "summary")?,
            }),
            other => Err(ToolParseError::UnknownTool(other.to_string())),
        }
    }
}

/// Tool declarations in OpenAI function-call form.
pub fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "generate_code",
                "description": "Generate a candidate solution for the extracted problem statement using the starter code template. Returns the generated code.",
                "parameters": { "type": "object", "properties": {} }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "test_code",
                "description": "Insert the code into the site's editor and run it against the example test cases. Returns the test result text.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "code": { "type": "string", "description": "The candidate solution to test" }
                    },
                    "required": ["code"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "submit_code",
                "description": "Submit the last tested solution. Only allowed after the tests passed.",
                "parameters": { "type": "object", "properties": {} }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "fix_code",
                "description": "Regenerate the solution from the previous code and the error the test run reported. Returns the repaired code.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "code": { "type": "string", "description": "The failing code" },
                        "error": { "type": "string", "description": "The test failure or error text" }
                    },
                    "required": ["code", "error"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "finish",
                "description": "End the workflow with a markdown summary of the outcome.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "summary": { "type": "string", "description": "Markdown summary of what happened" }
                    },
                    "required": ["summary"]
                }
            }
        }
    ])
}
