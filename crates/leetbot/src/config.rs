//! Environment-driven configuration. Model settings are mandatory at
//! startup; site credentials are optional and only gate the interactive
//! login fallback.

use anyhow::{Context, Result};
use leetbot_agent::LlmConfig;
use leetbot_session::session::Credentials;
use std::path::PathBuf;

const DEFAULT_COOKIE_FILE: &str = "leetcode_cookies.json";
const DEFAULT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub cookie_file: PathBuf,
    pub credentials: Option<Credentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let endpoint = require("ENDPOINT")?;
        let api_key = require("API_KEY")?;
        let model = require("MODEL_NAME")?;

        let cookie_file = std::env::var("LEETBOT_COOKIE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_COOKIE_FILE));

        let credentials = match (
            std::env::var("LEETCODE_EMAIL"),
            std::env::var("LEETCODE_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        Ok(Config {
            llm: LlmConfig {
                endpoint,
                api_key,
                model,
                temperature: DEFAULT_TEMPERATURE,
            },
            cookie_file,
            credentials,
        })
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("environment variable {} is not set", key))
}
