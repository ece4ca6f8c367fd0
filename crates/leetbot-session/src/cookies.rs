use crate::error::SessionError;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One persisted cookie record. The cookie file is a JSON array of these —
/// the only on-disk state the session keeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

impl From<chromiumoxide::cdp::browser_protocol::network::Cookie> for StoredCookie {
    fn from(c: chromiumoxide::cdp::browser_protocol::network::Cookie) -> Self {
        StoredCookie {
            name: c.name,
            value: c.value,
            domain: Some(c.domain),
            path: Some(c.path),
            expires: Some(c.expires),
            http_only: Some(c.http_only),
            secure: Some(c.secure),
        }
    }
}

impl StoredCookie {
    /// Convert to a CDP cookie parameter for replay. The stored expiry is
    /// deliberately not carried over: replayed cookies become session
    /// cookies, so a stale expiry can never reject an otherwise valid
    /// session token.
    pub fn to_param(&self) -> CookieParam {
        let mut param = CookieParam::new(self.name.clone(), self.value.clone());
        param.domain = self.domain.clone();
        param.path = self.path.clone();
        param.http_only = self.http_only;
        param.secure = self.secure;
        param
    }
}

/// Loads and saves the cookie file.
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing cookie file is not an error; it just means no replay.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Vec<StoredCookie>, SessionError> {
        let content = std::fs::read_to_string(&self.path)?;
        let cookies: Vec<StoredCookie> = serde_json::from_str(&content)?;
        Ok(cookies)
    }

    pub fn save(&self, cookies: &[StoredCookie]) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, json)?;
        tracing::info!("Saved {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<StoredCookie> {
        vec![
            StoredCookie {
                name: "LEETCODE_SESSION".into(),
                value: "abc123".into(),
                domain: Some(".leetcode.com".into()),
                path: Some("/".into()),
                expires: Some(4102444800.0),
                http_only: Some(true),
                secure: Some(true),
            },
            StoredCookie {
                name: "csrftoken".into(),
                value: "tok".into(),
                domain: None,
                path: None,
                expires: None,
                http_only: None,
                secure: None,
            },
        ]
    }

    #[test]
    fn roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));
        assert!(!store.exists());

        store.save(&sample()).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "LEETCODE_SESSION");
        assert_eq!(loaded[0].domain.as_deref(), Some(".leetcode.com"));
        assert_eq!(loaded[1].expires, None);
    }

    #[test]
    fn replay_param_drops_expiry() {
        let cookie = &sample()[0];
        let param = cookie.to_param();
        assert_eq!(param.name, "LEETCODE_SESSION");
        assert!(param.expires.is_none());
        assert_eq!(param.http_only, Some(true));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(SessionError::Io(_))));
    }
}
