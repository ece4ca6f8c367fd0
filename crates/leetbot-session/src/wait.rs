//! Wait-until-condition helpers: poll the page with a JS predicate until it
//! holds or the operation's wait budget runs out. These are the only
//! suspension points in the whole workflow.

use crate::error::SessionError;
use chromiumoxide::Page;
use std::time::Duration;

/// Standard per-operation wait for page elements.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(15);

/// Poll interval between predicate evaluations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Hard cap on a single JS evaluation, so a dialog blocking the JS thread
/// cannot hang the workflow.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Evaluate a JS expression and deserialize its result.
pub async fn eval<T: serde::de::DeserializeOwned>(
    page: &Page,
    expr: &str,
) -> Result<T, SessionError> {
    let result = tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expr))
        .await
        .map_err(|_| SessionError::Script("evaluation timed out".into()))?
        .map_err(|e| SessionError::Script(e.to_string()))?;
    result
        .into_value()
        .map_err(|e| SessionError::Script(format!("unexpected evaluation result: {}", e)))
}

/// Evaluate a boolean JS predicate, treating evaluation failures as false.
/// Context errors are routine while the page navigates.
async fn probe(page: &Page, expr: &str) -> bool {
    match eval::<bool>(page, expr).await {
        Ok(v) => v,
        Err(e) => {
            tracing::trace!("predicate probe failed (treated as false): {}", e);
            false
        }
    }
}

/// Wait until `predicate` (a JS expression returning a boolean) holds.
/// `what` names the condition for the timeout error.
pub async fn wait_until(
    page: &Page,
    what: &str,
    predicate: &str,
    timeout: Duration,
) -> Result<(), SessionError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if probe(page, predicate).await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(SessionError::ScrapeTimeout { what: what.into() });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Wait until the element at `selector` exists with non-empty text, then
/// return that text.
pub async fn wait_for_text(
    page: &Page,
    what: &str,
    selector: &str,
    timeout: Duration,
) -> Result<String, SessionError> {
    let expr = crate::selectors::inner_text_expr(selector);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match eval::<Option<String>>(page, &expr).await {
            Ok(Some(text)) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {}
            Err(e) => tracing::trace!("text probe failed (retrying): {}", e),
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(SessionError::ScrapeTimeout { what: what.into() });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Wait until the current URL satisfies a JS predicate over `location.href`.
pub async fn wait_for_url(
    page: &Page,
    what: &str,
    href_contains: &str,
    timeout: Duration,
) -> Result<(), SessionError> {
    let expr = format!(
        "location.href.includes({})",
        crate::selectors::js_string(href_contains)
    );
    wait_until(page, what, &expr, timeout).await
}
