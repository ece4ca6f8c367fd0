//! Browser integration tests. They launch a real Chromium against `data:`
//! URLs and skip gracefully when no browser is available.

use leetbot_session::session::{
    DailyProblem, LeetCodeSession, ProblemSession, SessionOptions,
};
use leetbot_session::{wait, SessionError};
use serial_test::serial;
use std::time::Duration;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();
}

async fn launch_or_skip(cookie_file: std::path::PathBuf) -> Option<LeetCodeSession> {
    let mut session = LeetCodeSession::new(SessionOptions {
        headed: false,
        cookie_file,
        credentials: None,
    });
    match session.launch().await {
        Ok(()) => Some(session),
        Err(e) => {
            eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
            None
        }
    }
}

fn data_url(html: &str) -> DailyProblem {
    DailyProblem {
        url: format!("data:text/html,{}", html),
        title: "Fixture".into(),
        slug: "fixture".into(),
    }
}

#[tokio::test]
#[serial]
async fn insert_code_replaces_previous_content() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let Some(mut session) = launch_or_skip(dir.path().join("cookies.json")).await else {
        return;
    };

    let fixture = data_url("<html><body><textarea class='inputarea'></textarea></body></html>");
    session.open_problem(&fixture).await.expect("navigate");

    session
        .insert_code("def solution_a(): pass")
        .await
        .expect("first insert");
    session
        .insert_code("def solution_b(): pass")
        .await
        .expect("second insert");

    let page = &session.client().expect("client").page;
    let value: String = wait::eval(page, "document.querySelector('.inputarea').value")
        .await
        .expect("read editor value");
    assert_eq!(value, "def solution_b(): pass");

    session.close().await.expect("close");
}

#[tokio::test]
#[serial]
async fn scrapes_statement_and_starter_code() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let Some(mut session) = launch_or_skip(dir.path().join("cookies.json")).await else {
        return;
    };

    let fixture = data_url(
        "<html><body>\
         <div class='elfjS'>Given an array of integers...</div>\
         <div class='view-lines'>class Solution: pass</div>\
         </body></html>",
    );
    session.open_problem(&fixture).await.expect("navigate");

    let details = session.problem_details().await.expect("scrape");
    assert!(details.statement.contains("array of integers"));
    assert!(details.starter_code.contains("class Solution"));

    session.close().await.expect("close");
}

#[tokio::test]
#[serial]
async fn run_tests_clicks_run_and_scrapes_result_panel() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let Some(mut session) = launch_or_skip(dir.path().join("cookies.json")).await else {
        return;
    };

    // Clicking Run populates the result panel, like the site does.
    let fixture = data_url(
        "<html><body>\
         <textarea class='inputarea'></textarea>\
         <button onclick=\"document.getElementById('r').innerText='Accepted: all cases passed'\">Run</button>\
         <div data-layout-path='/c1/ts1/t1' id='r'></div>\
         </body></html>",
    );
    session.open_problem(&fixture).await.expect("navigate");

    let outcome = session.run_tests("def f(): pass").await.expect("run");
    assert!(outcome.passed, "unexpected outcome: {}", outcome.raw);
    assert!(outcome.raw.contains("Accepted"));

    session.close().await.expect("close");
}

#[tokio::test]
#[serial]
async fn missing_elements_time_out_with_sentinel_not_panic() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let Some(mut session) = launch_or_skip(dir.path().join("cookies.json")).await else {
        return;
    };

    let fixture = data_url("<html><body><p>empty page</p></body></html>");
    session.open_problem(&fixture).await.expect("navigate");
    let page = &session.client().expect("client").page;

    let text = wait::wait_for_text(
        page,
        "absent panel",
        "#does-not-exist",
        Duration::from_secs(1),
    )
    .await;
    assert!(matches!(text, Err(SessionError::ScrapeTimeout { .. })));

    let cond = wait::wait_until(
        page,
        "absent condition",
        "!!document.querySelector('#nope')",
        Duration::from_secs(1),
    )
    .await;
    assert!(matches!(cond, Err(SessionError::ScrapeTimeout { .. })));

    session.close().await.expect("close");
}
