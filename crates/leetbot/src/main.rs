use anyhow::bail;
use clap::{Parser, Subcommand};
use leetbot_agent::{OpenAiChat, Solver};
use leetbot_session::session::{Language, SessionOptions};
use leetbot_session::{LeetCodeSession, ProblemSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod report;

use config::Config;
use report::ReportServer;

#[derive(Parser)]
#[command(name = "leetbot", version, about = "LeetCode daily challenge auto-solver")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve today's daily challenge end to end
    Solve {
        /// Launch the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Serve the result page on this port when the run finishes
        #[arg(long)]
        report_port: Option<u16>,

        /// Editor language for the solution
        #[arg(long, default_value = "python3")]
        language: Language,
    },
    /// Sign in interactively and persist the session cookies for later runs
    Auth,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Log to stderr; stdout carries the summary.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    match args.command {
        Command::Solve {
            headed,
            report_port,
            language,
        } => solve(config, headed, report_port, language).await,
        Command::Auth => auth(config).await,
    }
}

async fn solve(
    config: Config,
    headed: bool,
    report_port: Option<u16>,
    language: Language,
) -> anyhow::Result<()> {
    let model = OpenAiChat::new(config.llm)?;
    let mut session = LeetCodeSession::new(SessionOptions {
        headed,
        cookie_file: config.cookie_file,
        credentials: config.credentials,
    });
    session.launch().await?;

    // The browser must come down on every exit path, so run the loop first
    // and only then propagate its result.
    let outcome = Solver::new(&mut session, &model)
        .with_language(language)
        .run()
        .await;
    let closed = session.close().await;
    let report = outcome?;
    closed?;

    println!("{}", report.summary);

    if let Some(port) = report_port {
        let page = report::render_page("Daily Challenge", &report.summary);
        ReportServer::bind(port).await?.serve_once(&page).await?;
    }

    if !report.accepted {
        bail!("the workflow did not end with an accepted submission");
    }
    Ok(())
}

/// Establish a session interactively (visible window, human completes the
/// sign-in) so later solve runs can replay the stored cookies headless.
async fn auth(config: Config) -> anyhow::Result<()> {
    let mut session = LeetCodeSession::new(SessionOptions {
        headed: true,
        cookie_file: config.cookie_file,
        credentials: config.credentials,
    });
    session.launch().await?;

    let outcome = session.authenticate().await;
    let closed = session.close().await;
    let method = outcome?;
    closed?;

    info!("Authenticated via {:?}, cookies persisted", method);
    Ok(())
}
