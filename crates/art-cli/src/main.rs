//! `art` — a command-line demo harness for the agent runtime core.

mod cli;
mod config;
mod demo;
mod store;

use std::sync::Arc;

use art_sessions::SessionStore;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, SessionsCommand};
use store::FileSessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let (config, _config_path) = config::load_or_default()?;
    let store = Arc::new(open_store()?);

    match cli.command {
        None => {
            println!("art: no subcommand given, nothing to do. Try `art run \"hello\"`.");
            Ok(())
        }
        Some(Command::Run { message, session, json }) => run_cmd(&config, store, message, session, json).await,
        Some(Command::Stream { message, session }) => stream_cmd(&config, store, message, session).await,
        Some(Command::Retry { session, from }) => retry_cmd(&config, store, session, from).await,
        Some(Command::Fork { session, at }) => fork_cmd(store, session, at).await,
        Some(Command::Sessions(SessionsCommand::List)) => sessions_list(&store),
        Some(Command::Sessions(SessionsCommand::Show { session })) => sessions_show(store, session).await,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,art=debug")))
        .init();
}

fn open_store() -> anyhow::Result<FileSessionStore> {
    let path = std::env::var("ART_SESSIONS").unwrap_or_else(|_| "art-sessions.json".into());
    FileSessionStore::open(path).map_err(|e| anyhow::anyhow!(e.to_string()))
}

#[derive(serde::Serialize)]
struct JsonOutcome {
    run_id: String,
    response: String,
    termination_reason: art_types::TerminationReason,
    metrics: art_types::RunMetrics,
    error: Option<String>,
}

async fn run_cmd(
    config: &config::Config,
    store: Arc<FileSessionStore>,
    message: String,
    session: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let runnable = demo::build_runnable(config);
    let store: Arc<dyn SessionStore> = store;

    let output = art_engine::run(runnable, message, session, store).await;

    if json {
        let outcome = JsonOutcome {
            run_id: output.run_id,
            response: output.response,
            termination_reason: output.termination_reason,
            metrics: output.metrics,
            error: output.error.map(|e| e.message),
        };
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", output.response);
        eprintln!(
            "\x1b[2msteps={} tokens_in={} tokens_out={} duration_ms={}\x1b[0m",
            output.metrics.step_count,
            output.metrics.total_input_tokens,
            output.metrics.total_output_tokens,
            output.metrics.duration_ms
        );
        if let Some(err) = output.error {
            eprintln!("error: {} ({})", err.message, err.kind);
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn stream_cmd(
    config: &config::Config,
    store: Arc<FileSessionStore>,
    message: String,
    session: Option<String>,
) -> anyhow::Result<()> {
    use tokio_stream::StreamExt;

    let runnable = demo::build_runnable(config);
    let store: Arc<dyn SessionStore> = store;

    let (_run_id, stream) = art_engine::run_stream(runnable, message, session, None, store);
    tokio::pin!(stream);

    while let Some(event) = stream.next().await {
        println!("{}", serde_json::to_string(&event)?);
    }

    Ok(())
}

async fn retry_cmd(
    config: &config::Config,
    store: Arc<FileSessionStore>,
    session: String,
    from: u64,
) -> anyhow::Result<()> {
    let runnable = demo::build_runnable(config);
    let store: Arc<dyn SessionStore> = store;

    let outcome = art_engine::session_ops::retry(&runnable, &session, from, store).await?;
    println!("{}", outcome.output);
    eprintln!("\x1b[2msteps={}\x1b[0m", outcome.metrics.step_count);

    Ok(())
}

async fn fork_cmd(store: Arc<FileSessionStore>, session: String, at: u64) -> anyhow::Result<()> {
    let store: Arc<dyn SessionStore> = store;
    let forked = art_sessions::fork_at_sequence(&*store, &session, at).await?;
    println!("{forked}");
    Ok(())
}

fn sessions_list(store: &FileSessionStore) -> anyhow::Result<()> {
    for id in store.session_ids() {
        println!("{id}");
    }
    Ok(())
}

async fn sessions_show(store: Arc<FileSessionStore>, session: String) -> anyhow::Result<()> {
    let store: Arc<dyn SessionStore> = store;
    let steps = store.get_steps(&session, &art_types::StepFilter::default()).await?;
    for step in steps {
        let content = step.content.as_deref().unwrap_or("");
        println!("[{}] {:?} {}", step.sequence, step.role, content);
    }
    Ok(())
}
