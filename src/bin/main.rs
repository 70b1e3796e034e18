//! SafeSentinel terminal client
//!
//! Usage:
//!     sentinel --mode discovery OKB X-Layer      (single shot)
//!     sentinel                                   (interactive conversation)

use clap::Parser;
use safe_sentinel_console::{
    audit::ResolutionLog,
    console::{self, Output},
    Conversation, EngineConfig, HttpGateway, Mode, Pipelines,
};
use std::sync::{Arc, Mutex};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "sentinel", about = "SafeSentinel transfer risk and route console")]
struct Args {
    /// Engine base URL (overrides SENTINEL_ENGINE_URL)
    #[arg(long)]
    engine_url: Option<String>,

    /// Pin a mode: sentinel or discovery. Unpinned turns are classified.
    #[arg(long)]
    mode: Option<Mode>,

    /// Query to resolve once; omit for an interactive session
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so rendered results stay clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut engine = EngineConfig::from_env()?;
    if let Some(url) = args.engine_url {
        engine = engine.with_base_url(url);
    }
    info!(engine = %engine.base_url, "Engine configured");

    let pipelines = Arc::new(Pipelines::new(Arc::new(HttpGateway::new(&engine)?)));
    let out: Output = Arc::new(Mutex::new(std::io::stdout()));

    if !args.query.is_empty() {
        console::single_shot(pipelines, args.mode, &args.query.join(" "), &out).await?;
        return Ok(());
    }

    let conversation = Arc::new(Conversation::new(
        Uuid::new_v4(),
        pipelines,
        Arc::new(ResolutionLog::new()),
    ));
    conversation.set_mode(args.mode).await;

    console::repl(conversation, BufReader::new(tokio::io::stdin()), out).await?;

    Ok(())
}
