//! Coppertail CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the HTTP runtime endpoint
//! - `invoke` — Send one payload to a running endpoint and print the stream

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "coppertail",
    about = "Coppertail — conversational multi-agent runtime",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP runtime endpoint
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Invoke a running endpoint and print each streamed line verbatim
    Invoke {
        /// Endpoint base URL
        #[arg(short, long, default_value = "http://localhost:8080")]
        endpoint: String,

        /// The prompt to send
        #[arg(short = 'm', long)]
        prompt: String,

        /// Caller identity; generated per invocation when omitted
        #[arg(long)]
        actor_id: Option<String>,

        /// Conversation session; generated per invocation when omitted
        #[arg(long)]
        session_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(cli.config.as_deref(), port).await?,
        Commands::Invoke {
            endpoint,
            prompt,
            actor_id,
            session_id,
        } => commands::invoke::run(&endpoint, prompt, actor_id, session_id).await?,
    }

    Ok(())
}
