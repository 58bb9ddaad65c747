//! zhichat cli definition and entrypoint.
pub mod chat;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zhichat_core::config::get_config;

use crate::log::{setup_logging, setup_server_logging};

/// zhichat - stream GLM-4 chat responses in the terminal or a browser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show verbose logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default one.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the model in the terminal, one question at a time.
    Chat,
    /// Serve the chat page with conversation history.
    Serve {
        /// Address to listen on, overrides the config.
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on, overrides the config.
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Runs the main CLI application.
pub async fn run() -> Result<()> {
    // Credentials may live in a .env file next to the working directory
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat => {
            if cli.verbose {
                setup_logging().context("Failed to set up logging")?;
            }
            let config = get_config(cli.config).context("Failed to load configuration")?;
            chat::execute(&config.chat).await
        }
        Commands::Serve { host, port } => {
            setup_server_logging();
            let mut config = get_config(cli.config).context("Failed to load configuration")?;
            if let Some(host) = host {
                config.web.host = host;
            }
            if let Some(port) = port {
                config.web.port = port;
            }
            crate::web::serve(config.web).await
        }
    }
}
