mod cli;
mod interactive;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lmchat::config::LmChatConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lmchat", version, about = "Chat with a local LLM server from the terminal")]
struct Cli {
    /// Config file to use instead of ~/.lmchat/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session (the default)
    Chat {
        /// Display name; prompted for when omitted
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a stored conversation
    History {
        /// Display name whose standing conversation to print
        #[arg(required_unless_present = "conversation")]
        name: Option<String>,
        /// Exact conversation id (see `lmchat conversations`)
        #[arg(long, conflicts_with = "name")]
        conversation: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored conversations, most recent first
    Conversations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LmChatConfig::load_from(path)?,
        None => LmChatConfig::load()?,
    };

    // Log to stderr so stdout carries only the conversation.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Chat { name: None }) {
        Command::Chat { name } => {
            interactive::run(config, name).await?;
        }
        Command::History {
            name,
            conversation,
            json,
        } => {
            cli::history(&config, name.as_deref(), conversation.as_deref(), json)?;
        }
        Command::Conversations => {
            cli::conversations(&config)?;
        }
    }

    Ok(())
}
