//! Interactive session bootstrap: database, name prompt, signal handling.
//!
//! [`run`] wires the SQLite store, the inference client and stdin/stdout into a
//! [`Session`] and drives it until the user quits, input closes, or an
//! interrupt arrives.

use anyhow::Result;
use console::style;
use tokio::io::BufReader;

use lmchat::config::LmChatConfig;
use lmchat::conversation::SqliteStore;
use lmchat::db;
use lmchat::inference::InferenceClient;
use lmchat::session::{self, terminal, Session};

/// Run an interactive chat. Exits the process with status 1 if the database
/// cannot be opened, and with status 0 on interrupt.
pub async fn run(config: LmChatConfig, name: Option<String>) -> Result<()> {
    tokio::select! {
        result = chat(config, name) => result,
        _ = tokio::signal::ctrl_c() => {
            // In-flight store writes or requests are abandoned.
            println!("\n{}", style("Received interrupt. Shutting down...").yellow());
            std::process::exit(0);
        }
    }
}

async fn chat(config: LmChatConfig, name: Option<String>) -> Result<()> {
    let db_path = config.resolved_db_path();
    println!("{}", style("Connecting to database...").cyan());
    let conn = match db::open_database(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("{} {e:#}", style("Error connecting to database:").red());
            std::process::exit(1);
        }
    };
    println!("{}", style(format!("Connected to {}", db_path.display())).green());

    if let Err(e) = terminal::spawn_resize_notices() {
        tracing::debug!(error = %e, "resize notices unavailable");
    }

    let mut input = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    let user_name = match name {
        Some(name) => name,
        None => match session::prompt_name(&mut input, &mut stdout).await? {
            Some(name) => name,
            None => {
                println!();
                return Ok(());
            }
        },
    };

    let store = SqliteStore::new(conn);
    let backend = InferenceClient::new(&config.inference, &config.context);
    let mut session = Session::new(store, backend, stdout, &user_name, &config.inference);
    tracing::info!(conversation_id = %session.conversation_id(), "session started");

    session.start()?;
    session.run(&mut input).await?;

    drop(session);
    println!("{}", style("Database connection closed").cyan());
    Ok(())
}
