//! Non-interactive subcommands over the conversation database.

use anyhow::{Context, Result};
use console::style;

use lmchat::config::LmChatConfig;
use lmchat::conversation::{ConversationId, Role, SqliteStore};

fn open_store(config: &LmChatConfig) -> Result<SqliteStore> {
    let db_path = config.resolved_db_path();
    let conn = lmchat::db::open_database(&db_path)?;
    Ok(SqliteStore::new(conn))
}

/// Print one conversation, oldest turn first, as text or JSON.
pub fn history(
    config: &LmChatConfig,
    name: Option<&str>,
    conversation: Option<&str>,
    json: bool,
) -> Result<()> {
    let conversation_id = match (conversation, name) {
        (Some(raw), _) => ConversationId::from_raw(raw),
        (None, Some(name)) => ConversationId::for_user(name),
        (None, None) => anyhow::bail!("either a name or --conversation is required"),
    };

    let store = open_store(config)?;
    let turns = store
        .try_load_history(&conversation_id)
        .with_context(|| format!("failed to read conversation {conversation_id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        eprintln!("Exported {} turns.", turns.len());
        return Ok(());
    }

    if turns.is_empty() {
        println!("No turns stored for {conversation_id}.");
        return Ok(());
    }

    println!("Conversation: {conversation_id}");
    println!("{}", "=".repeat(50));
    for turn in &turns {
        let who = match turn.role {
            Role::User => style(turn.sender.as_str()).blue().bold(),
            Role::Assistant => style(turn.sender.as_str()).magenta().bold(),
            Role::System => style(turn.sender.as_str()).dim(),
        };
        println!(
            "{} {}",
            style(turn.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
            who
        );
        for line in turn.text.lines() {
            println!("  {line}");
        }
        println!();
    }
    println!("{} turns", turns.len());

    Ok(())
}

/// List every stored conversation with its size and last activity.
pub fn conversations(config: &LmChatConfig) -> Result<()> {
    let store = open_store(config)?;
    let summaries = store.list_conversations()?;

    if summaries.is_empty() {
        println!("No conversations stored yet.");
        return Ok(());
    }

    println!("{:<40} {:>6}  {}", "Conversation", "Turns", "Last activity");
    println!("{}", "=".repeat(70));
    for summary in &summaries {
        println!(
            "{:<40} {:>6}  {}",
            summary.conversation_id,
            summary.turns,
            summary.last_activity.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}
