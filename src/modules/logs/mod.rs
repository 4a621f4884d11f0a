pub mod commands;
pub mod database;
pub mod handler;

use commands::*;
use poise::command;

/// 🗑️ Deleted message log
#[command(slash_command, subcommands("channel", "disable"), guild_only, category = "Moderation")]
pub async fn logs(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}
