pub mod commands;
pub mod database;
pub mod handler;
pub mod task;

use commands::*;
use poise::command;

/// 📊 Member activity for the current month
#[command(slash_command, subcommands("member", "stats_admin"), guild_only, category = "Stats")]
pub async fn stats(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}
