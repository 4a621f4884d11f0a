pub mod commands;
pub mod database;
pub mod handler;
pub mod render;

use commands::*;
use poise::command;

/// 📊 Emoji polls
#[command(
    slash_command,
    subcommands("create", "multi", "close", "results", "poll_clean"),
    guild_only,
    category = "Polls"
)]
pub async fn poll(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}

/// 🗳️ Member admission votes
#[command(
    slash_command,
    subcommands("vote_start", "close", "results", "vote_clean"),
    guild_only,
    category = "Polls"
)]
pub async fn vote(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}
