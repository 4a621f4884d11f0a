pub mod commands;
pub mod database;
pub mod handler;
pub mod wizard;

use commands::*;
use poise::command;

/// 🎭 Self-assignable roles
#[command(
    slash_command,
    subcommands("create", "bind", "clean"),
    guild_only,
    category = "Roles"
)]
pub async fn selfroles(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}
