pub mod commands;
pub mod database;
pub mod handler;
pub mod transcript;

use commands::*;
use poise::command;

/// 📩 Support tickets
#[command(
    slash_command,
    subcommands("panel", "list", "support_clean", "support_set"),
    guild_only,
    category = "Support"
)]
pub async fn support(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}
