pub mod commands;
pub mod database;
pub mod handler;
pub mod sync;

use commands::*;
use poise::command;

/// 🐺 Role sync between the main server and its satellites
#[command(
    slash_command,
    subcommands("rolesync_set", "set_admin", "remove_admin"),
    guild_only,
    category = "Roles"
)]
pub async fn rolesync(_ctx: crate::Context<'_>) -> Result<(), crate::Error> {
    Ok(())
}
