use poise::command;
use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Report deleted messages in a channel
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Log channel"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let channel_id = channel.id().get();
    ctx.data().dbs.logs.set_channel(guild_id, channel_id).await?;
    info!("Deletion log of {} set to {} by {}", guild_id, channel_id, ctx.author().tag());
    ctx.say(format!("✅ Deleted messages will be reported in <#{}>", channel_id))
        .await?;
    Ok(())
}

/// Stop reporting deleted messages
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    if ctx.data().dbs.logs.disable(guild_id).await? {
        ctx.say("✅ Deletion log disabled.").await?;
    } else {
        ctx.say("❌ No log channel is set.").await?;
    }
    Ok(())
}
