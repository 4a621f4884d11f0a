use poise::command;
use poise::serenity_prelude::{self as serenity, CreateEmbed, Timestamp};

use super::database::format_duration;
use crate::{utils::now_timestamp, Context, Error};

const STATS_COLOUR: u32 = 0x00FF40;

fn discord_time(timestamp: Timestamp) -> String {
    format!("<t:{}:F>", timestamp.unix_timestamp())
}

fn profile(ctx: Context<'_>, member: &serenity::Member) -> CreateEmbed {
    let status = ctx
        .guild()
        .and_then(|g| g.presences.get(&member.user.id).map(|p| p.status.name().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    CreateEmbed::new()
        .description(format!("Stats of <@{}>", member.user.id))
        .colour(STATS_COLOUR)
        .thumbnail(member.face())
        .field("Nickname", member.nick.as_deref().unwrap_or("none"), true)
        .field("Status", status, true)
        .field("Account created", discord_time(member.user.created_at()), false)
        .field(
            "Joined server",
            member.joined_at.map_or_else(|| "unknown".to_string(), discord_time),
            false,
        )
}

/// Show a member's profile
#[command(slash_command, guild_only)]
pub async fn member(
    ctx: Context<'_>,
    #[description = "Member to show"] member: serenity::Member,
) -> Result<(), Error> {
    let embed = profile(ctx, &member);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show a member's profile with message and voice counters
#[command(slash_command, guild_only, rename = "admin", required_permissions = "MANAGE_GUILD")]
pub async fn stats_admin(
    ctx: Context<'_>,
    #[description = "Member to show"] member: serenity::Member,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let user_id = member.user.id.get();

    let stored = ctx.data().dbs.stats.member(guild_id, user_id).await;
    let pending = ctx.data().stats_pending.pending(guild_id, user_id);
    if stored.is_none() && pending == 0 {
        ctx.say("This member has no stats yet.").await?;
        return Ok(());
    }
    let stored = stored.unwrap_or_default();

    let embed = profile(ctx, &member)
        .field("Messages sent", (stored.messages + pending).to_string(), true)
        .field("Voice time", format_duration(stored.voice_total(now_timestamp())), true);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
