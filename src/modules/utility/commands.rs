use poise::serenity_prelude::{ChannelId, CreateAllowedMentions, CreateEmbed, CreateMessage, UserId};
use poise::{command, CreateReply};
use tracing::{info, warn};

use crate::{Context, Error};

/// Members that `moveall` pulls into `target`: everyone in voice except the
/// invoker and those already there.
pub fn members_to_move(
    states: impl IntoIterator<Item = (UserId, Option<ChannelId>)>,
    author: UserId,
    target: ChannelId,
) -> Vec<UserId> {
    let mut members: Vec<UserId> = states
        .into_iter()
        .filter(|(user, channel)| *user != author && channel.is_some_and(|c| c != target))
        .map(|(user, _)| user)
        .collect();
    members.sort();
    members
}

/// Make the bot say something in this channel
#[command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn say(
    ctx: Context<'_>,
    #[description = "What to say"] text: String,
) -> Result<(), Error> {
    ctx.channel_id()
        .send_message(
            ctx.serenity_context(),
            CreateMessage::new()
                .content(text)
                .allowed_mentions(CreateAllowedMentions::new()),
        )
        .await?;
    ctx.send(CreateReply::default().content("✅ Sent.").ephemeral(true))
        .await?;
    Ok(())
}

/// Move everyone in voice to your voice channel
#[command(slash_command, guild_only, required_permissions = "MOVE_MEMBERS")]
pub async fn moveall(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?;
    let author = ctx.author().id;

    let plan = {
        let guild = ctx.guild().ok_or("Guild not cached")?;
        let plan = guild
            .voice_states
            .get(&author)
            .and_then(|state| state.channel_id)
            .map(|target| {
                let name = guild
                    .channels
                    .get(&target)
                    .map_or_else(|| target.to_string(), |c| c.name.clone());
                let states = guild.voice_states.values().map(|s| (s.user_id, s.channel_id));
                (target, name, members_to_move(states, author, target))
            });
        plan
    };
    let Some((target, name, members)) = plan else {
        let embed = CreateEmbed::new()
            .colour(0xFF0000)
            .title("You are not in a voice channel");
        ctx.send(CreateReply::default().embed(embed)).await?;
        return Ok(());
    };

    let sctx = ctx.serenity_context();
    let mut moved = 0;
    for member in &members {
        match guild_id.move_member(sctx, *member, target).await {
            Ok(_) => moved += 1,
            Err(e) => warn!("Failed to move {} to {}: {}", member, target, e),
        }
    }
    info!("Moved {}/{} members to {} for {}", moved, members.len(), target, ctx.author().tag());

    let embed = CreateEmbed::new()
        .colour(0x0E82AF)
        .title(format!("I moved everyone to {}", name));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moveall_skips_the_author_and_the_target() {
        let target = ChannelId::new(100);
        let other = ChannelId::new(200);
        let states = vec![
            (UserId::new(1), Some(other)),
            (UserId::new(2), Some(target)),
            (UserId::new(3), Some(other)),
            (UserId::new(4), None),
            (UserId::new(5), Some(target)),
        ];

        assert_eq!(
            members_to_move(states, UserId::new(5), target),
            vec![UserId::new(1), UserId::new(3)]
        );
    }
}
