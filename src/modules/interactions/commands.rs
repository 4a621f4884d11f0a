use poise::serenity_prelude::{self as serenity, ChannelId, CreateEmbed, CreateMessage, EditMessage};
use poise::{command, CreateReply};
use tracing::{info, warn};

use super::database::{ChoiceMode, InteractionDraft, InteractionKind};
use super::render::{self, RESULTS_PER_PAGE};
use crate::{error::CogError, markers, utils::parse_options, Context, Error};

const VOTE_OPTIONS: [&str; 3] = ["Oui", "Non", "Joker"];

async fn publish(
    ctx: Context<'_>,
    kind: InteractionKind,
    mode: ChoiceMode,
    title: String,
    labels: Vec<String>,
) -> Result<(), Error> {
    let draft = match InteractionDraft::new(kind, mode, title, labels) {
        Ok(draft) => draft,
        Err(e) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let sctx = ctx.serenity_context();
    let channel_id = ctx.channel_id();
    let emojis: Vec<String> = draft.options.iter().map(|o| o.emoji.clone()).collect();
    let mut message = channel_id
        .send_message(sctx, CreateMessage::new().embed(render::draft_embed(&draft)))
        .await?;

    // Tracked before any reaction exists so early votes are recorded.
    let created = ctx
        .data()
        .dbs
        .interactions
        .create(message.id.get(), guild_id, channel_id.get(), ctx.author().id.get(), draft)
        .await;
    let interaction = match created {
        Ok(interaction) => interaction,
        Err(e) => {
            if let Err(delete) = message.delete(sctx).await {
                warn!("Failed to remove untracked {} message {}: {}", kind, message.id, delete);
            }
            return Err(e.into());
        }
    };

    for emoji in &emojis {
        message.react(sctx, markers::reaction_type(emoji)).await?;
    }

    message
        .edit(sctx, EditMessage::new().embed(render::embed(&interaction)))
        .await?;

    info!(
        "{} {} created in channel {} by {}",
        kind,
        message.id,
        channel_id,
        ctx.author().tag()
    );

    ctx.send(
        CreateReply::default()
            .content(format!("✅ {} posted.", kind))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn parse_message_id(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Post a single-choice poll
#[command(slash_command, guild_only)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "The question to ask"] question: String,
    #[description = "Up to 10 options separated by ;"] options: String,
) -> Result<(), Error> {
    publish(ctx, InteractionKind::Poll, ChoiceMode::Single, question, parse_options(&options)).await
}

/// Post a poll where members may pick several options
#[command(slash_command, guild_only)]
pub async fn multi(
    ctx: Context<'_>,
    #[description = "The question to ask"] question: String,
    #[description = "Up to 10 options separated by ;"] options: String,
) -> Result<(), Error> {
    publish(ctx, InteractionKind::Poll, ChoiceMode::Multi, question, parse_options(&options)).await
}

/// Stop accepting votes on a poll or vote
#[command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn close(
    ctx: Context<'_>,
    #[description = "ID of the poll message"] message_id: String,
) -> Result<(), Error> {
    let Some(message_id) = parse_message_id(&message_id) else {
        ctx.say("❌ That is not a message ID.").await?;
        return Ok(());
    };

    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let interaction = match ctx.data().dbs.interactions.close(guild_id, message_id).await {
        Ok(interaction) => interaction,
        Err(CogError::UnknownInteraction(_)) => {
            ctx.say("❌ No poll is attached to that message.").await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    ChannelId::new(interaction.channel_id)
        .edit_message(
            ctx.serenity_context(),
            serenity::MessageId::new(message_id),
            EditMessage::new().embed(render::embed(&interaction)),
        )
        .await?;

    ctx.say(format!("🔒 {} closed.", interaction.kind)).await?;
    Ok(())
}

/// List who voted for what
#[command(slash_command, guild_only)]
pub async fn results(
    ctx: Context<'_>,
    #[description = "ID of the poll message"] message_id: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let interaction = match parse_message_id(&message_id) {
        Some(id) => ctx.data().dbs.interactions.get(guild_id, id).await,
        None => None,
    };
    let Some(interaction) = interaction else {
        ctx.say("❌ No poll is attached to that message.").await?;
        return Ok(());
    };

    let pages = render::result_pages(&interaction, RESULTS_PER_PAGE);
    let total = pages.len();
    for (i, page) in pages.into_iter().enumerate() {
        let embed = CreateEmbed::new()
            .title(format!("Results: {} ({}/{})", interaction.title, i + 1, total))
            .description(page)
            .colour(interaction.kind.colour());
        ctx.send(CreateReply::default().embed(embed)).await?;
    }
    Ok(())
}

async fn clean_kind(ctx: Context<'_>, kind: InteractionKind) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let removed = ctx.data().dbs.interactions.clean(guild_id, kind).await?;
    info!("Cleaned {} {} records", removed, kind);
    ctx.say(format!("🧹 {} data cleaned ({} removed).", kind, removed))
        .await?;
    Ok(())
}

/// Forget this server's polls
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD", rename = "clean")]
pub async fn poll_clean(ctx: Context<'_>) -> Result<(), Error> {
    clean_kind(ctx, InteractionKind::Poll).await
}

/// Put a member's admission to a vote
#[command(slash_command, guild_only, rename = "start")]
pub async fn vote_start(
    ctx: Context<'_>,
    #[description = "Member the vote is about"] member: serenity::Member,
) -> Result<(), Error> {
    let title = format!("Vote on admitting {}", member.display_name());
    let labels = VOTE_OPTIONS.iter().map(|s| s.to_string()).collect();
    publish(ctx, InteractionKind::Vote, ChoiceMode::Single, title, labels).await
}

/// Forget this server's votes
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD", rename = "clean")]
pub async fn vote_clean(ctx: Context<'_>) -> Result<(), Error> {
    clean_kind(ctx, InteractionKind::Vote).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_parse() {
        assert_eq!(parse_message_id(" 123 "), Some(123));
        assert_eq!(parse_message_id("abc"), None);
    }

    #[test]
    fn vote_options_use_the_joker_set() {
        let labels = VOTE_OPTIONS.iter().map(|s| s.to_string()).collect();
        let draft = InteractionDraft::new(InteractionKind::Vote, ChoiceMode::Single, "v", labels).unwrap();
        assert_eq!(draft.options[2].emoji, markers::JOKER);
    }
}
