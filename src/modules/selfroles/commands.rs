use poise::command;
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage, MessageId};
use tracing::info;

use super::database::SelfRoleBinding;
use super::handler::prompt;
use crate::{
    markers::{self, FooterTag},
    utils::parse_role_ids,
    Context, Error,
};

fn role_list(binding: &SelfRoleBinding) -> String {
    binding
        .emojis
        .iter()
        .zip(&binding.roles)
        .map(|(emoji, role)| format!("{} <@&{}>", emoji, role))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Post a message members react to for roles
#[command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Up to 10 role mentions"] roles: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let channel_id = ctx.channel_id();
    let roles = parse_role_ids(&roles);

    // Validate before anything is posted; the message id is filled in below.
    if let Err(e) = SelfRoleBinding::numbered(0, guild_id, channel_id.get(), roles.clone(), 0) {
        ctx.say(format!("❌ {}", e)).await?;
        return Ok(());
    }

    let sctx = ctx.serenity_context();
    let mut message = channel_id
        .send_message(
            sctx,
            CreateMessage::new().embed(
                CreateEmbed::new()
                    .title("React to this message to get your roles")
                    .colour(0x0E82AF),
            ),
        )
        .await?;

    let binding = SelfRoleBinding::numbered(
        message.id.get(),
        guild_id,
        channel_id.get(),
        roles,
        ctx.author().id.get(),
    )?;

    for emoji in &binding.emojis {
        message.react(sctx, markers::reaction_type(emoji)).await?;
    }

    let embed = CreateEmbed::new()
        .title("React to this message to get your roles")
        .description(role_list(&binding))
        .colour(0x0E82AF)
        .footer(CreateEmbedFooter::new(FooterTag::React.render(message.id.get())));

    ctx.data().dbs.selfroles.insert(binding).await?;
    message.edit(sctx, EditMessage::new().embed(embed)).await?;

    info!("Self-role message {} posted by {}", message.id, ctx.author().tag());
    ctx.say("✅ Self-role message posted.").await?;
    Ok(())
}

/// Bind roles to emoji of your choice on an existing message
#[command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn bind(
    ctx: Context<'_>,
    #[description = "ID of a message in this channel"] message_id: String,
    #[description = "Up to 10 role mentions, in binding order"] roles: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let channel_id = ctx.channel_id();

    let Ok(message_id) = message_id.trim().parse::<u64>() else {
        ctx.say("❌ That is not a message ID.").await?;
        return Ok(());
    };
    if ctx.data().dbs.selfroles.get(message_id).await.is_some() {
        ctx.say("❌ That message already hands out roles.").await?;
        return Ok(());
    }
    let sctx = ctx.serenity_context();
    if channel_id.message(sctx, MessageId::new(message_id)).await.is_err() {
        ctx.say("❌ I can't find that message in this channel.").await?;
        return Ok(());
    }

    let mut binding = match SelfRoleBinding::wizard(
        message_id,
        guild_id,
        channel_id.get(),
        parse_role_ids(&roles),
        ctx.author().id.get(),
    ) {
        Ok(binding) => binding,
        Err(e) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let Some(embed) = prompt(&binding) else {
        return Ok(());
    };
    let control = channel_id
        .send_message(sctx, CreateMessage::new().embed(embed))
        .await?;
    binding.control_message_id = Some(control.id.get());
    ctx.data().dbs.selfroles.insert(binding).await?;

    info!("Self-role wizard started on {} by {}", message_id, ctx.author().tag());
    ctx.say("🪄 React on the setup message once per role.").await?;
    Ok(())
}

/// Forget every self-role message of this server
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn clean(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let removed = ctx.data().dbs.selfroles.clean(guild_id).await?;
    ctx.say(format!("🧹 Self-role data cleaned ({} removed).", removed))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_list_pairs_markers_and_roles() {
        let binding = SelfRoleBinding::numbered(1, 2, 3, vec![10, 20], 4).unwrap();
        assert_eq!(role_list(&binding), "1️⃣ <@&10>\n2️⃣ <@&20>");
    }
}
