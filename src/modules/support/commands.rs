use poise::command;
use poise::serenity_prelude::{
    self as serenity, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage,
};
use tracing::info;

use super::database::{TicketRecord, TicketStatus};
use crate::{
    markers::{self, FooterTag, TICKET},
    Context, Error,
};

fn ticket_line(ticket: &TicketRecord) -> String {
    let status = match ticket.status {
        TicketStatus::Open => "open",
        TicketStatus::CloseRequested => "closing",
        TicketStatus::Closed => "closed",
        TicketStatus::Deleted => "deleting",
    };
    format!(
        "`#{}` <#{}> by <@{}> ({}, <t:{}:R>)",
        ticket.index, ticket.channel_id, ticket.owner_id, status, ticket.opened_at
    )
}

/// Post the panel members react to for a ticket
#[command(slash_command, guild_only, required_permissions = "MANAGE_CHANNELS")]
pub async fn panel(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let sctx = ctx.serenity_context();

    let embed = CreateEmbed::new()
        .title("Support")
        .description(format!("React with {TICKET} to open a ticket"))
        .colour(0x0E82AF);
    let mut message = ctx
        .channel_id()
        .send_message(sctx, CreateMessage::new().embed(embed.clone()))
        .await?;
    message.react(sctx, markers::reaction_type(TICKET)).await?;

    ctx.data()
        .dbs
        .support
        .add_panel(message.id.get(), guild_id)
        .await?;
    message
        .edit(
            sctx,
            EditMessage::new().embed(
                embed.footer(CreateEmbedFooter::new(FooterTag::Panel.render(message.id.get()))),
            ),
        )
        .await?;

    info!("Support panel {} posted by {}", message.id, ctx.author().tag());
    ctx.say("✅ Support panel posted.").await?;
    Ok(())
}

/// List the tickets of this server
#[command(slash_command, guild_only, required_permissions = "MANAGE_CHANNELS")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let tickets = ctx.data().dbs.support.tickets_in(guild_id).await;

    let description = if tickets.is_empty() {
        "No tickets.".to_string()
    } else {
        tickets.iter().map(ticket_line).collect::<Vec<_>>().join("\n")
    };
    ctx.send(
        poise::CreateReply::default()
            .embed(CreateEmbed::new().title("Tickets").description(description))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Forget this server's tickets and panels; ticket numbers keep counting
#[command(slash_command, guild_only, rename = "clean", required_permissions = "MANAGE_GUILD")]
pub async fn support_clean(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let removed = ctx.data().dbs.support.clean(guild_id).await?;
    ctx.say(format!("🧹 Support data cleaned ({} tickets removed).", removed))
        .await?;
    Ok(())
}

/// Configure tickets
#[command(
    slash_command,
    guild_only,
    rename = "set",
    subcommands("transcript_channel", "admin_role"),
    required_permissions = "MANAGE_GUILD"
)]
pub async fn support_set(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Channel that receives ticket transcripts
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn transcript_channel(
    ctx: Context<'_>,
    #[description = "Transcript channel"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let channel_id = channel.id().get();
    ctx.data()
        .dbs
        .support
        .update_settings(guild_id, |s| s.transcript_channel = Some(channel_id))
        .await?;
    ctx.say(format!("✅ Transcripts will be sent to <#{}>", channel_id))
        .await?;
    Ok(())
}

/// Role that can see and manage every ticket
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn admin_role(
    ctx: Context<'_>,
    #[description = "Administrator role"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let role_id = role.id.get();
    ctx.data()
        .dbs
        .support
        .update_settings(guild_id, |s| s.admin_role = Some(role_id))
        .await?;
    ctx.say(format!("✅ Ticket administrator role set to <@&{}>", role_id))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_lines_show_status() {
        let mut ticket = TicketRecord::new(3, 1, 42, 100, 101);
        ticket.opened_at = 1_700_000_000;
        assert_eq!(
            ticket_line(&ticket),
            "`#3` <#100> by <@42> (open, <t:1700000000:R>)"
        );
        ticket.status = TicketStatus::Closed;
        assert!(ticket_line(&ticket).contains("closed"));
    }
}
