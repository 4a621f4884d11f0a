use poise::command;
use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Configure role sync
#[command(
    slash_command,
    guild_only,
    rename = "set",
    subcommands("mainguild", "wolfrole", "memberrole", "adminrole"),
    required_permissions = "MANAGE_GUILD"
)]
pub async fn rolesync_set(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Make this server the main server
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn mainguild(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?;
    ctx.data().dbs.rolesync.set_main_guild(guild_id.get()).await?;
    info!("Main guild set to {} by {}", guild_id, ctx.author().tag());
    ctx.say("✅ This server is now the main server.").await?;
    Ok(())
}

/// Set the wolf role of this server
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn wolfrole(
    ctx: Context<'_>,
    #[description = "Wolf role"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let role_id = role.id.get();
    ctx.data()
        .dbs
        .rolesync
        .update_guild(guild_id, |g| g.wolf_role = Some(role_id))
        .await?;
    ctx.say(format!("✅ Wolf role set to <@&{}>", role_id)).await?;
    Ok(())
}

/// Set the member role of this server
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn memberrole(
    ctx: Context<'_>,
    #[description = "Member role"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let role_id = role.id.get();
    ctx.data()
        .dbs
        .rolesync
        .update_guild(guild_id, |g| g.member_role = Some(role_id))
        .await?;
    ctx.say(format!("✅ Member role set to <@&{}>", role_id)).await?;
    Ok(())
}

/// Set the admin role granted by set_admin
#[command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn adminrole(
    ctx: Context<'_>,
    #[description = "Admin role"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?.get();
    let role_id = role.id.get();
    ctx.data()
        .dbs
        .rolesync
        .update_guild(guild_id, |g| g.admin_role = Some(role_id))
        .await?;
    ctx.say(format!("✅ Admin role set to <@&{}>", role_id)).await?;
    Ok(())
}

async fn admin_role(ctx: Context<'_>) -> Result<Option<(serenity::GuildId, serenity::RoleId)>, Error> {
    let guild_id = ctx.guild_id().ok_or("Not in a guild")?;
    let settings = ctx.data().dbs.rolesync.settings(guild_id.get()).await;
    match settings.admin_role {
        Some(role) => Ok(Some((guild_id, serenity::RoleId::new(role)))),
        None => {
            ctx.say("❌ Set an admin role first with `/rolesync set adminrole`.")
                .await?;
            Ok(None)
        }
    }
}

/// Give the admin role to a member
#[command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn set_admin(
    ctx: Context<'_>,
    #[description = "Member to promote"] member: serenity::Member,
) -> Result<(), Error> {
    let Some((guild_id, role_id)) = admin_role(ctx).await? else {
        return Ok(());
    };
    ctx.http()
        .add_member_role(guild_id, member.user.id, role_id, Some("Forced by command"))
        .await?;
    info!("{} made {} admin in {}", ctx.author().tag(), member.user.id, guild_id);
    ctx.say(format!("✅ <@{}> is now an admin.", member.user.id)).await?;
    Ok(())
}

/// Take the admin role from a member
#[command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn remove_admin(
    ctx: Context<'_>,
    #[description = "Member to demote"] member: serenity::Member,
) -> Result<(), Error> {
    let Some((guild_id, role_id)) = admin_role(ctx).await? else {
        return Ok(());
    };
    ctx.http()
        .remove_member_role(guild_id, member.user.id, role_id, Some("Forced by command"))
        .await?;
    info!("{} removed {} from admins in {}", ctx.author().tag(), member.user.id, guild_id);
    ctx.say(format!("✅ <@{}> is no longer an admin.", member.user.id))
        .await?;
    Ok(())
}
