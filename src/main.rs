use config::Config;
use databases::Databases;
use error::CogError;
use modules::{
    interactions::{handler::InteractionHandler, poll, vote},
    logs::{handler::LogsHandler, logs},
    rolesync::{handler::RoleSyncHandler, rolesync},
    selfroles::{handler::SelfRoleHandler, selfroles},
    stats::{database::PendingMessages, handler::StatsHandler, stats, task::StatsTask},
    support::{handler::SupportHandler, support},
    system::events::ReadyHandler,
    utility::{moveall, say},
};
use poise::serenity_prelude::{self as serenity, CreateAllowedMentions};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

mod config;
mod database;
mod databases;
mod error;
mod events;
mod markers;
mod modules;
mod tasks;
mod utils;

use crate::events::EventManager;
use crate::tasks::TaskManager;

#[derive(Clone, Debug)]
pub struct Data {
    pub dbs: Arc<Databases>,
    pub event_manager: Arc<EventManager>,
    pub stats_pending: PendingMessages,
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}

fn location(ctx: Context<'_>) -> String {
    ctx.guild_id()
        .map_or_else(|| "DM".to_string(), |id| id.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    info!("starting wolfbot");

    let config = Config::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;
    let token = config.discord_token.clone();
    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;
    let task_manager = Arc::new(TaskManager::new());
    let setup_tasks = task_manager.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions::<Data, Error> {
            allowed_mentions: Some(CreateAllowedMentions::new().empty_roles().empty_users()),
            commands: vec![
                register(),
                poll(),
                vote(),
                selfroles(),
                support(),
                rolesync(),
                stats(),
                logs(),
                say(),
                moveall(),
            ],
            pre_command: |ctx| {
                Box::pin(async move {
                    trace!(
                        "Command {} used by {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        location(ctx)
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command {} completed for {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        location(ctx)
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            if let Some(cog) = error.downcast_ref::<CogError>() {
                                if cog.is_user_facing() {
                                    if let Err(e) = ctx.say(format!("❌ {}", cog)).await {
                                        warn!("Could not report error to {}: {}", ctx.author().tag(), e);
                                    }
                                    return;
                                }
                            }
                            error!(
                                "Command {} failed for {} in {}: {:?}",
                                ctx.command().qualified_name,
                                ctx.author().tag(),
                                location(ctx),
                                error
                            );
                            let _ = ctx.say("❌ Something went wrong.").await;
                        }
                        err => error!("Other framework error: {:?}", err),
                    }
                })
            },
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    data.event_manager.handle_event(ctx, event).await;
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("registering commands");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let dbs = Arc::new(Databases::open(&config).await?);
                let event_manager = Arc::new(events::EventManager::new());
                let stats_pending = PendingMessages::default();

                event_manager
                    .add_handler(ReadyHandler::new(config.presence.clone()))
                    .await;
                event_manager
                    .add_handler(InteractionHandler::new(dbs.interactions.clone()))
                    .await;
                event_manager
                    .add_handler(SelfRoleHandler::new(dbs.selfroles.clone()))
                    .await;
                event_manager
                    .add_handler(SupportHandler::new(
                        dbs.support.clone(),
                        config.export_timeout,
                        config.transcript_limit,
                    ))
                    .await;
                event_manager
                    .add_handler(RoleSyncHandler::new(dbs.rolesync.clone()))
                    .await;
                event_manager
                    .add_handler(StatsHandler::new(dbs.stats.clone(), stats_pending.clone()))
                    .await;
                event_manager
                    .add_handler(LogsHandler::new(dbs.logs.clone(), config.message_cache))
                    .await;

                setup_tasks
                    .add_task(StatsTask::new(
                        dbs.stats.clone(),
                        stats_pending.clone(),
                        config.stats_flush,
                    ))
                    .await;
                setup_tasks.start_tasks(ctx.clone()).await;

                Ok(Data {
                    dbs,
                    event_manager,
                    stats_pending,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    let result = client.start().await;
    task_manager.shutdown().await;
    result?;
    Ok(())
}
