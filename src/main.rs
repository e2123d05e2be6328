use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

/// Discord bot hosting seasons of ten-word writing rounds with blind pairwise voting
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

mod commands;
mod components;
mod config;
mod error;
mod events;
mod game;
mod managers;
mod messages;
mod models;
mod notify;
mod results;
mod state;

use commands::{
    activate, conclude, deactivate, help, hibernate, ping, prompt, results, signup, standings,
    status, vote,
};
use config::GameConfig;
use error::BotError;
use events::handle_interaction;
use managers::{
    create_shared_entry_manager, create_shared_season_locks, create_shared_season_manager,
    create_shared_voting_manager, SharedEntryManager, SharedSeasonManager, SharedVotingManager,
};
use notify::DiscordAnnouncer;
use state::{create_shared_store, JsonStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<GameConfig>,
    pub seasons: SharedSeasonManager,
    pub entries: SharedEntryManager,
    pub voting: SharedVotingManager,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::InteractionCreate { interaction } = event {
        if let Err(e) = handle_interaction(ctx, interaction, data).await {
            error!("Failed to handle interaction: {}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(args.log_level)
        .init();

    let token =
        std::env::var("DISCORD_TOKEN").context("Missing DISCORD_TOKEN environment variable")?;

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "data/game.json".to_string());
    let state_path = std::env::var("STATE_PATH").unwrap_or_else(|_| "state".to_string());

    tokio::fs::create_dir_all(&state_path)
        .await
        .with_context(|| format!("Could not create state directory '{}'", state_path))?;

    info!("Loading game config from {}...", config_path);
    let config = Arc::new(GameConfig::load_or_default(&config_path)?);

    info!("Loading game state...");
    let store_path = format!("{}/twow_state.json", state_path);
    let store = create_shared_store(JsonStore::open(&store_path).await?);
    let locks = create_shared_season_locks();

    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                ping(),
                help(),
                activate(),
                deactivate(),
                signup(),
                prompt(),
                vote(),
                conclude(),
                hibernate(),
                status(),
                results(),
                standings(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            let reply = match error.downcast_ref::<BotError>() {
                                Some(e @ BotError::Invariant { .. }) => {
                                    error!("Data corruption in '{}': {}", ctx.command().qualified_name, e);
                                    "Something went wrong. The hosts have been notified in the logs.".to_string()
                                }
                                _ => {
                                    error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                                    format!("An error occurred: {}", error)
                                }
                            };
                            let _ = ctx
                                .send(poise::CreateReply::default().content(reply).ephemeral(true))
                                .await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            error!("User {} missing permissions for '{}': {:?}", ctx.author().name, ctx.command().qualified_name, missing_permissions);
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = config.clone();
            let store = store.clone();
            let locks = locks.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let announcer = Arc::new(DiscordAnnouncer::new(ctx.http.clone()));
                let seasons =
                    create_shared_season_manager(store.clone(), announcer, config.clone(), locks);
                let entries = create_shared_entry_manager(store.clone(), seasons.clone());
                let voting = create_shared_voting_manager(store, seasons.clone());

                let active = seasons.rebuild_index().await?;
                info!("Restored {} active channel(s)", active);

                if let Some(activity) = &config.activity {
                    ctx.set_activity(Some(serenity::ActivityData::playing(activity.clone())));
                }

                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id {
                    vec![serenity::GuildId::new(gid)]
                } else {
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                Ok(Data {
                    config,
                    seasons,
                    entries,
                    voting,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        error!("Failed to start bot: {}", e);
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
