use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Discord bot posting weekly ESPN fantasy football recaps
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
}

mod commands;
mod config;
mod discord;
mod error;
mod logging;
mod managers;
mod messages;
mod navigator;
mod recap;
mod scheduler;
mod state;
mod upstream;

use commands::{autopost, configure, debugweek, help, ping, setup, weeklyrecap};
use config::BotConfig;
use discord::{run_startup_permission_check, DiscordSink};
use error::BotError;
use managers::{
    create_shared_gate, job_queue, GuildLocks, JobQueue, RecapService, SharedGate, WorkerPool,
};
use recap::PrecisionCache;
use state::{create_shared_settings_store, SettingsStore, SharedSettingsStore};
use upstream::{EspnClient, LeagueClient};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// How long shutdown waits for queued recaps to finish
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Shared application state
pub struct Data {
    pub settings: SharedSettingsStore,
    pub gate: SharedGate,
    pub client: Arc<dyn LeagueClient>,
    pub queue: JobQueue,
}

/// Tasks started once the gateway is ready
struct Background {
    workers: WorkerPool,
    scheduler: JoinHandle<()>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init();

    let token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;
    let config = BotConfig::from_env()?;
    info!(
        "Gate: {} permit(s), {}s timeout; {} recap worker(s)",
        config.gate_permits,
        config.gate_timeout.as_secs(),
        config.recap_workers
    );

    info!("Loading guild settings from {}...", config.settings_path.display());
    let settings_store = SettingsStore::load(&config.settings_path).await?;
    info!("Loaded settings for {} guild(s)", settings_store.guild_count());
    let settings = create_shared_settings_store(settings_store);

    let gate = create_shared_gate(config.gate_permits, config.gate_timeout);
    let league_client: Arc<dyn LeagueClient> =
        Arc::new(EspnClient::new(config.espn_base_url.clone(), config.gate_timeout));
    let precision = Arc::new(PrecisionCache::new());
    let (queue, receiver) = job_queue();

    // Filled in by the framework setup, drained at shutdown
    let background: Arc<tokio::sync::Mutex<Option<Background>>> = Arc::default();

    // Extract CLI flags for use in setup
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

    let setup_background = background.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                ping(),
                help(),
                setup(),
                configure(),
                autopost(),
                // path-qualified, `settings` is also the settings store binding
                commands::settings(),
                debugweek(),
                weeklyrecap(),
            ],
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
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let content = match error.downcast_ref::<BotError>() {
                                Some(e) => messages::user_error(e),
                                None => format!("An error occurred: {}", error),
                            };
                            let _ = ctx.send(poise::CreateReply::default()
                                .content(content)
                                .ephemeral(true))
                                .await;
                        }
                        poise::FrameworkError::CooldownHit { remaining_cooldown, ctx, .. } => {
                            info!(
                                "Command '{}' on cooldown for {} more seconds",
                                ctx.command().qualified_name,
                                remaining_cooldown.as_secs()
                            );
                            let _ = ctx.send(poise::CreateReply::default()
                                .content(messages::cooldown(remaining_cooldown.as_secs()))
                                .ephemeral(true))
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
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let sink = Arc::new(DiscordSink::new(
                    ctx.http.clone(),
                    ctx.shard.clone(),
                    ready.user.id,
                    config.navigator_timeout,
                ));
                let service = Arc::new(RecapService::new(
                    settings.clone(),
                    league_client.clone(),
                    gate.clone(),
                    precision,
                    sink,
                ));
                let workers = WorkerPool::spawn(
                    config.recap_workers,
                    receiver,
                    service,
                    Arc::new(GuildLocks::new()),
                );
                let scheduler = tokio::spawn(scheduler::run(
                    settings.clone(),
                    queue.clone(),
                    config.autopost.clone(),
                ));
                *setup_background.lock().await = Some(Background { workers, scheduler });

                // Check recap channels of configured guilds we are in
                let channels: Vec<(serenity::GuildId, serenity::ChannelId)> = {
                    let store = settings.read().await;
                    ready
                        .guilds
                        .iter()
                        .filter_map(|g| Some((g.id, store.get(g.id)?.channel()?)))
                        .collect()
                };
                if channels.is_empty() {
                    warn!("No configured guilds yet - skipping permission check");
                } else {
                    let http = ctx.http.clone();
                    let bot_user_id = ready.user.id;
                    tokio::spawn(async move {
                        run_startup_permission_check(&http, bot_user_id, &channels).await;
                    });
                }

                // Determine which guilds to register commands for
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
                    settings,
                    gate,
                    client: league_client,
                    queue,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    let outcome = client.start().await;
    if let Err(e) = &outcome {
        error!("Bot stopped with error: {}", e);
    }
    warn!("Bot ended.");

    // Dropping the client drops every queue sender held by commands
    drop(client);
    if let Some(Background { workers, scheduler }) = background.lock().await.take() {
        scheduler.abort();
        let _ = scheduler.await;
        if tokio::time::timeout(SHUTDOWN_GRACE, workers.join()).await.is_err() {
            warn!("Recap workers still busy after {}s, exiting anyway", SHUTDOWN_GRACE.as_secs());
        }
    }

    outcome.map_err(Into::into)
}
