//! Bot layer - Discord-specific interface, commands, and the message pipeline
//!
//! This module provides the Discord interface for Sora: all slash commands,
//! the message pipeline that drives the chat-based features, and the poise
//! framework wiring. Everything Discord-shaped lives here; the core modules
//! stay framework-agnostic.

/// Discord command implementations (wallet, transaction, reconcile, activity, general)
pub mod commands;
/// Discord event and interaction handlers
pub mod handlers;

use crate::{
    config::AppConfig,
    core::parser::TransactionParser,
    errors::{Error, Result},
    scheduler,
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info};

/// Shared data available to all bot commands and handlers.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Application settings and vocabulary
    pub config: Arc<AppConfig>,
    /// Expense grammars, compiled once from the vocabulary
    pub parser: TransactionParser,
}

impl BotData {
    /// Creates the shared bot context, compiling the expense grammars.
    ///
    /// # Errors
    /// Returns an error when the vocabulary yields an invalid grammar.
    pub fn new(database: DatabaseConnection, config: Arc<AppConfig>) -> Result<Self> {
        let parser = TransactionParser::new(&config.vocabulary.categories, config.default_wallet)?;
        Ok(Self {
            database,
            config,
            parser,
        })
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            panic!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say("うーん、なにかうまくいかなかったみたい…🙏").await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the poise framework and runs the Discord client until it exits.
///
/// Commands are registered in the configured guild when `GUILD_ID` is set
/// (instant updates), globally otherwise. The scheduler loops are spawned
/// from `setup`, once the gateway handed us an HTTP client.
///
/// # Errors
/// Returns an error when the client cannot be built or the gateway
/// connection fails.
pub async fn run_bot(
    token: String,
    config: Arc<AppConfig>,
    database: DatabaseConnection,
) -> Result<()> {
    let data = BotData::new(database.clone(), Arc::clone(&config))?;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::balance(),
                commands::salary(),
                commands::spend(),
                commands::transfer(),
                commands::reset(),
                commands::history(),
                commands::edit_spend(),
                commands::report(),
                commands::check_balance_manual(),
                commands::scan_past_activities(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::message::handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                if let Some(guild_id) = config.guild_id {
                    let guild = serenity::GuildId::new(guild_id);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild)
                        .await?;
                    info!("Registered commands in guild {guild}");
                } else {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    info!("Registered commands globally");
                }
                scheduler::spawn_jobs(ctx.http.clone(), database, Arc::clone(&config));
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .map_err(Error::from)?;

    info!("Starting bot client...");
    client.start().await.map_err(Error::from)
}
