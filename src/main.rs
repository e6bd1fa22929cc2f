//! Binary entry point: configuration, database, then the bot.

use dotenvy::dotenv;
use sora::{
    bot, config,
    errors::{Error, Result},
};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()?;

    // 4. Initialize the database
    let db = config::database::init_db(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Run the bot. DISCORD_BOT_TOKEN is read here, directly before use,
    //    and never stored in AppConfig.
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    info!("Starting Sora...");
    bot::run_bot(token, Arc::new(app_config), db).await
}
