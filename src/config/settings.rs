//! Application settings loaded from environment variables
//!
//! Everything the bot needs beyond the vocabulary file comes from the
//! environment: which channels to watch, when the scheduled jobs fire, and
//! the local timezone for day and week arithmetic. Parsing lives in small
//! pure helpers so the formats stay unit-testable.

use crate::{
    config::vocabulary::{self, Vocabulary},
    core::wallet::Wallet,
    errors::{Error, Result},
};
use chrono::{FixedOffset, NaiveTime, Weekday};
use std::path::PathBuf;
use tracing::info;

/// Runtime configuration assembled from the environment and config.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string
    pub database_url: String,
    /// Channels the bot listens in; scheduled posts go to the first one
    pub target_channel_ids: Vec<u64>,
    /// Guild to register slash commands in; global registration when unset
    pub guild_id: Option<u64>,
    /// Local clock time for the daily activity summary
    pub schedule_time: NaiveTime,
    /// Local clock time for the weekly balance check
    pub balance_check_time: NaiveTime,
    /// Day of week the balance check runs on
    pub balance_check_weekday: Weekday,
    /// Wallet assumed by expense grammars that don't name one
    pub default_wallet: Wallet,
    /// Fixed offset applied when interpreting wall-clock input
    pub utc_offset: FixedOffset,
    /// Directory for daily note files; note logging is off when unset
    pub notes_dir: Option<PathBuf>,
    /// Categories and reaction rules
    pub vocabulary: Vocabulary,
}

/// Loads the full application configuration.
///
/// # Errors
/// Returns an error when `TARGET_CHANNEL_IDS` is missing or malformed, or
/// when any optional variable is present but unparseable.
pub fn load_app_configuration() -> Result<AppConfig> {
    let database_url = optional_env("DATABASE_URL")
        .unwrap_or_else(|| "sqlite://data/sora.sqlite?mode=rwc".to_string());

    let channels_raw = optional_env("TARGET_CHANNEL_IDS").ok_or_else(|| Error::Config {
        message: "TARGET_CHANNEL_IDS must be set (comma-separated channel IDs)".to_string(),
    })?;
    let target_channel_ids = parse_channel_ids(&channels_raw)?;

    let guild_id = optional_env("GUILD_ID")
        .map(|raw| parse_snowflake(&raw, "GUILD_ID"))
        .transpose()?;

    let schedule_time = optional_env("SCHEDULE_TIME")
        .map(|raw| parse_clock(&raw, "SCHEDULE_TIME"))
        .transpose()?
        .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default());

    let balance_check_time = optional_env("BALANCE_CHECK_TIME")
        .map(|raw| parse_clock(&raw, "BALANCE_CHECK_TIME"))
        .transpose()?
        .unwrap_or_else(|| NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default());

    let balance_check_weekday = optional_env("BALANCE_CHECK_WEEKDAY")
        .map(|raw| parse_weekday(&raw))
        .transpose()?
        .unwrap_or(Weekday::Fri);

    let default_wallet = optional_env("DEFAULT_WALLET")
        .map(|raw| parse_wallet(&raw))
        .transpose()?
        .unwrap_or(Wallet::Pote);

    let utc_offset = match optional_env("UTC_OFFSET_HOURS") {
        Some(raw) => parse_utc_offset(&raw)?,
        None => parse_utc_offset("9")?,
    };

    let notes_dir = optional_env("NOTES_DIR").map(PathBuf::from);

    let vocabulary_path = optional_env("SORA_CONFIG").unwrap_or_else(|| "config.toml".to_string());
    let vocabulary = vocabulary::load_vocabulary(&vocabulary_path)?;

    info!(
        "Configuration loaded: {} target channel(s), {} categories, summary at {}, check {} at {}",
        target_channel_ids.len(),
        vocabulary.categories.len(),
        schedule_time,
        balance_check_weekday,
        balance_check_time,
    );

    Ok(AppConfig {
        database_url,
        target_channel_ids,
        guild_id,
        schedule_time,
        balance_check_time,
        balance_check_weekday,
        default_wallet,
        utc_offset,
        notes_dir,
        vocabulary,
    })
}

/// Reads an environment variable, treating unset and empty as absent.
fn optional_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// Parses a comma-separated list of channel IDs.
pub(crate) fn parse_channel_ids(raw: &str) -> Result<Vec<u64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_snowflake(part, "TARGET_CHANNEL_IDS"))
        .collect::<Result<Vec<u64>>>()?;

    if ids.is_empty() {
        return Err(Error::Config {
            message: "TARGET_CHANNEL_IDS must contain at least one channel ID".to_string(),
        });
    }
    Ok(ids)
}

/// Parses a Discord snowflake, rejecting zero.
pub(crate) fn parse_snowflake(raw: &str, var: &str) -> Result<u64> {
    let id = raw.parse::<u64>().map_err(|_| Error::Config {
        message: format!("{var}: '{raw}' is not a valid ID"),
    })?;
    if id == 0 {
        return Err(Error::Config {
            message: format!("{var}: ID must be non-zero"),
        });
    }
    Ok(id)
}

/// Parses a HH:MM wall-clock time.
pub(crate) fn parse_clock(raw: &str, var: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| Error::Config {
        message: format!("{var}: '{raw}' is not a valid HH:MM time"),
    })
}

/// Parses a weekday name ("Fri", "friday", ...).
pub(crate) fn parse_weekday(raw: &str) -> Result<Weekday> {
    raw.parse::<Weekday>().map_err(|_| Error::Config {
        message: format!("BALANCE_CHECK_WEEKDAY: '{raw}' is not a valid weekday"),
    })
}

/// Parses a wallet by label or slug.
pub(crate) fn parse_wallet(raw: &str) -> Result<Wallet> {
    Wallet::from_label(raw)
        .or_else(|| Wallet::from_slug(raw))
        .ok_or_else(|| Error::Config {
            message: format!("DEFAULT_WALLET: '{raw}' is not a known wallet"),
        })
}

/// Parses a UTC offset in whole hours.
pub(crate) fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let hours = raw.parse::<i32>().map_err(|_| Error::Config {
        message: format!("UTC_OFFSET_HOURS: '{raw}' is not a number"),
    })?;
    if !(-23..=23).contains(&hours) {
        return Err(Error::Config {
            message: format!("UTC_OFFSET_HOURS: {hours} is out of range"),
        });
    }
    FixedOffset::east_opt(hours * 3600).ok_or_else(|| Error::Config {
        message: format!("UTC_OFFSET_HOURS: {hours} is not a valid offset"),
    })
}
