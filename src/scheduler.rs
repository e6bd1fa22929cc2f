//! Wall-clock scheduled jobs.
//!
//! Each job runs in its own tokio task: sleep until the next local
//! occurrence of the configured HH:MM, run once, sleep again. A failed run
//! is logged and the loop keeps going; occurrences missed while the process
//! was down are not replayed.

use crate::{
    bot::handlers::message::build_summary_embed,
    config::AppConfig,
    core::{activity, clock, reconcile, wallet::Wallet},
    errors::Result,
};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info};

/// Spawns the daily summary and weekly balance check loops.
///
/// Posts go to the first target channel. Config validation guarantees the
/// list is non-empty, but a missing channel only disables the jobs rather
/// than panicking.
pub fn spawn_jobs(http: Arc<serenity::Http>, db: DatabaseConnection, config: Arc<AppConfig>) {
    let Some(&channel_id) = config.target_channel_ids.first() else {
        error!("No target channel configured, scheduled jobs disabled");
        return;
    };
    let channel = serenity::ChannelId::new(channel_id);

    {
        let http = Arc::clone(&http);
        let db = db.clone();
        let config = Arc::clone(&config);
        tokio::spawn(async move {
            daily_summary_loop(&http, &db, &config, channel).await;
        });
    }
    tokio::spawn(async move {
        weekly_check_loop(&http, &db, &config, channel).await;
    });
    info!("Scheduled jobs started");
}

async fn daily_summary_loop(
    http: &serenity::Http,
    db: &DatabaseConnection,
    config: &AppConfig,
    channel: serenity::ChannelId,
) {
    loop {
        let now_local = Utc::now().with_timezone(&config.utc_offset);
        tokio::time::sleep(clock::duration_until_next(now_local, config.schedule_time)).await;

        if let Err(e) = post_daily_summary(http, db, config, channel).await {
            error!("Daily summary failed: {e}");
        }
    }
}

/// Posts the last day's activities; stays quiet when there were none.
async fn post_daily_summary(
    http: &serenity::Http,
    db: &DatabaseConnection,
    config: &AppConfig,
    channel: serenity::ChannelId,
) -> Result<()> {
    let to = Utc::now();
    let from = to - Duration::hours(24);
    let activities = activity::list_between(db, from, to).await?;
    if activities.is_empty() {
        info!("No activities in the last day, skipping summary");
        return Ok(());
    }

    let embed = build_summary_embed(&activities, config.utc_offset);
    channel
        .send_message(http, serenity::CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn weekly_check_loop(
    http: &serenity::Http,
    db: &DatabaseConnection,
    config: &AppConfig,
    channel: serenity::ChannelId,
) {
    loop {
        let now_local = Utc::now().with_timezone(&config.utc_offset);
        tokio::time::sleep(clock::duration_until_next(
            now_local,
            config.balance_check_time,
        ))
        .await;

        // The sleep is daily; only the configured weekday actually runs
        let fired_local = Utc::now().with_timezone(&config.utc_offset);
        if fired_local.weekday() != config.balance_check_weekday {
            continue;
        }

        if let Err(e) = kickoff_weekly_checks(http, db, channel, fired_local).await {
            error!("Weekly balance check failed: {e}");
        }
    }
}

/// Starts a check for every user the weekly gate lets through and prompts
/// each of them in the target channel.
async fn kickoff_weekly_checks(
    http: &serenity::Http,
    db: &DatabaseConnection,
    channel: serenity::ChannelId,
    now_local: DateTime<FixedOffset>,
) -> Result<()> {
    let started = reconcile::weekly_kickoff(db, now_local).await?;
    if started.is_empty() {
        return Ok(());
    }

    let first = Wallet::SEQUENCE[0];
    for user_id in started {
        channel
            .say(
                http,
                format!("<@{user_id}> {}", reconcile::prompt_start(first)),
            )
            .await?;
    }
    Ok(())
}
