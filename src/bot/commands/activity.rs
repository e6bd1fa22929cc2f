//! Activity backfill command.
//!
//! Walks back through a channel's message history and records any activity
//! lines the bot missed while it was offline. Recording is idempotent by
//! message id, so re-running over the same window is safe.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::activity::{self, Classification, NewActivity},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Upper bound on history pages fetched per scan (100 messages each).
    const MAX_SCAN_PAGES: usize = 10;

    /// Re-reads recent channel history and records missed activities.
    #[poise::command(slash_command, prefix_command)]
    pub async fn scan_past_activities(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many days to look back (default 1)"]
        #[min = 1]
        #[max = 30]
        days_back: Option<i64>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let channel_id = ctx.channel_id();

        if !data.config.target_channel_ids.contains(&channel_id.get()) {
            ctx.say("❌ このチャンネルは見てないよ").await?;
            return Ok(());
        }

        // Paging through history can take a moment
        ctx.defer().await?;

        let cutoff = chrono::Utc::now() - chrono::Duration::days(days_back.unwrap_or(1));
        let guild_id = ctx.guild_id().map(|id| id.to_string());

        let mut scanned = 0usize;
        let mut recorded = 0usize;
        let mut before: Option<serenity::MessageId> = None;

        'pages: for _ in 0..MAX_SCAN_PAGES {
            let mut request = serenity::GetMessages::new().limit(100);
            if let Some(id) = before {
                request = request.before(id);
            }
            let page = channel_id.messages(ctx.http(), request).await?;
            if page.is_empty() {
                break;
            }

            // Pages come newest first; stop at the first message past the cutoff
            for message in &page {
                let Some(sent_at) =
                    chrono::DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0)
                else {
                    continue;
                };
                if sent_at < cutoff {
                    break 'pages;
                }
                if message.author.bot {
                    continue;
                }
                scanned += 1;

                if let Classification::Activity(parsed) =
                    activity::classify(&message.content, sent_at, data.config.utc_offset)
                {
                    let new = NewActivity {
                        user_id: message.author.id.to_string(),
                        channel_id: channel_id.to_string(),
                        guild_id: guild_id.clone(),
                        message_id: message.id.to_string(),
                        parsed,
                    };
                    if activity::record(db, new).await?.is_some() {
                        recorded += 1;
                    }
                }
            }
            before = page.last().map(|message| message.id);
        }

        ctx.say(format!(
            "🔎 {scanned}件チェックして、{recorded}件のアクティビティを記録したよ！"
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
