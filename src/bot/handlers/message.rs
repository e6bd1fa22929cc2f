//! Ordered message pipeline for the chat-driven features.
//!
//! Every inbound message runs through a fixed list of stages; each stage
//! either consumes the message (`Handled`) or lets it fall through (`Pass`).
//! The order is load-bearing: reconciliation answers are accepted before the
//! channel allow-list so an in-flight check can finish anywhere, note
//! logging and reactions never consume, and the activity grammars get the
//! text before the expense grammars do.

use crate::{
    bot::BotData,
    core::{
        activity::{self, ActivityStatus, Classification, NewActivity},
        clock, inventory, notes,
        parser::{self, ParsedTransaction},
        reconcile, report,
    },
    entities::ActivityModel,
    errors::{Error, Result},
};
use chrono::{DateTime, FixedOffset, Utc};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

/// What a pipeline stage did with the message.
enum Flow {
    /// The message was consumed; later stages must not see it.
    Handled,
    /// Not this stage's business; keep going.
    Pass,
}

/// Routes gateway events into the pipeline.
///
/// # Errors
/// Never by itself; stage failures are logged here so one bad message
/// cannot take the event loop down.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("Connected as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = handle_message(ctx, new_message, data).await {
                error!("Message pipeline failed: {e}");
            }
        }
        _ => {}
    }
    Ok(())
}

async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }

    let user_id = message.author.id.to_string();
    let db = &data.database;
    let config = &data.config;

    // Answers to an in-flight balance check are accepted in any channel, so
    // a check survives allow-list changes mid-flow.
    if let Flow::Handled = reconciliation_stage(ctx, message, db, &user_id).await? {
        return Ok(());
    }

    if !config.target_channel_ids.contains(&message.channel_id.get()) {
        return Ok(());
    }
    if let Some(required) = config.guild_id {
        if message.guild_id.map(serenity::GuildId::get) != Some(required) {
            return Ok(());
        }
    }

    let Some(sent_at) = DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0) else {
        return Ok(());
    };

    // Best-effort; a broken notes directory must not block the pipeline
    if let Some(dir) = &config.notes_dir {
        if let Err(e) = log_to_daily_note(dir, message, sent_at, config.utc_offset) {
            warn!("Failed to append daily note: {e}");
        }
    }

    reaction_stage(ctx, message, data).await?;

    if message.mentions_me(ctx).await? {
        mention_summary_stage(ctx, message, data).await?;
        return Ok(());
    }

    if let Flow::Handled = dialog_stage(ctx, message, db, &user_id).await? {
        return Ok(());
    }

    match activity::classify(&message.content, sent_at, config.utc_offset) {
        Classification::Activity(parsed) => {
            // The reaction stage already acknowledged the keyword
            let new = NewActivity {
                user_id,
                channel_id: message.channel_id.to_string(),
                guild_id: message.guild_id.map(|id| id.to_string()),
                message_id: message.id.to_string(),
                parsed,
            };
            activity::record(db, new).await?;
            return Ok(());
        }
        Classification::Confused => {
            message
                .reply(
                    &ctx.http,
                    "🤔 時間がよくわからなかったよ。「HH:MM ○○わず」みたいに教えてね",
                )
                .await?;
            return Ok(());
        }
        Classification::NoMatch => {}
    }

    if let Flow::Handled = expense_stage(ctx, message, data, &user_id).await? {
        return Ok(());
    }

    inventory_trigger_stage(ctx, message, db, &user_id).await?;
    Ok(())
}

/// Feeds the message to the user's in-flight balance check, if any.
async fn reconciliation_stage(
    ctx: &serenity::Context,
    message: &serenity::Message,
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Flow> {
    let Some(advance) = reconcile::handle_message(db, user_id, &message.content).await? else {
        return Ok(Flow::Pass);
    };
    message
        .reply(&ctx.http, reconcile::format_advance(&advance))
        .await?;
    Ok(Flow::Handled)
}

/// Adds the emoji of the first matching keyword rule. Never consumes.
async fn reaction_stage(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
) -> Result<()> {
    for rule in &data.config.vocabulary.reactions {
        if message.content.contains(&rule.keyword) {
            message
                .react(
                    &ctx.http,
                    serenity::ReactionType::Unicode(rule.emoji.clone()),
                )
                .await?;
            break;
        }
    }
    Ok(())
}

/// Replies to a mention with today's activity summary.
async fn mention_summary_stage(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
) -> Result<()> {
    let now = Utc::now();
    let from = clock::day_start(now.with_timezone(&data.config.utc_offset));
    let activities = activity::list_between(&data.database, from, now).await?;

    let embed = build_summary_embed(&activities, data.config.utc_offset);
    message
        .channel_id
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Feeds the message to the user's pending inventory question, if any.
async fn dialog_stage(
    ctx: &serenity::Context,
    message: &serenity::Message,
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Flow> {
    let Some(guild_id) = message.guild_id else {
        return Ok(Flow::Pass);
    };
    let Some(reply) =
        inventory::advance_dialog(db, user_id, &guild_id.to_string(), &message.content).await?
    else {
        return Ok(Flow::Pass);
    };
    message
        .reply(&ctx.http, format_dialog_reply(&reply))
        .await?;
    Ok(Flow::Handled)
}

/// Tries the expense grammars on anything that mentions an amount in 円.
///
/// Text without an amount is not a candidate and falls through untouched;
/// text with an amount that no grammar accepts gets a "didn't get that"
/// reply so typos don't vanish silently.
async fn expense_stage(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
    user_id: &str,
) -> Result<Flow> {
    if !parser::mentions_amount(&message.content) {
        return Ok(Flow::Pass);
    }

    let Some(parsed) = data.parser.parse(&message.content) else {
        message
            .reply(
                &ctx.http,
                "🤔 うまく読めなかったよ。「食費に500円」みたいに書いてくれる？",
            )
            .await?;
        return Ok(Flow::Handled);
    };

    record_parsed_spend(ctx, message, data, user_id, &parsed).await?;
    Ok(Flow::Handled)
}

async fn record_parsed_spend(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &BotData,
    user_id: &str,
    parsed: &ParsedTransaction,
) -> Result<()> {
    use crate::core::ledger;

    match ledger::spend(
        &data.database,
        user_id,
        parsed.wallet,
        &parsed.category,
        parsed.amount,
        true,
        None,
    )
    .await
    {
        Ok(outcome) => {
            let remaining = outcome.remaining.unwrap_or_default();
            message
                .reply(
                    &ctx.http,
                    format!(
                        "💸 {}に{}を記録したよ！（{}: 残り{}）",
                        parsed.category,
                        report::format_yen(parsed.amount),
                        parsed.wallet,
                        report::format_yen(remaining),
                    ),
                )
                .await?;
        }
        Err(Error::InsufficientFunds {
            wallet,
            current,
            requested,
        }) => {
            message
                .reply(
                    &ctx.http,
                    format!(
                        "❌ {}の残高が足りないよ（いま{}、必要{}）",
                        wallet,
                        report::format_yen(current),
                        report::format_yen(requested)
                    ),
                )
                .await?;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Answers the four inventory trigger phrases.
async fn inventory_trigger_stage(
    ctx: &serenity::Context,
    message: &serenity::Message,
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<()> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let Some(trigger) = inventory::match_trigger(&message.content) else {
        return Ok(());
    };
    let guild_id = guild_id.to_string();

    let reply = match trigger {
        inventory::Trigger::AddStorage => {
            inventory::set_dialog(db, user_id, inventory::PendingDialog::AwaitingStorageName)
                .await?;
            "🗄️ 新しい収納の名前を教えてね".to_string()
        }
        inventory::Trigger::PutAway { item } => {
            let dialog = inventory::PendingDialog::AwaitingItemStorage { item: item.clone() };
            inventory::set_dialog(db, user_id, dialog).await?;
            format!("📦 「{item}」をどこにしまう？")
        }
        inventory::Trigger::WhereIs { item } => {
            match inventory::locate_item(db, &guild_id, &item).await? {
                Some((_, storage)) => format!("🔍 「{item}」は「{}」にあるよ", storage.name),
                None => format!("🤔 「{item}」は見つからなかったよ"),
            }
        }
        inventory::Trigger::WhatIsIn { storage } => {
            match inventory::list_items(db, &guild_id, &storage).await {
                Ok(items) if items.is_empty() => format!("「{storage}」はからっぽだよ"),
                Ok(items) => {
                    let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
                    format!("📦 「{storage}」には {} が入ってるよ", names.join("、"))
                }
                Err(Error::NotFound { .. }) => {
                    format!("🤔 「{storage}」っていう収納は知らないよ")
                }
                Err(e) => return Err(e),
            }
        }
    };

    message.reply(&ctx.http, reply).await?;
    Ok(())
}

fn format_dialog_reply(reply: &inventory::DialogReply) -> String {
    match reply {
        inventory::DialogReply::StorageCreated { name } => {
            format!("🗄️ 収納「{name}」を作ったよ！")
        }
        inventory::DialogReply::StorageExists { name } => format!("「{name}」はもうあるよ"),
        inventory::DialogReply::ItemStored { item, storage } => {
            format!("📦 「{item}」を「{storage}」にしまったよ！")
        }
        inventory::DialogReply::ItemExists { item, storage } => {
            format!("「{item}」はもう「{storage}」に入ってるよ")
        }
        inventory::DialogReply::StorageMissing { item, storage } => {
            format!("🤔 「{storage}」っていう収納は知らないよ。「{item}」はしまえなかった")
        }
    }
}

/// Appends the message to the local daily note file.
fn log_to_daily_note(
    dir: &std::path::Path,
    message: &serenity::Message,
    sent_at: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<()> {
    let local = sent_at.with_timezone(&offset);
    let entry = notes::format_entry(
        &local.format("%H:%M").to_string(),
        &message.author.name,
        &message.content,
        Some(&message.link()),
    );
    notes::append_entry(dir, local.date_naive(), &entry)
}

/// Builds the activity summary embed shared by the mention reply and the
/// scheduled daily post.
#[must_use]
pub fn build_summary_embed(
    activities: &[ActivityModel],
    offset: FixedOffset,
) -> serenity::CreateEmbed {
    use std::fmt::Write;

    let mut sections: Vec<(String, String, bool)> = Vec::new();
    for status in [ActivityStatus::Done, ActivityStatus::Doing, ActivityStatus::Todo] {
        let mut body = String::new();
        for row in activities.iter().filter(|row| row.status == status.as_str()) {
            let time = row.activity_time.with_timezone(&offset).format("%H:%M");
            let _ = writeln!(&mut body, "・{time} {}", row.content);
        }
        if !body.is_empty() {
            sections.push((
                format!("{} {}", status_emoji(status), status.keyword()),
                body,
                false,
            ));
        }
    }

    let embed = serenity::CreateEmbed::default()
        .title("📋 アクティビティまとめ")
        .color(0x0000_FF00) // Green color
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{}件",
            activities.len()
        )));
    if sections.is_empty() {
        embed.description("まだ記録がないよ")
    } else {
        embed.fields(sections)
    }
}

const fn status_emoji(status: ActivityStatus) -> &'static str {
    match status {
        ActivityStatus::Done => "✅",
        ActivityStatus::Doing => "🔄",
        ActivityStatus::Todo => "📌",
    }
}
