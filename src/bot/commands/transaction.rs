//! Expense and journal Discord commands - spend, `edit_spend`, history, report.
//!
//! This module contains commands that interact with the database through the
//! core ledger to record, correct, and summarize spending.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{PeriodChoice, WalletChoice},
            handlers::autocomplete,
        },
        core::{
            clock,
            ledger::{self, SpendEdit},
            report::{self, ReportPeriod},
            wallet::Wallet,
        },
        errors::{Error, Result},
    };
    use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Records an expense from a wallet.
    ///
    /// By default the amount is subtracted from the configured default
    /// wallet today; the optional arguments pick a different wallet, make
    /// the row bookkeeping-only, or backdate it.
    #[poise::command(slash_command, prefix_command)]
    pub async fn spend(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount in yen"]
        #[min = 1]
        amount: i64,
        #[description = "Spending category"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Wallet to pay from (default: the configured one)"] from_wallet: Option<
            WalletChoice,
        >,
        #[description = "Subtract from the wallet balance (default: yes)"] reflect_balance: Option<
            bool,
        >,
        #[description = "Backdate, YYYY-MM-DD or MM/DD"] date: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let user_id = ctx.author().id.to_string();

        if !known_category(data, &category) {
            ctx.say(unknown_category_message(data, &category)).await?;
            return Ok(());
        }

        let at = match date.as_deref() {
            None => None,
            Some(raw) => match parse_backdate(raw, data.config.utc_offset) {
                Some(at) => Some(at),
                None => {
                    ctx.say(format!(
                        "❌ 日付が読めなかったよ: {raw}（例: 2024-05-10 か 5/10）"
                    ))
                    .await?;
                    return Ok(());
                }
            },
        };

        let wallet = from_wallet.map_or(data.config.default_wallet, Wallet::from);
        let reflect = reflect_balance.unwrap_or(true);

        let outcome = match ledger::spend(db, &user_id, wallet, &category, amount, reflect, at).await
        {
            Ok(outcome) => outcome,
            Err(Error::InsufficientFunds {
                wallet,
                current,
                requested,
            }) => {
                ctx.say(format!(
                    "❌ {}の残高が足りないよ（いま{}、必要{}）",
                    wallet,
                    report::format_yen(current),
                    report::format_yen(requested)
                ))
                .await?;
                return Ok(());
            }
            Err(Error::InvalidAmount { .. }) => {
                ctx.say("❌ 金額は1円以上で教えてね").await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut reply = if let Some(remaining) = outcome.remaining {
            format!(
                "💸 {}に{}を記録したよ！（{}: 残り{}）",
                category,
                report::format_yen(amount),
                wallet,
                report::format_yen(remaining)
            )
        } else {
            format!(
                "📝 {}に{}を帳簿だけに記録したよ（{}）",
                category,
                report::format_yen(amount),
                wallet
            )
        };
        if at.is_some() {
            let day = outcome
                .row
                .created_at
                .with_timezone(&data.config.utc_offset)
                .format("%m/%d");
            write!(&mut reply, " {day}の分")?;
        }
        write!(&mut reply, " (ID: {})", outcome.row.id)?;

        ctx.say(reply).await?;
        Ok(())
    }

    /// Corrects a past spend.
    ///
    /// Any combination of amount, category, wallet, balance reflection, and
    /// date can change; wallet balances are adjusted to match.
    #[poise::command(slash_command, prefix_command)]
    pub async fn edit_spend(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "ID of the spend to correct"]
        #[min = 1]
        transaction_id: i64,
        #[description = "New amount in yen"]
        #[min = 1]
        amount: Option<i64>,
        #[description = "New category"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "New wallet"] from_wallet: Option<WalletChoice>,
        #[description = "Whether the spend touches the wallet balance"] reflect_balance: Option<
            bool,
        >,
        #[description = "New date, YYYY-MM-DD or MM/DD"] date: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let user_id = ctx.author().id.to_string();

        if amount.is_none()
            && category.is_none()
            && from_wallet.is_none()
            && reflect_balance.is_none()
            && date.is_none()
        {
            ctx.say("❌ 直すところをひとつは教えてね（金額・カテゴリ・財布・残高反映・日付）")
                .await?;
            return Ok(());
        }

        if let Some(ref cat) = category {
            if !known_category(data, cat) {
                ctx.say(unknown_category_message(data, cat)).await?;
                return Ok(());
            }
        }

        let at = match date.as_deref() {
            None => None,
            Some(raw) => match parse_backdate(raw, data.config.utc_offset) {
                Some(at) => Some(at),
                None => {
                    ctx.say(format!(
                        "❌ 日付が読めなかったよ: {raw}（例: 2024-05-10 か 5/10）"
                    ))
                    .await?;
                    return Ok(());
                }
            },
        };

        let mut changes = Vec::new();
        if let Some(value) = amount {
            changes.push(format!("金額を{}に", report::format_yen(value)));
        }
        if let Some(ref cat) = category {
            changes.push(format!("カテゴリを{cat}に"));
        }
        if let Some(choice) = from_wallet {
            changes.push(format!("財布を{}に", Wallet::from(choice)));
        }
        if let Some(reflect) = reflect_balance {
            changes.push(if reflect { "残高に反映するように" } else { "帳簿だけに" }.to_string());
        }
        if let Some(at) = at {
            let day = at.with_timezone(&data.config.utc_offset).format("%m/%d");
            changes.push(format!("日付を{day}に"));
        }

        let edit = SpendEdit {
            amount,
            category,
            wallet: from_wallet.map(Wallet::from),
            reflect_balance,
            at,
        };

        match ledger::edit_spend(db, &user_id, transaction_id, edit).await {
            Ok(row) => {
                ctx.say(format!(
                    "✏️ 取引 #{} を直したよ: {}",
                    row.id,
                    changes.join("、")
                ))
                .await?;
            }
            Err(Error::NotFound { .. }) => {
                ctx.say(format!("❌ ID {transaction_id} の記録が見つからないよ"))
                    .await?;
            }
            Err(Error::Validation { .. }) => {
                ctx.say("❌ それは出費の記録じゃないから直せないよ").await?;
            }
            Err(Error::InsufficientFunds {
                wallet,
                current,
                requested,
            }) => {
                ctx.say(format!(
                    "❌ 直すと{}の残高が足りなくなるよ（いま{}、必要{}）",
                    wallet,
                    report::format_yen(current),
                    report::format_yen(requested)
                ))
                .await?;
            }
            Err(Error::InvalidAmount { .. }) => {
                ctx.say("❌ 金額は1円以上で教えてね").await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Shows the most recent journal rows, newest first.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many rows to show (default 10)"]
        #[min = 1]
        #[max = 30]
        limit: Option<u64>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let user_id = ctx.author().id.to_string();

        let rows = ledger::history(db, &user_id, limit.unwrap_or(10)).await?;
        if rows.is_empty() {
            ctx.say("📒 まだ記録がないよ").await?;
            return Ok(());
        }

        let mut response = String::from("📒 **最近の記録**\n");
        for row in &rows {
            writeln!(
                &mut response,
                "{}",
                report::format_transaction_line(row, data.config.utc_offset)
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Shows a spending report for this week or this month.
    #[poise::command(slash_command, prefix_command)]
    pub async fn report(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Window (default: this week)"] period: Option<PeriodChoice>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let user_id = ctx.author().id.to_string();
        let period = period.map_or(ReportPeriod::Week, ReportPeriod::from);

        let now_local = Utc::now().with_timezone(&data.config.utc_offset);
        let summary = report::spending_report(db, &user_id, period, now_local).await?;

        let mut spent_value = report::format_yen(summary.total_spent);
        if summary.reflected_spent != summary.total_spent {
            write!(
                &mut spent_value,
                "（残高に反映 {}）",
                report::format_yen(summary.reflected_spent)
            )?;
        }

        let mut category_value = String::new();
        for (name, spent) in &summary.by_category {
            writeln!(&mut category_value, "・{name}: {}", report::format_yen(*spent))?;
        }
        if category_value.is_empty() {
            category_value.push_str("なし");
        }

        let mut balance_value = String::new();
        for (wallet, amount) in &summary.balances {
            writeln!(&mut balance_value, "・{wallet}: {}", report::format_yen(*amount))?;
        }

        let since_label = summary
            .since
            .with_timezone(&data.config.utc_offset)
            .format("%m/%d");

        let embed = serenity::CreateEmbed::default()
            .title(format!("📊 {}のレポート", period.label()))
            .description(format!("{since_label}から"))
            .color(0x0034_98DB) // Blue color
            .fields(vec![
                ("💸 使ったお金".to_string(), spent_value, false),
                ("📁 カテゴリ別".to_string(), category_value, false),
                ("👛 いまの残高".to_string(), balance_value, false),
            ])
            .footer(serenity::CreateEmbedFooter::new("Sora v0.3.0"));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    fn known_category(data: &BotData, category: &str) -> bool {
        data.config
            .vocabulary
            .categories
            .iter()
            .any(|known| known == category)
    }

    fn unknown_category_message(data: &BotData, category: &str) -> String {
        format!(
            "❌ 「{category}」っていうカテゴリは知らないよ。使えるのは: {}",
            data.config.vocabulary.categories.join("、")
        )
    }

    /// Noon of the given local day, so the row lands inside that day in any
    /// nearby timezone reading.
    fn parse_backdate(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let today = Utc::now().with_timezone(&offset).date_naive();
        let day = clock::parse_user_date(raw, today)?;
        let noon = day.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
        Some(clock::to_utc(noon, offset))
    }
}

// Re-export all commands
pub use inner::*;
