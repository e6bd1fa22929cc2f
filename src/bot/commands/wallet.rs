//! Wallet Discord commands - balance, salary, transfer, and reset.
//!
//! These commands go through the core ledger, which owns validation and
//! balance arithmetic; here we only translate arguments and outcomes into
//! Discord replies.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::WalletChoice},
        core::{ledger, report, wallet::Wallet},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Shows the balance of all four wallets.
    #[poise::command(slash_command, prefix_command)]
    pub async fn balance(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();

        let balances = ledger::balances(db, &user_id).await?;
        let total: i64 = balances.iter().map(|(_, amount)| amount).sum();

        let embed_fields: Vec<(String, String, bool)> = balances
            .iter()
            .map(|(wallet, amount)| {
                (format!("👛 {wallet}"), report::format_yen(*amount), true)
            })
            .collect();

        let embed = serenity::CreateEmbed::default()
            .title("💰 おさいふ残高")
            .color(0x0034_98DB) // Blue color
            .fields(embed_fields)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "合計 {}",
                report::format_yen(total)
            )));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Records a salary and splits it across the wallets.
    ///
    /// The split is fixed: 50% to ぬし財布, 30% to 貯金, 20% to 探検隊予算,
    /// with any rounding remainder going to 貯金.
    #[poise::command(slash_command, prefix_command)]
    pub async fn salary(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Salary amount in yen"]
        #[min = 1]
        amount: i64,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();

        let (row, credits) = match ledger::salary(db, &user_id, amount).await {
            Ok(result) => result,
            Err(Error::InvalidAmount { .. }) => {
                ctx.say("❌ 金額は1円以上で教えてね").await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut lines = vec![format!(
            "💰 お給料 {} を振り分けたよ！(ID: {})",
            report::format_yen(amount),
            row.id
        )];
        for credit in &credits {
            lines.push(format!(
                "・{}: +{} → {}",
                credit.wallet,
                report::format_yen(credit.amount),
                report::format_yen(credit.new_balance)
            ));
        }
        ctx.say(lines.join("\n")).await?;
        Ok(())
    }

    /// Moves money between two wallets.
    #[poise::command(slash_command, prefix_command)]
    pub async fn transfer(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount in yen"]
        #[min = 1]
        amount: i64,
        #[description = "Wallet to take from"] from_wallet: WalletChoice,
        #[description = "Wallet to put into"] to_wallet: WalletChoice,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();
        let source = Wallet::from(from_wallet);
        let destination = Wallet::from(to_wallet);

        match ledger::transfer(db, &user_id, source, destination, amount).await {
            Ok(outcome) => {
                ctx.say(format!(
                    "🔁 {}から{}へ {} 移したよ！\n{}: {} / {}: {}",
                    source,
                    destination,
                    report::format_yen(amount),
                    source,
                    report::format_yen(outcome.source_balance),
                    destination,
                    report::format_yen(outcome.destination_balance),
                ))
                .await?;
            }
            Err(Error::SameWallet { .. }) => {
                ctx.say("❌ 同じ財布どうしでは移せないよ").await?;
            }
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
            }
            Err(Error::InvalidAmount { .. }) => {
                ctx.say("❌ 金額は1円以上で教えてね").await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Overwrites one wallet's balance with an exact value.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reset(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "New balance in yen"]
        #[min = 0]
        amount: i64,
        #[description = "Wallet to reset"] wallet: WalletChoice,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();
        let target = Wallet::from(wallet);

        let row = match ledger::reset(db, &user_id, target, amount).await {
            Ok(row) => row,
            Err(Error::InvalidAmount { .. }) => {
                ctx.say("❌ 残高は0円以上で教えてね").await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        ctx.say(format!(
            "🔧 {}を {} にリセットしたよ (ID: {})",
            target,
            report::format_yen(amount),
            row.id
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
