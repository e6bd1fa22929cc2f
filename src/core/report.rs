//! Report generation business logic.
//!
//! Aggregates the transaction journal into weekly and monthly spending
//! summaries, and provides the yen formatters used everywhere amounts are
//! shown. All functions are framework-agnostic and return structured data
//! that the bot layer renders into embeds.

use crate::{
    core::{
        clock,
        ledger::{self, TxKind},
        wallet::Wallet,
    },
    entities::{Transaction, transaction},
    errors::Result,
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::prelude::*;
use std::{cmp::Ordering, collections::BTreeMap};

/// Reporting window, anchored to the local calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    /// Since local Monday 00:00
    Week,
    /// Since local first-of-month 00:00
    Month,
}

impl ReportPeriod {
    pub const fn label(self) -> &'static str {
        match self {
            ReportPeriod::Week => "今週",
            ReportPeriod::Month => "今月",
        }
    }
}

/// Spending summary for one user over one period.
#[derive(Debug, Clone)]
pub struct SpendingReport {
    pub period: ReportPeriod,
    /// Start of the window, in UTC.
    pub since: DateTime<Utc>,
    /// Sum of all spends in the window, including bookkeeping-only ones.
    pub total_spent: i64,
    /// Sum of only the spends that debited a wallet.
    pub reflected_spent: i64,
    /// Per-category totals, largest first.
    pub by_category: Vec<(String, i64)>,
    /// Current balances of all four wallets.
    pub balances: Vec<(Wallet, i64)>,
}

/// Builds a spending report from the journal. The window runs from the start
/// of the local week or month (per `period`) up to now; `now_local` supplies
/// both the calendar anchor and the timezone.
pub async fn spending_report(
    db: &DatabaseConnection,
    user_id: &str,
    period: ReportPeriod,
    now_local: DateTime<FixedOffset>,
) -> Result<SpendingReport> {
    let since = match period {
        ReportPeriod::Week => clock::week_start(now_local),
        ReportPeriod::Month => clock::month_start(now_local),
    };

    let rows = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::Kind.eq(TxKind::Spend.as_str()))
        .filter(transaction::Column::CreatedAt.gte(since))
        .all(db)
        .await?;

    let mut total_spent = 0;
    let mut reflected_spent = 0;
    let mut per_category: BTreeMap<String, i64> = BTreeMap::new();
    for row in &rows {
        total_spent += row.amount;
        if row.is_balance_reflected {
            reflected_spent += row.amount;
        }
        let category = row.category.clone().unwrap_or_else(|| "その他".to_string());
        *per_category.entry(category).or_insert(0) += row.amount;
    }

    let mut by_category: Vec<(String, i64)> = per_category.into_iter().collect();
    by_category.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let balances = ledger::balances(db, user_id).await?;

    Ok(SpendingReport {
        period,
        since,
        total_spent,
        reflected_spent,
        by_category,
        balances,
    })
}

/// Formats an amount as yen with comma grouping: `1234` -> `"1,234円"`.
#[must_use]
pub fn format_yen(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-{grouped}円")
    } else {
        format!("{grouped}円")
    }
}

/// Formats a signed delta: `"+500円"`, `"-500円"`, or `"±0円"`.
#[must_use]
pub fn format_signed_yen(amount: i64) -> String {
    match amount.cmp(&0) {
        Ordering::Greater => format!("+{}", format_yen(amount)),
        Ordering::Equal => "±0円".to_string(),
        Ordering::Less => format_yen(amount),
    }
}

/// One-line summary of a journal row, used by the history command.
#[must_use]
pub fn format_transaction_line(tx: &transaction::Model, offset: FixedOffset) -> String {
    let date = tx.created_at.with_timezone(&offset).format("%m/%d");
    let body = match TxKind::parse(&tx.kind) {
        Some(TxKind::Salary) => format!("💰 お給料 {}", format_yen(tx.amount)),
        Some(TxKind::Spend) => {
            let category = tx.category.as_deref().unwrap_or("？");
            let wallet = wallet_label(tx.source_wallet.as_deref());
            let note = if tx.is_balance_reflected {
                ""
            } else {
                " ※帳簿のみ"
            };
            format!("💸 {category} {}（{wallet}）{note}", format_yen(tx.amount))
        }
        Some(TxKind::Transfer) => format!(
            "🔁 {}→{} {}",
            wallet_label(tx.source_wallet.as_deref()),
            wallet_label(tx.destination_wallet.as_deref()),
            format_yen(tx.amount)
        ),
        Some(TxKind::Reset) => format!(
            "🔧 {}を{}にリセット",
            wallet_label(tx.source_wallet.as_deref()),
            format_yen(tx.amount)
        ),
        Some(TxKind::Adjustment) => format!("🧮 残高調整 {}", format_signed_yen(tx.amount)),
        None => format!("{} {}", tx.kind, format_yen(tx.amount)),
    };
    format!("`#{}` {date} {body}", tx.id)
}

fn wallet_label(slug: Option<&str>) -> &'static str {
    slug.and_then(Wallet::from_slug)
        .map_or("？", Wallet::label)
}
