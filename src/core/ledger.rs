//! Ledger business logic - Balance mutations and the transaction journal.
//!
//! Every operation that moves money writes exactly one row to the
//! `transactions` journal and updates `wallet_balances` inside the same
//! database transaction, so a failure partway through (most commonly an
//! insufficient balance) leaves both tables untouched. Balances never go
//! negative: debits are checked before they are applied.

use crate::{
    core::wallet::{self, Wallet},
    entities::{Transaction, WalletBalance, transaction, wallet_balance},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};

/// Kind of journal entry, stored as a string in the `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    /// Salary payment split across wallets
    Salary,
    /// Categorized expense from one wallet
    Spend,
    /// Money moved between two wallets
    Transfer,
    /// Balance overwritten to an exact value
    Reset,
    /// Reconciliation correction after a balance check
    Adjustment,
}

impl TxKind {
    /// Stable string stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            TxKind::Salary => "salary",
            TxKind::Spend => "spend",
            TxKind::Transfer => "transfer",
            TxKind::Reset => "reset",
            TxKind::Adjustment => "adjustment",
        }
    }

    /// Parses the stored string back into a kind.
    pub fn parse(value: &str) -> Option<TxKind> {
        match value {
            "salary" => Some(TxKind::Salary),
            "spend" => Some(TxKind::Spend),
            "transfer" => Some(TxKind::Transfer),
            "reset" => Some(TxKind::Reset),
            "adjustment" => Some(TxKind::Adjustment),
            _ => None,
        }
    }
}

/// One wallet's share of a salary payment, with the balance after crediting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryCredit {
    pub wallet: Wallet,
    pub amount: i64,
    pub new_balance: i64,
}

/// Result of recording a spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendOutcome {
    pub row: transaction::Model,
    /// Balance left in the wallet, `None` when the spend was bookkeeping-only.
    pub remaining: Option<i64>,
}

/// Result of a transfer, with both wallets' balances after the move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub row: transaction::Model,
    pub source_balance: i64,
    pub destination_balance: i64,
}

/// Fields of a spend row that `edit_spend` may change. `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct SpendEdit {
    pub amount: Option<i64>,
    pub category: Option<String>,
    pub wallet: Option<Wallet>,
    pub reflect_balance: Option<bool>,
    pub at: Option<DateTime<Utc>>,
}

/// Reads one wallet's balance; a missing row reads as zero.
pub async fn balance_of<C>(db: &C, user_id: &str, wallet: Wallet) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(WalletBalance::find()
        .filter(wallet_balance::Column::UserId.eq(user_id))
        .filter(wallet_balance::Column::Wallet.eq(wallet.slug()))
        .one(db)
        .await?
        .map_or(0, |row| row.balance))
}

/// Reads all four balances for a user, in check-sequence order.
pub async fn balances<C>(db: &C, user_id: &str) -> Result<Vec<(Wallet, i64)>>
where
    C: ConnectionTrait,
{
    let rows = WalletBalance::find()
        .filter(wallet_balance::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    Ok(Wallet::SEQUENCE
        .into_iter()
        .map(|wallet| {
            let balance = rows
                .iter()
                .find(|row| row.wallet == wallet.slug())
                .map_or(0, |row| row.balance);
            (wallet, balance)
        })
        .collect())
}

/// Adds a signed delta to a wallet's stored balance, creating the row on
/// first touch. Existing rows are updated atomically at the database level
/// (`balance = balance + delta`) rather than read-modify-write.
async fn add_to_balance<C>(db: &C, user_id: &str, wallet: Wallet, delta: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let existing = WalletBalance::find()
        .filter(wallet_balance::Column::UserId.eq(user_id))
        .filter(wallet_balance::Column::Wallet.eq(wallet.slug()))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            WalletBalance::update_many()
                .col_expr(
                    wallet_balance::Column::Balance,
                    Expr::col(wallet_balance::Column::Balance).add(delta),
                )
                .col_expr(wallet_balance::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(wallet_balance::Column::Id.eq(row.id))
                .exec(db)
                .await?;
            Ok(row.balance + delta)
        }
        None => {
            let row = wallet_balance::ActiveModel {
                user_id: Set(user_id.to_string()),
                wallet: Set(wallet.slug().to_string()),
                balance: Set(delta),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            let inserted = row.insert(db).await?;
            Ok(inserted.balance)
        }
    }
}

/// Adds money to a wallet. Rejects non-positive amounts.
pub(crate) async fn credit_wallet<C>(
    db: &C,
    user_id: &str,
    wallet: Wallet,
    amount: i64,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    add_to_balance(db, user_id, wallet, amount).await
}

/// Removes money from a wallet, failing without touching anything when the
/// balance is too low.
pub(crate) async fn debit_wallet<C>(
    db: &C,
    user_id: &str,
    wallet: Wallet,
    amount: i64,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let current = balance_of(db, user_id, wallet).await?;
    if current < amount {
        return Err(Error::InsufficientFunds {
            wallet: wallet.label().to_string(),
            current,
            requested: amount,
        });
    }
    add_to_balance(db, user_id, wallet, -amount).await
}

/// Overwrites a wallet's balance to an exact non-negative value.
pub(crate) async fn overwrite_balance<C>(
    db: &C,
    user_id: &str,
    wallet: Wallet,
    value: i64,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    if value < 0 {
        return Err(Error::InvalidAmount { amount: value });
    }
    let existing = WalletBalance::find()
        .filter(wallet_balance::Column::UserId.eq(user_id))
        .filter(wallet_balance::Column::Wallet.eq(wallet.slug()))
        .one(db)
        .await?;
    match existing {
        Some(row) => {
            let mut active: wallet_balance::ActiveModel = row.into();
            active.balance = Set(value);
            active.updated_at = Set(Utc::now());
            active.update(db).await?;
        }
        None => {
            let row = wallet_balance::ActiveModel {
                user_id: Set(user_id.to_string()),
                wallet: Set(wallet.slug().to_string()),
                balance: Set(value),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            row.insert(db).await?;
        }
    }
    Ok(value)
}

/// Records a salary payment: splits the amount 50/30/20 across ぬし財布,
/// 貯金, and 探検隊予算 (integer remainder to 貯金), credits each wallet, and
/// journals a single salary row for the full amount. All of it happens in one
/// database transaction.
pub async fn salary(
    db: &DatabaseConnection,
    user_id: &str,
    amount: i64,
) -> Result<(transaction::Model, Vec<SalaryCredit>)> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let mut credits = Vec::new();
    for (wallet, share) in wallet::split_salary(amount) {
        if share == 0 {
            continue;
        }
        let new_balance = credit_wallet(&txn, user_id, wallet, share).await?;
        credits.push(SalaryCredit {
            wallet,
            amount: share,
            new_balance,
        });
    }

    let row = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        kind: Set(TxKind::Salary.as_str().to_string()),
        category: Set(None),
        amount: Set(amount),
        source_wallet: Set(None),
        destination_wallet: Set(None),
        is_balance_reflected: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let row = row.insert(&txn).await?;

    txn.commit().await?;
    Ok((row, credits))
}

/// Records a categorized expense. When `reflect_balance` is true the wallet
/// is debited (and must cover the amount); when false the spend is journaled
/// only, for purchases paid outside the tracked wallets. `at` backdates the
/// journal row, defaulting to now.
pub async fn spend(
    db: &DatabaseConnection,
    user_id: &str,
    wallet: Wallet,
    category: &str,
    amount: i64,
    reflect_balance: bool,
    at: Option<DateTime<Utc>>,
) -> Result<SpendOutcome> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let remaining = if reflect_balance {
        Some(debit_wallet(&txn, user_id, wallet, amount).await?)
    } else {
        None
    };

    let row = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        kind: Set(TxKind::Spend.as_str().to_string()),
        category: Set(Some(category.to_string())),
        amount: Set(amount),
        source_wallet: Set(Some(wallet.slug().to_string())),
        destination_wallet: Set(None),
        is_balance_reflected: Set(reflect_balance),
        created_at: Set(at.unwrap_or_else(Utc::now)),
        ..Default::default()
    };
    let row = row.insert(&txn).await?;

    txn.commit().await?;
    Ok(SpendOutcome { row, remaining })
}

/// Moves money between two wallets. The debit and credit either both happen
/// or neither does.
pub async fn transfer(
    db: &DatabaseConnection,
    user_id: &str,
    source: Wallet,
    destination: Wallet,
    amount: i64,
) -> Result<TransferOutcome> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    if source == destination {
        return Err(Error::SameWallet {
            wallet: source.label().to_string(),
        });
    }

    let txn = db.begin().await?;

    let source_balance = debit_wallet(&txn, user_id, source, amount).await?;
    let destination_balance = credit_wallet(&txn, user_id, destination, amount).await?;

    let row = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        kind: Set(TxKind::Transfer.as_str().to_string()),
        category: Set(None),
        amount: Set(amount),
        source_wallet: Set(Some(source.slug().to_string())),
        destination_wallet: Set(Some(destination.slug().to_string())),
        is_balance_reflected: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let row = row.insert(&txn).await?;

    txn.commit().await?;
    Ok(TransferOutcome {
        row,
        source_balance,
        destination_balance,
    })
}

/// Overwrites one wallet to an exact value and journals the reset. Zero is
/// allowed; negative values are not.
pub async fn reset(
    db: &DatabaseConnection,
    user_id: &str,
    wallet: Wallet,
    value: i64,
) -> Result<transaction::Model> {
    if value < 0 {
        return Err(Error::InvalidAmount { amount: value });
    }

    let txn = db.begin().await?;

    overwrite_balance(&txn, user_id, wallet, value).await?;

    let row = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        kind: Set(TxKind::Reset.as_str().to_string()),
        category: Set(None),
        amount: Set(value),
        source_wallet: Set(Some(wallet.slug().to_string())),
        destination_wallet: Set(None),
        is_balance_reflected: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let row = row.insert(&txn).await?;

    txn.commit().await?;
    Ok(row)
}

/// Overwrites each listed wallet to its counted balance and journals one
/// adjustment row whose amount is the signed sum of all corrections.
///
/// Runs on the caller's connection so the reconciliation flow can bundle it
/// with its own state update in a single transaction.
pub async fn apply_reconciliation<C>(
    db: &C,
    user_id: &str,
    targets: &[(Wallet, i64)],
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let mut total_delta = 0;
    for (wallet, target) in targets {
        if *target < 0 {
            return Err(Error::InvalidAmount { amount: *target });
        }
        let current = balance_of(db, user_id, *wallet).await?;
        total_delta += target - current;
        overwrite_balance(db, user_id, *wallet, *target).await?;
    }

    let row = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        kind: Set(TxKind::Adjustment.as_str().to_string()),
        category: Set(None),
        amount: Set(total_delta),
        source_wallet: Set(None),
        destination_wallet: Set(None),
        is_balance_reflected: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Rewrites a spend row and fixes the balances up to match: the old debit is
/// reversed (when it was reflected), then the new values are applied as if
/// the spend had been recorded that way originally. An edit that would
/// overdraw the target wallet fails and leaves the row and all balances as
/// they were.
pub async fn edit_spend(
    db: &DatabaseConnection,
    user_id: &str,
    transaction_id: i64,
    edit: SpendEdit,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;

    let row = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .filter(|row| row.user_id == user_id)
        .ok_or_else(|| Error::NotFound {
            what: format!("Transaction #{transaction_id}"),
        })?;

    if TxKind::parse(&row.kind) != Some(TxKind::Spend) {
        return Err(Error::Validation {
            message: format!("Transaction #{transaction_id} is not a spend"),
        });
    }

    let old_wallet = row
        .source_wallet
        .as_deref()
        .and_then(Wallet::from_slug)
        .ok_or_else(|| Error::Validation {
            message: format!("Transaction #{transaction_id} has no source wallet"),
        })?;

    let new_amount = edit.amount.unwrap_or(row.amount);
    if new_amount <= 0 {
        return Err(Error::InvalidAmount { amount: new_amount });
    }
    let new_wallet = edit.wallet.unwrap_or(old_wallet);
    let new_reflect = edit.reflect_balance.unwrap_or(row.is_balance_reflected);

    // Undo the old debit, then apply the new one
    if row.is_balance_reflected {
        credit_wallet(&txn, user_id, old_wallet, row.amount).await?;
    }
    if new_reflect {
        debit_wallet(&txn, user_id, new_wallet, new_amount).await?;
    }

    let mut active: transaction::ActiveModel = row.into();
    active.amount = Set(new_amount);
    active.source_wallet = Set(Some(new_wallet.slug().to_string()));
    active.is_balance_reflected = Set(new_reflect);
    if let Some(category) = edit.category {
        active.category = Set(Some(category));
    }
    if let Some(at) = edit.at {
        active.created_at = Set(at);
    }
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Retrieves a user's most recent transactions, newest first.
pub async fn history(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_desc(transaction::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_tx_kind_round_trip() {
        for kind in [
            TxKind::Salary,
            TxKind::Spend,
            TxKind::Transfer,
            TxKind::Reset,
            TxKind::Adjustment,
        ] {
            assert_eq!(TxKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TxKind::parse("refund"), None);
    }

    #[tokio::test]
    async fn test_salary_rejects_non_positive() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = salary(&db, "user1", 0).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: 0 }
        ));

        let result = salary(&db, "user1", -100).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -100 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_salary_splits_across_wallets() -> Result<()> {
        let db = setup_test_db().await?;

        let (row, credits) = salary(&db, "user1", 1000).await?;

        assert_eq!(row.kind, "salary");
        assert_eq!(row.amount, 1000);
        assert!(row.is_balance_reflected);

        assert_eq!(credits.len(), 3);
        assert_eq!(credits[0].wallet, Wallet::Nushi);
        assert_eq!(credits[0].amount, 500);

        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 500);
        assert_eq!(balance_of(&db, "user1", Wallet::Savings).await?, 300);
        assert_eq!(balance_of(&db, "user1", Wallet::Expedition).await?, 200);
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_salary_remainder_lands_in_savings() -> Result<()> {
        let db = setup_test_db().await?;

        salary(&db, "user1", 999).await?;

        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 499);
        assert_eq!(balance_of(&db, "user1", Wallet::Savings).await?, 301);
        assert_eq!(balance_of(&db, "user1", Wallet::Expedition).await?, 199);

        Ok(())
    }

    #[tokio::test]
    async fn test_balances_reads_missing_rows_as_zero() -> Result<()> {
        let db = setup_test_db().await?;

        let all = balances(&db, "user1").await?;
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], (Wallet::Pote, 0));
        assert_eq!(all[3], (Wallet::Savings, 0));

        Ok(())
    }

    #[tokio::test]
    async fn test_spend_reflected_debits_wallet() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 1000).await?;

        let outcome = spend(&db, "user1", Wallet::Pote, "食費", 300, true, None).await?;

        assert_eq!(outcome.remaining, Some(700));
        assert_eq!(outcome.row.kind, "spend");
        assert_eq!(outcome.row.category.as_deref(), Some("食費"));
        assert_eq!(outcome.row.source_wallet.as_deref(), Some("pote"));
        assert!(outcome.row.is_balance_reflected);
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 700);

        Ok(())
    }

    #[tokio::test]
    async fn test_spend_insufficient_funds_leaves_no_trace() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 100).await?;

        let result = spend(&db, "user1", Wallet::Pote, "食費", 500, true, None).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds {
                current: 100,
                requested: 500,
                ..
            }
        ));
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 100);
        assert_eq!(Transaction::find().all(&db).await?.len(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_spend_unreflected_keeps_balance() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 1000).await?;

        let outcome = spend(&db, "user1", Wallet::Pote, "娯楽", 300, false, None).await?;

        assert_eq!(outcome.remaining, None);
        assert!(!outcome.row.is_balance_reflected);
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 1000);

        Ok(())
    }

    #[tokio::test]
    async fn test_spend_backdates_journal_row() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 1000).await?;

        let backdate = Utc.with_ymd_and_hms(2024, 4, 1, 3, 0, 0).unwrap();
        let outcome = spend(
            &db,
            "user1",
            Wallet::Pote,
            "日用品",
            200,
            true,
            Some(backdate),
        )
        .await?;

        assert_eq!(outcome.row.created_at, backdate);

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_moves_money() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Savings, 1000).await?;

        let outcome = transfer(&db, "user1", Wallet::Savings, Wallet::Pote, 400).await?;

        assert_eq!(outcome.source_balance, 600);
        assert_eq!(outcome.destination_balance, 400);
        assert_eq!(outcome.row.source_wallet.as_deref(), Some("savings"));
        assert_eq!(outcome.row.destination_wallet.as_deref(), Some("pote"));
        assert_eq!(balance_of(&db, "user1", Wallet::Savings).await?, 600);
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 400);

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_same_wallet_rejected() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = transfer(&db, "user1", Wallet::Pote, Wallet::Pote, 100).await;
        assert!(matches!(result.unwrap_err(), Error::SameWallet { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 100).await?;

        let result = transfer(&db, "user1", Wallet::Pote, Wallet::Nushi, 200).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds { .. }
        ));
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 100);
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 0);
        assert_eq!(Transaction::find().all(&db).await?.len(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_reset_overwrites_balance() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 700).await?;

        let row = reset(&db, "user1", Wallet::Pote, 1000).await?;
        assert_eq!(row.kind, "reset");
        assert_eq!(row.amount, 1000);
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 1000);

        // Zero is a valid reset target
        reset(&db, "user1", Wallet::Pote, 0).await?;
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_reset_negative_rejected() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = reset(&db, "user1", Wallet::Pote, -1).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -1 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_reconciliation_overwrites_and_logs_delta() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 500).await?;
        seed_balance(&db, "user1", Wallet::Nushi, 300).await?;

        let targets = [
            (Wallet::Pote, 450),
            (Wallet::Nushi, 300),
            (Wallet::Expedition, 0),
            (Wallet::Savings, 100),
        ];
        let row = apply_reconciliation(&db, "user1", &targets).await?;

        // -50 on pote, +100 on savings
        assert_eq!(row.kind, "adjustment");
        assert_eq!(row.amount, 50);
        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 450);
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 300);
        assert_eq!(balance_of(&db, "user1", Wallet::Savings).await?, 100);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_spend_amount_change_adjusts_balance() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Nushi, 500).await?;
        let outcome = spend(&db, "user1", Wallet::Nushi, "食費", 300, true, None).await?;
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 200);

        let updated = edit_spend(
            &db,
            "user1",
            outcome.row.id,
            SpendEdit {
                amount: Some(400),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.amount, 400);
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 100);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_spend_unreflecting_credits_back() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Nushi, 500).await?;
        let outcome = spend(&db, "user1", Wallet::Nushi, "食費", 300, true, None).await?;

        let updated = edit_spend(
            &db,
            "user1",
            outcome.row.id,
            SpendEdit {
                reflect_balance: Some(false),
                ..Default::default()
            },
        )
        .await?;

        assert!(!updated.is_balance_reflected);
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 500);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_spend_moves_between_wallets() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 500).await?;
        seed_balance(&db, "user1", Wallet::Nushi, 500).await?;
        let outcome = spend(&db, "user1", Wallet::Pote, "交通費", 200, true, None).await?;

        edit_spend(
            &db,
            "user1",
            outcome.row.id,
            SpendEdit {
                wallet: Some(Wallet::Nushi),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(balance_of(&db, "user1", Wallet::Pote).await?, 500);
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 300);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_spend_insufficient_funds_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Nushi, 500).await?;
        let outcome = spend(&db, "user1", Wallet::Nushi, "食費", 100, true, None).await?;
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 400);

        let result = edit_spend(
            &db,
            "user1",
            outcome.row.id,
            SpendEdit {
                amount: Some(5000),
                ..Default::default()
            },
        )
        .await;

        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds { .. }
        ));
        // Reversal inside the failed edit must not leak
        assert_eq!(balance_of(&db, "user1", Wallet::Nushi).await?, 400);
        let row = Transaction::find_by_id(outcome.row.id)
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(row.amount, 100);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_spend_rejects_other_kinds() -> Result<()> {
        let db = setup_test_db().await?;
        let (row, _) = salary(&db, "user1", 1000).await?;

        let result = edit_spend(&db, "user1", row.id, SpendEdit::default()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_spend_other_users_row_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 500).await?;
        let outcome = spend(&db, "user1", Wallet::Pote, "食費", 100, true, None).await?;

        let result = edit_spend(&db, "intruder", outcome.row.id, SpendEdit::default()).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_history_orders_newest_first_and_limits() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 10_000).await?;

        spend(&db, "user1", Wallet::Pote, "食費", 100, true, None).await?;
        spend(&db, "user1", Wallet::Pote, "日用品", 200, true, None).await?;
        let last = spend(&db, "user1", Wallet::Pote, "娯楽", 300, true, None).await?;

        let recent = history(&db, "user1", 2).await?;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, last.row.id);

        // Other users see nothing
        let other = history(&db, "user2", 10).await?;
        assert!(other.is_empty());

        Ok(())
    }
}
