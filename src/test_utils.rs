//! Shared test utilities for Sora.
//!
//! This module provides common helper functions for setting up test databases
//! and seeding the handful of rows most tests need.

use crate::{
    core::{
        activity::{ActivityStatus, NewActivity, ParsedActivity},
        ledger,
        wallet::Wallet,
    },
    entities::reconciliation_state,
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Sets a wallet balance directly, without writing a journal row.
///
/// Use this to establish a starting state; the operation under test should
/// be the only thing that touches the journal.
pub async fn seed_balance(
    db: &DatabaseConnection,
    user_id: &str,
    wallet: Wallet,
    amount: i64,
) -> Result<()> {
    ledger::overwrite_balance(db, user_id, wallet, amount).await?;
    Ok(())
}

/// Records a completed balance check for a user at the given instant.
///
/// The resulting row is idle (no in-flight check) with `last_checked_at`
/// stamped, the state a user is left in after finishing a weekly check.
pub async fn seed_checked_at(
    db: &DatabaseConnection,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    reconciliation_state::ActiveModel {
        user_id: Set(user_id.to_string()),
        state: Set(None),
        last_checked_at: Set(Some(at)),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Builds a ready-to-store activity with sensible defaults.
///
/// # Defaults
/// * `user_id`: `"test_user"`
/// * `channel_id`: `"1000"`
/// * `guild_id`: `Some("2000")`
/// * content: `"テスト"`, status doing, happening exactly at `at`
#[must_use]
pub fn sample_activity(message_id: &str, at: DateTime<Utc>) -> NewActivity {
    NewActivity {
        user_id: "test_user".to_string(),
        channel_id: "1000".to_string(),
        guild_id: Some("2000".to_string()),
        message_id: message_id.to_string(),
        parsed: ParsedActivity {
            content: "テスト".to_string(),
            status: ActivityStatus::Doing,
            activity_time: at,
        },
    }
}
