//! Database connection and schema creation.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the database schema always matches the
//! Rust struct definitions without manual SQL. Statements carry `IF NOT EXISTS`
//! so startup is idempotent against an existing database file.

use crate::entities::{
    Activity, DialogState, Item, ReconciliationState, Storage, Transaction, WalletBalance,
    WalletBalanceColumn,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

/// Connects to the database and ensures the schema exists.
///
/// # Errors
/// Returns an error if the connection fails or any schema statement is
/// rejected by the backend.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    create_tables(&db).await?;
    info!("Database ready at {database_url}");
    Ok(db)
}

/// Creates all tables and indexes from the entity definitions.
///
/// Single-column uniqueness comes from the entity annotations; the composite
/// one-balance-row-per-user-and-wallet rule needs an explicit index.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = [
        schema
            .create_table_from_entity(WalletBalance)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(Transaction)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(ReconciliationState)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(Activity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(Storage)
            .if_not_exists()
            .to_owned(),
        schema.create_table_from_entity(Item).if_not_exists().to_owned(),
        schema
            .create_table_from_entity(DialogState)
            .if_not_exists()
            .to_owned(),
    ];
    for statement in &statements {
        db.execute(builder.build(statement)).await?;
    }

    let balance_index = Index::create()
        .if_not_exists()
        .name("idx_wallet_balances_user_wallet")
        .table(WalletBalance)
        .col(WalletBalanceColumn::UserId)
        .col(WalletBalanceColumn::Wallet)
        .unique()
        .to_owned();
    db.execute(builder.build(&balance_index)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{
        activity::Model as ActivityModel, item::Model as ItemModel,
        storage::Model as StorageModel, transaction::Model as TransactionModel,
        wallet_balance, wallet_balance::Model as WalletBalanceModel,
    };
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Every table should be queryable once created
        let _: Vec<WalletBalanceModel> = WalletBalance::find().limit(1).all(&db).await?;
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<ActivityModel> = Activity::find().limit(1).all(&db).await?;
        let _: Vec<StorageModel> = Storage::find().limit(1).all(&db).await?;
        let _: Vec<ItemModel> = Item::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_one_balance_row_per_user_and_wallet() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        wallet_balance::ActiveModel {
            user_id: Set("user-1".to_string()),
            wallet: Set("pote".to_string()),
            balance: Set(1000),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let duplicate = wallet_balance::ActiveModel {
            user_id: Set("user-1".to_string()),
            wallet: Set("pote".to_string()),
            balance: Set(2000),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(duplicate.is_err());

        // A different wallet for the same user is still fine
        wallet_balance::ActiveModel {
            user_id: Set("user-1".to_string()),
            wallet: Set("nushi".to_string()),
            balance: Set(500),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        Ok(())
    }
}
