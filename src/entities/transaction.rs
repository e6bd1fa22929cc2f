//! Transaction entity - Append-only journal of every ledger operation.
//!
//! Each row records a `kind` (salary/spend/transfer/reset/adjustment), the
//! amount in yen, the wallets involved, and whether the operation touched the
//! stored balance (`is_balance_reflected`). Spend rows carry a `category`;
//! transfer rows carry both `source_wallet` and `destination_wallet`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID who owns the transaction
    pub user_id: String,
    /// Kind of operation: `"salary"`, `"spend"`, `"transfer"`, `"reset"`, or `"adjustment"`
    pub kind: String,
    /// Spending category, set for spend rows only
    pub category: Option<String>,
    /// Amount in yen; for adjustments this is the signed total delta
    pub amount: i64,
    /// Wallet money left (spend/transfer) or was overwritten in (reset)
    pub source_wallet: Option<String>,
    /// Wallet money entered (transfer only)
    pub destination_wallet: Option<String>,
    /// Whether the stored balance was changed by this operation
    pub is_balance_reflected: bool,
    /// When the transaction happened (may be backdated for spends)
    pub created_at: DateTimeUtc,
}

/// Transactions have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
