//! Wallet balance entity - Current balance of one wallet for one user.
//!
//! Balances are stored in whole yen. Rows are created lazily the first time a
//! wallet is credited, debited, or reset; a missing row reads as zero.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet balance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_balances")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID the wallet belongs to
    pub user_id: String,
    /// Wallet slug (`"pote"`, `"nushi"`, `"expedition"`, `"savings"`)
    pub wallet: String,
    /// Current balance in yen, never negative
    pub balance: i64,
    /// When this balance was last modified
    pub updated_at: DateTimeUtc,
}

/// Wallet balances have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
