//! Reconciliation state entity - Per-user progress through the balance check.
//!
//! `state` is `None` when the user is idle, `"waiting_for_balance_<slug>"`
//! while the bot is collecting that wallet's counted balance, and
//! `"waiting_for_reconciliation"` once all four inputs are in and a
//! discrepancy needs an apply/restart decision. The four `input_*` slots hold
//! the counted balances collected so far.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reconciliation state database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliation_states")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID this row tracks, one row per user
    #[sea_orm(unique)]
    pub user_id: String,
    /// Current position in the check flow, `None` when idle
    pub state: Option<String>,
    /// Counted balance reported for ぽて財布
    pub input_pote: Option<i64>,
    /// Counted balance reported for ぬし財布
    pub input_nushi: Option<i64>,
    /// Counted balance reported for 探検隊予算
    pub input_expedition: Option<i64>,
    /// Counted balance reported for 貯金
    pub input_savings: Option<i64>,
    /// When the last check completed, used by the weekly gate
    pub last_checked_at: Option<DateTimeUtc>,
    /// When this row was last modified
    pub updated_at: DateTimeUtc,
}

/// Reconciliation states have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
