//! Dialog state entity - One-shot follow-up question pending for a user.
//!
//! Some inventory phrases need a second message (`収納追加` asks for the new
//! storage's name, `〜をしまう` asks which storage). The pending question is
//! persisted here so it survives a restart; it is cleared after one reply.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dialog state database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dialog_states")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID the question was asked of, one row per user
    #[sea_orm(unique)]
    pub user_id: String,
    /// `"awaiting_storage_name"` or `"awaiting_item_storage"`
    pub state: String,
    /// Item waiting to be put away, set for `awaiting_item_storage`
    pub pending_item: Option<String>,
    /// When this row was last modified
    pub updated_at: DateTimeUtc,
}

/// Dialog states have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
