//! Activity entity - Time-stamped activity log entries (わず/なう/うぃる).
//!
//! `message_id` is unique so re-scanning a channel never records the same
//! Discord message twice. `activity_time` is the time the activity happened,
//! which can differ from when the message was sent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID who reported the activity
    pub user_id: String,
    /// Channel the message was posted in
    pub channel_id: String,
    /// Guild the message was posted in, `None` for DMs
    pub guild_id: Option<String>,
    /// Activity text with the keyword stripped
    pub content: String,
    /// When the activity happened, stored in UTC
    pub activity_time: DateTimeUtc,
    /// `"done"`, `"doing"`, or `"todo"`
    pub status: String,
    /// Source Discord message ID, used for de-duplication
    #[sea_orm(unique)]
    pub message_id: String,
}

/// Activities have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
