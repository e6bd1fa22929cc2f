//! Inventory business logic - Where household items live.
//!
//! Four trigger phrases drive everything:
//!
//! * `収納追加` - register a new storage (asks for its name)
//! * `<もの>をしまう` - put an item away (asks which storage)
//! * `<もの>はどこ` - find an item
//! * `<収納>になにがある` - list a storage's contents
//!
//! The two-step phrases persist their follow-up question in `dialog_states`;
//! the next message from that user answers it, and the pending question is
//! cleared after exactly one reply whether or not it succeeded.

use crate::{
    entities::{DialogState, Item, Storage, dialog_state, item, storage},
    errors::{Error, Result},
};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{QueryOrder, Set, prelude::*};

lazy_static! {
    static ref PUT_AWAY_RE: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(.+?)をしまう$").unwrap()
    };
    static ref WHERE_IS_RE: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(.+?)はどこ[？?]?$").unwrap()
    };
    static ref WHAT_IS_IN_RE: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(.+?)に(?:なに|何)がある[？?]?$").unwrap()
    };
}

/// An inventory phrase recognized in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// `収納追加`
    AddStorage,
    /// `<もの>をしまう`
    PutAway { item: String },
    /// `<もの>はどこ`
    WhereIs { item: String },
    /// `<収納>になにがある`
    WhatIsIn { storage: String },
}

/// Matches a message against the trigger phrases. Returns `None` for
/// everything that isn't inventory talk.
#[must_use]
pub fn match_trigger(text: &str) -> Option<Trigger> {
    let text = text.trim();
    if text == "収納追加" {
        return Some(Trigger::AddStorage);
    }
    if let Some(caps) = PUT_AWAY_RE.captures(text) {
        return Some(Trigger::PutAway {
            item: caps[1].to_string(),
        });
    }
    if let Some(caps) = WHERE_IS_RE.captures(text) {
        return Some(Trigger::WhereIs {
            item: caps[1].to_string(),
        });
    }
    if let Some(caps) = WHAT_IS_IN_RE.captures(text) {
        return Some(Trigger::WhatIsIn {
            storage: caps[1].to_string(),
        });
    }
    None
}

/// A follow-up question pending for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDialog {
    /// `収納追加` was seen; the next message names the new storage.
    AwaitingStorageName,
    /// `<item>をしまう` was seen; the next message names the storage.
    AwaitingItemStorage { item: String },
}

const STATE_STORAGE_NAME: &str = "awaiting_storage_name";
const STATE_ITEM_STORAGE: &str = "awaiting_item_storage";

/// Reads the pending question for a user, if any.
pub async fn pending_dialog(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<PendingDialog>> {
    let Some(row) = DialogState::find()
        .filter(dialog_state::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    match row.state.as_str() {
        STATE_STORAGE_NAME => Ok(Some(PendingDialog::AwaitingStorageName)),
        STATE_ITEM_STORAGE => {
            let item = row.pending_item.ok_or_else(|| Error::Config {
                message: format!("Dialog row for {user_id} has no pending item"),
            })?;
            Ok(Some(PendingDialog::AwaitingItemStorage { item }))
        }
        other => Err(Error::Config {
            message: format!("Unknown dialog state: {other}"),
        }),
    }
}

/// Stores a pending question for a user, replacing any previous one.
pub async fn set_dialog(
    db: &DatabaseConnection,
    user_id: &str,
    dialog: PendingDialog,
) -> Result<()> {
    let (state, pending_item) = match dialog {
        PendingDialog::AwaitingStorageName => (STATE_STORAGE_NAME, None),
        PendingDialog::AwaitingItemStorage { item } => (STATE_ITEM_STORAGE, Some(item)),
    };

    let existing = DialogState::find()
        .filter(dialog_state::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    match existing {
        Some(row) => {
            let mut active = dialog_state::ActiveModel::from(row);
            active.state = Set(state.to_string());
            active.pending_item = Set(pending_item);
            active.updated_at = Set(Utc::now());
            active.update(db).await?;
        }
        None => {
            let active = dialog_state::ActiveModel {
                user_id: Set(user_id.to_string()),
                state: Set(state.to_string()),
                pending_item: Set(pending_item),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            active.insert(db).await?;
        }
    }
    Ok(())
}

/// Removes a user's pending question, if any.
pub async fn clear_dialog(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    DialogState::delete_many()
        .filter(dialog_state::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Creates a storage. Names are unique per guild.
pub async fn create_storage(
    db: &DatabaseConnection,
    guild_id: &str,
    name: &str,
) -> Result<storage::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Storage name cannot be empty".to_string(),
        });
    }
    if find_storage(db, guild_id, name).await?.is_some() {
        return Err(Error::Validation {
            message: format!("Storage {name} already exists"),
        });
    }

    let active = storage::ActiveModel {
        guild_id: Set(guild_id.to_string()),
        name: Set(name.to_string()),
        ..Default::default()
    };
    active.insert(db).await.map_err(Into::into)
}

async fn find_storage(
    db: &DatabaseConnection,
    guild_id: &str,
    name: &str,
) -> Result<Option<storage::Model>> {
    Storage::find()
        .filter(storage::Column::GuildId.eq(guild_id))
        .filter(storage::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Puts an item into a named storage. The storage must already exist; the
/// same item name can't be stored twice in the same storage.
pub async fn add_item(
    db: &DatabaseConnection,
    guild_id: &str,
    storage_name: &str,
    item_name: &str,
) -> Result<item::Model> {
    let storage = find_storage(db, guild_id, storage_name.trim())
        .await?
        .ok_or_else(|| Error::NotFound {
            what: format!("Storage {storage_name}"),
        })?;

    let duplicate = Item::find()
        .filter(item::Column::StorageId.eq(storage.id))
        .filter(item::Column::Name.eq(item_name))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(Error::Validation {
            message: format!("{item_name} is already in {storage_name}"),
        });
    }

    let active = item::ActiveModel {
        storage_id: Set(storage.id),
        name: Set(item_name.to_string()),
        ..Default::default()
    };
    active.insert(db).await.map_err(Into::into)
}

/// Finds which storage holds an item, `None` when it isn't stored anywhere.
pub async fn locate_item(
    db: &DatabaseConnection,
    guild_id: &str,
    item_name: &str,
) -> Result<Option<(item::Model, storage::Model)>> {
    let storages = Storage::find()
        .filter(storage::Column::GuildId.eq(guild_id))
        .all(db)
        .await?;
    if storages.is_empty() {
        return Ok(None);
    }

    let storage_ids: Vec<i64> = storages.iter().map(|s| s.id).collect();
    let Some(found) = Item::find()
        .filter(item::Column::Name.eq(item_name))
        .filter(item::Column::StorageId.is_in(storage_ids))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let storage = storages
        .into_iter()
        .find(|s| s.id == found.storage_id)
        .ok_or_else(|| Error::NotFound {
            what: format!("Storage #{}", found.storage_id),
        })?;
    Ok(Some((found, storage)))
}

/// Lists a storage's items, sorted by name.
pub async fn list_items(
    db: &DatabaseConnection,
    guild_id: &str,
    storage_name: &str,
) -> Result<Vec<item::Model>> {
    let storage = find_storage(db, guild_id, storage_name.trim())
        .await?
        .ok_or_else(|| Error::NotFound {
            what: format!("Storage {storage_name}"),
        })?;

    Item::find()
        .filter(item::Column::StorageId.eq(storage.id))
        .order_by_asc(item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Outcome of answering a pending question, ready to phrase back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogReply {
    StorageCreated { name: String },
    StorageExists { name: String },
    ItemStored { item: String, storage: String },
    ItemExists { item: String, storage: String },
    StorageMissing { item: String, storage: String },
}

/// Feeds one message to a user's pending question, if they have one.
/// Returns `Ok(None)` when nothing was pending; otherwise the question is
/// cleared (one answer per question, success or not) and the outcome is
/// returned.
pub async fn advance_dialog(
    db: &DatabaseConnection,
    user_id: &str,
    guild_id: &str,
    text: &str,
) -> Result<Option<DialogReply>> {
    let Some(dialog) = pending_dialog(db, user_id).await? else {
        return Ok(None);
    };
    clear_dialog(db, user_id).await?;

    let answer = text.trim();
    let reply = match dialog {
        PendingDialog::AwaitingStorageName => match create_storage(db, guild_id, answer).await {
            Ok(created) => DialogReply::StorageCreated { name: created.name },
            Err(Error::Validation { .. }) => DialogReply::StorageExists {
                name: answer.to_string(),
            },
            Err(e) => return Err(e),
        },
        PendingDialog::AwaitingItemStorage { item } => {
            match add_item(db, guild_id, answer, &item).await {
                Ok(_) => DialogReply::ItemStored {
                    item,
                    storage: answer.to_string(),
                },
                Err(Error::NotFound { .. }) => DialogReply::StorageMissing {
                    item,
                    storage: answer.to_string(),
                },
                Err(Error::Validation { .. }) => DialogReply::ItemExists {
                    item,
                    storage: answer.to_string(),
                },
                Err(e) => return Err(e),
            }
        }
    };
    Ok(Some(reply))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    const GUILD: &str = "guild1";

    #[test]
    fn test_match_trigger_phrases() {
        assert_eq!(match_trigger("収納追加"), Some(Trigger::AddStorage));
        assert_eq!(
            match_trigger("ドライバーをしまう"),
            Some(Trigger::PutAway {
                item: "ドライバー".to_string()
            })
        );
        assert_eq!(
            match_trigger("爪切りはどこ？"),
            Some(Trigger::WhereIs {
                item: "爪切り".to_string()
            })
        );
        assert_eq!(
            match_trigger("工具箱になにがある"),
            Some(Trigger::WhatIsIn {
                storage: "工具箱".to_string()
            })
        );
        assert_eq!(
            match_trigger("押入れに何がある?"),
            Some(Trigger::WhatIsIn {
                storage: "押入れ".to_string()
            })
        );
        assert_eq!(match_trigger("こんにちは"), None);
        assert_eq!(match_trigger("をしまう"), None);
    }

    #[tokio::test]
    async fn test_create_storage_and_duplicates() -> Result<()> {
        let db = setup_test_db().await?;

        let storage = create_storage(&db, GUILD, "工具箱").await?;
        assert_eq!(storage.name, "工具箱");

        let duplicate = create_storage(&db, GUILD, "工具箱").await;
        assert!(matches!(duplicate.unwrap_err(), Error::Validation { .. }));

        // Same name in another guild is fine
        create_storage(&db, "guild2", "工具箱").await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_add_and_locate_item() -> Result<()> {
        let db = setup_test_db().await?;
        create_storage(&db, GUILD, "工具箱").await?;

        add_item(&db, GUILD, "工具箱", "ドライバー").await?;

        let found = locate_item(&db, GUILD, "ドライバー").await?;
        let (item, storage) = found.unwrap();
        assert_eq!(item.name, "ドライバー");
        assert_eq!(storage.name, "工具箱");

        assert!(locate_item(&db, GUILD, "ハンマー").await?.is_none());
        // Items don't leak across guilds
        assert!(locate_item(&db, "guild2", "ドライバー").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_requires_storage() -> Result<()> {
        let db = setup_test_db().await?;

        let result = add_item(&db, GUILD, "押入れ", "毛布").await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_rejects_duplicates() -> Result<()> {
        let db = setup_test_db().await?;
        create_storage(&db, GUILD, "工具箱").await?;
        add_item(&db, GUILD, "工具箱", "ドライバー").await?;

        let result = add_item(&db, GUILD, "工具箱", "ドライバー").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_items_sorted() -> Result<()> {
        let db = setup_test_db().await?;
        create_storage(&db, GUILD, "工具箱").await?;
        add_item(&db, GUILD, "工具箱", "ペンチ").await?;
        add_item(&db, GUILD, "工具箱", "ドライバー").await?;

        let items = list_items(&db, GUILD, "工具箱").await?;
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ドライバー", "ペンチ"]);

        let missing = list_items(&db, GUILD, "押入れ").await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_dialog_storage_name_flow() -> Result<()> {
        let db = setup_test_db().await?;

        // Nothing pending: message flows through
        assert!(advance_dialog(&db, "user1", GUILD, "工具箱").await?.is_none());

        set_dialog(&db, "user1", PendingDialog::AwaitingStorageName).await?;
        let reply = advance_dialog(&db, "user1", GUILD, "工具箱").await?;
        assert_eq!(
            reply,
            Some(DialogReply::StorageCreated {
                name: "工具箱".to_string()
            })
        );

        // One answer per question: the next message is not consumed
        assert!(advance_dialog(&db, "user1", GUILD, "押入れ").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_dialog_put_away_flow() -> Result<()> {
        let db = setup_test_db().await?;
        create_storage(&db, GUILD, "工具箱").await?;

        set_dialog(
            &db,
            "user1",
            PendingDialog::AwaitingItemStorage {
                item: "ドライバー".to_string(),
            },
        )
        .await?;
        let reply = advance_dialog(&db, "user1", GUILD, "工具箱").await?;
        assert_eq!(
            reply,
            Some(DialogReply::ItemStored {
                item: "ドライバー".to_string(),
                storage: "工具箱".to_string()
            })
        );
        assert!(locate_item(&db, GUILD, "ドライバー").await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_dialog_missing_storage_clears_anyway() -> Result<()> {
        let db = setup_test_db().await?;

        set_dialog(
            &db,
            "user1",
            PendingDialog::AwaitingItemStorage {
                item: "毛布".to_string(),
            },
        )
        .await?;
        let reply = advance_dialog(&db, "user1", GUILD, "押入れ").await?;
        assert_eq!(
            reply,
            Some(DialogReply::StorageMissing {
                item: "毛布".to_string(),
                storage: "押入れ".to_string()
            })
        );

        // The failed answer still consumed the question
        assert!(pending_dialog(&db, "user1").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_set_dialog_replaces_previous() -> Result<()> {
        let db = setup_test_db().await?;

        set_dialog(&db, "user1", PendingDialog::AwaitingStorageName).await?;
        set_dialog(
            &db,
            "user1",
            PendingDialog::AwaitingItemStorage {
                item: "毛布".to_string(),
            },
        )
        .await?;

        assert_eq!(
            pending_dialog(&db, "user1").await?,
            Some(PendingDialog::AwaitingItemStorage {
                item: "毛布".to_string()
            })
        );

        Ok(())
    }
}
