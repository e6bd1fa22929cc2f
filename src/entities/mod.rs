//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod activity;
pub mod dialog_state;
pub mod item;
pub mod reconciliation_state;
pub mod storage;
pub mod transaction;
pub mod wallet_balance;

// Re-export specific types to avoid conflicts
pub use activity::{Column as ActivityColumn, Entity as Activity, Model as ActivityModel};
pub use dialog_state::{
    Column as DialogStateColumn, Entity as DialogState, Model as DialogStateModel,
};
pub use item::{Column as ItemColumn, Entity as Item, Model as ItemModel};
pub use reconciliation_state::{
    Column as ReconciliationStateColumn, Entity as ReconciliationState,
    Model as ReconciliationStateModel,
};
pub use storage::{Column as StorageColumn, Entity as Storage, Model as StorageModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use wallet_balance::{
    Column as WalletBalanceColumn, Entity as WalletBalance, Model as WalletBalanceModel,
};
