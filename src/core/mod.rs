//! Core business logic - Framework-agnostic rules the bot layer drives.
//!
//! Nothing in here knows about Discord. Message-shaped input comes in as
//! plain strings, money moves through the ledger, and structured results go
//! back out for the bot layer to phrase.

pub mod activity;
pub mod clock;
pub mod inventory;
pub mod ledger;
pub mod notes;
pub mod parser;
pub mod reconcile;
pub mod report;
pub mod wallet;
