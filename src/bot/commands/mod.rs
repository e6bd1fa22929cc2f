//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Activity backfill command
pub mod activity;

/// General utility commands
pub mod general;

/// Manual balance check command
pub mod reconcile;

/// Expense and journal commands
pub mod transaction;

/// Wallet management commands
pub mod wallet;

// Export commands
pub use activity::*;
pub use general::*;
pub use reconcile::*;
pub use transaction::*;
pub use wallet::*;

use crate::core::{report::ReportPeriod, wallet::Wallet};

/// Wallet argument for slash commands, shown by its Japanese label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum WalletChoice {
    #[name = "ぽて財布"]
    Pote,
    #[name = "ぬし財布"]
    Nushi,
    #[name = "探検隊予算"]
    Expedition,
    #[name = "貯金"]
    Savings,
}

impl From<WalletChoice> for Wallet {
    fn from(choice: WalletChoice) -> Self {
        match choice {
            WalletChoice::Pote => Wallet::Pote,
            WalletChoice::Nushi => Wallet::Nushi,
            WalletChoice::Expedition => Wallet::Expedition,
            WalletChoice::Savings => Wallet::Savings,
        }
    }
}

/// Reporting window argument for the report command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum PeriodChoice {
    #[name = "今週"]
    Week,
    #[name = "今月"]
    Month,
}

impl From<PeriodChoice> for ReportPeriod {
    fn from(choice: PeriodChoice) -> Self {
        match choice {
            PeriodChoice::Week => ReportPeriod::Week,
            PeriodChoice::Month => ReportPeriod::Month,
        }
    }
}
