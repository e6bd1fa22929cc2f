//! Wallet definitions - The four fixed wallets and the salary split.
//!
//! Wallets are a closed set: the household runs on ぽて財布 (daily spending),
//! ぬし財布 (the partner's spending money), 探検隊予算 (outings), and 貯金
//! (savings). Balances are stored under stable ASCII slugs so renaming a
//! wallet's display label never touches stored rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four household wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wallet {
    /// ぽて財布 - everyday spending
    Pote,
    /// ぬし財布 - partner's spending money
    Nushi,
    /// 探検隊予算 - outings and adventures
    Expedition,
    /// 貯金 - savings
    Savings,
}

impl Wallet {
    /// All wallets, in the order the balance check walks through them.
    pub const SEQUENCE: [Wallet; 4] = [
        Wallet::Pote,
        Wallet::Nushi,
        Wallet::Expedition,
        Wallet::Savings,
    ];

    /// Stable identifier used in database rows.
    pub const fn slug(self) -> &'static str {
        match self {
            Wallet::Pote => "pote",
            Wallet::Nushi => "nushi",
            Wallet::Expedition => "expedition",
            Wallet::Savings => "savings",
        }
    }

    /// Display label shown to users.
    pub const fn label(self) -> &'static str {
        match self {
            Wallet::Pote => "ぽて財布",
            Wallet::Nushi => "ぬし財布",
            Wallet::Expedition => "探検隊予算",
            Wallet::Savings => "貯金",
        }
    }

    /// Looks a wallet up by its database slug.
    pub fn from_slug(slug: &str) -> Option<Wallet> {
        Wallet::SEQUENCE.into_iter().find(|w| w.slug() == slug)
    }

    /// Looks a wallet up by its display label.
    pub fn from_label(label: &str) -> Option<Wallet> {
        Wallet::SEQUENCE.into_iter().find(|w| w.label() == label)
    }

    /// The wallet asked about after this one during a balance check,
    /// `None` when this is the last.
    pub fn next_in_sequence(self) -> Option<Wallet> {
        let position = Wallet::SEQUENCE.iter().position(|w| *w == self)?;
        Wallet::SEQUENCE.get(position + 1).copied()
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Splits a salary payment across the wallets: 50% to ぬし財布, 30% to 貯金,
/// 20% to 探検隊予算. Shares are truncated to whole yen and the integer
/// remainder goes to 貯金, so the three credits always sum to `amount`.
/// ぽて財布 receives nothing and is topped up by transfers.
pub fn split_salary(amount: i64) -> [(Wallet, i64); 3] {
    let nushi = amount * 50 / 100;
    let savings = amount * 30 / 100;
    let expedition = amount * 20 / 100;
    let remainder = amount - nushi - savings - expedition;
    [
        (Wallet::Nushi, nushi),
        (Wallet::Savings, savings + remainder),
        (Wallet::Expedition, expedition),
    ]
}
