//! Expense message parsing - Turns free-text like 「ぽて財布で食費に500円」
//! into a structured transaction.
//!
//! Five grammars are tried in a fixed order and the first match wins:
//!
//! 1. `<財布>で<カテゴリ>に<金額>円`
//! 2. `<カテゴリ>に<金額>円、<財布>から`
//! 3. `<カテゴリ>に<金額>円` (default wallet)
//! 4. `<金額>円を<カテゴリ>として<財布>から`
//! 5. `<金額>円を<カテゴリ>として` (default wallet)
//!
//! The wallet and category alternations are built from configuration at
//! startup, so a new category in `config.toml` is picked up without touching
//! this module. Full-width digits are normalized before matching.

use crate::{
    core::wallet::Wallet,
    errors::{Error, Result},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref AMOUNT_HINT: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"\d+円").unwrap()
    };
}

/// A successfully parsed expense message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub wallet: Wallet,
    pub category: String,
    pub amount: i64,
}

struct Grammar {
    regex: Regex,
}

/// Matches expense messages against the five grammars.
///
/// Built once at startup from the configured categories and the default
/// wallet, then shared for the life of the bot.
pub struct TransactionParser {
    grammars: Vec<Grammar>,
    default_wallet: Wallet,
}

impl TransactionParser {
    /// Compiles the five grammars for the given category vocabulary.
    pub fn new(categories: &[String], default_wallet: Wallet) -> Result<Self> {
        let wallets = Wallet::SEQUENCE
            .iter()
            .map(|w| regex::escape(w.label()))
            .collect::<Vec<_>>()
            .join("|");
        let cats = categories
            .iter()
            .map(|c| regex::escape(c))
            .collect::<Vec<_>>()
            .join("|");

        let patterns = [
            format!("^(?P<wallet>{wallets})で(?P<category>{cats})に(?P<amount>\\d+)円$"),
            format!("^(?P<category>{cats})に(?P<amount>\\d+)円、(?P<wallet>{wallets})から$"),
            format!("^(?P<category>{cats})に(?P<amount>\\d+)円$"),
            format!("^(?P<amount>\\d+)円を(?P<category>{cats})として(?P<wallet>{wallets})から$"),
            format!("^(?P<amount>\\d+)円を(?P<category>{cats})として$"),
        ];

        let mut grammars = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = Regex::new(&pattern).map_err(|e| Error::Config {
                message: format!("Bad expense grammar: {e}"),
            })?;
            grammars.push(Grammar { regex });
        }

        Ok(Self {
            grammars,
            default_wallet,
        })
    }

    /// Parses one message. Returns `None` when no grammar matches or a
    /// matched amount is zero; grammars after the first match are never
    /// consulted.
    pub fn parse(&self, text: &str) -> Option<ParsedTransaction> {
        let text = normalize_digits(text.trim());

        for grammar in &self.grammars {
            let Some(caps) = grammar.regex.captures(&text) else {
                continue;
            };

            let amount: i64 = caps.name("amount")?.as_str().parse().ok()?;
            if amount <= 0 {
                return None;
            }

            let wallet = match caps.name("wallet") {
                Some(m) => Wallet::from_label(m.as_str())?,
                None => self.default_wallet,
            };
            let category = caps.name("category")?.as_str().to_string();

            return Some(ParsedTransaction {
                wallet,
                category,
                amount,
            });
        }

        None
    }
}

/// Whether the text contains a yen amount at all. Used as a cheap gate so
/// ordinary chatter is never run through the grammars.
pub fn mentions_amount(text: &str) -> bool {
    AMOUNT_HINT.is_match(&normalize_digits(text))
}

/// Replaces full-width digits (０-９) with their ASCII equivalents.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => {
                // Offset between U+FF10 and U+0030 is constant
                char::from_u32(u32::from(c) - 0xFEE0).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn parser() -> TransactionParser {
        let categories = vec![
            "食費".to_string(),
            "日用品".to_string(),
            "交通費".to_string(),
            "娯楽".to_string(),
        ];
        TransactionParser::new(&categories, Wallet::Pote).unwrap()
    }

    #[test]
    fn test_grammar_wallet_de_category() {
        let parsed = parser().parse("ぽて財布で食費に500円").unwrap();
        assert_eq!(parsed.wallet, Wallet::Pote);
        assert_eq!(parsed.category, "食費");
        assert_eq!(parsed.amount, 500);
    }

    #[test]
    fn test_grammar_category_then_wallet_kara() {
        let parsed = parser().parse("食費に500円、ぬし財布から").unwrap();
        assert_eq!(parsed.wallet, Wallet::Nushi);
        assert_eq!(parsed.category, "食費");
        assert_eq!(parsed.amount, 500);
    }

    #[test]
    fn test_grammar_category_only_uses_default_wallet() {
        let parsed = parser().parse("交通費に120円").unwrap();
        assert_eq!(parsed.wallet, Wallet::Pote);
        assert_eq!(parsed.category, "交通費");
        assert_eq!(parsed.amount, 120);
    }

    #[test]
    fn test_grammar_amount_first_with_wallet() {
        let parsed = parser().parse("800円を娯楽として探検隊予算から").unwrap();
        assert_eq!(parsed.wallet, Wallet::Expedition);
        assert_eq!(parsed.category, "娯楽");
        assert_eq!(parsed.amount, 800);
    }

    #[test]
    fn test_grammar_amount_first_default_wallet() {
        let parsed = parser().parse("800円を日用品として").unwrap();
        assert_eq!(parsed.wallet, Wallet::Pote);
        assert_eq!(parsed.category, "日用品");
        assert_eq!(parsed.amount, 800);
    }

    #[test]
    fn test_unknown_category_fails() {
        assert_eq!(parser().parse("ぽて財布で家賃に500円"), None);
    }

    #[test]
    fn test_unrelated_chatter_fails() {
        assert_eq!(parser().parse("今日は楽しかった"), None);
        assert_eq!(parser().parse(""), None);
    }

    #[test]
    fn test_zero_amount_fails_without_fallthrough() {
        assert_eq!(parser().parse("食費に0円"), None);
    }

    #[test]
    fn test_full_width_digits_accepted() {
        let parsed = parser().parse("食費に５００円").unwrap();
        assert_eq!(parsed.amount, 500);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let parsed = parser().parse("  食費に500円  ").unwrap();
        assert_eq!(parsed.amount, 500);
    }

    #[test]
    fn test_trailing_text_rejected() {
        // Grammars are anchored; partial matches inside chatter don't count
        assert_eq!(parser().parse("昨日食費に500円使った"), None);
    }

    #[test]
    fn test_mentions_amount_gate() {
        assert!(mentions_amount("食費に500円"));
        assert!(mentions_amount("５００円かかった"));
        assert!(!mentions_amount("今日は楽しかった"));
        assert!(!mentions_amount("円安だね"));
    }

    #[test]
    fn test_normalize_digits() {
        assert_eq!(normalize_digits("１２３abc４５"), "123abc45");
        assert_eq!(normalize_digits("500"), "500");
    }
}
