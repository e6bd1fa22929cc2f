//! Vocabulary configuration loading from config.toml
//!
//! The vocabulary is the tunable half of the bot's language: the spending
//! categories the expense grammars accept, and the keyword-to-emoji rules
//! the reaction stage applies. A missing file falls back to built-in
//! defaults so a fresh deployment works with no config at all.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone)]
pub struct Vocabulary {
    /// Spending categories the expense grammars recognize
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// Keyword reaction rules, checked in order; first match wins
    #[serde(default = "default_reactions")]
    pub reactions: Vec<ReactionRule>,
}

/// One keyword-to-emoji reaction rule
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ReactionRule {
    /// Substring to look for in a message
    pub keyword: String,
    /// Unicode emoji to react with
    pub emoji: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            reactions: default_reactions(),
        }
    }
}

fn default_categories() -> Vec<String> {
    ["食費", "日用品", "交通費", "娯楽", "交際費", "その他"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_reactions() -> Vec<ReactionRule> {
    ["なう", "わず", "うぃる"]
        .into_iter()
        .map(|keyword| ReactionRule {
            keyword: keyword.to_string(),
            emoji: "✅".to_string(),
        })
        .collect()
}

/// Loads the vocabulary from a TOML file, falling back to the defaults when
/// the file doesn't exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read, the TOML syntax
/// is invalid, or the category list is present but empty.
pub fn load_vocabulary<P: AsRef<Path>>(path: P) -> Result<Vocabulary> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(
            "No vocabulary file at {}, using built-in defaults",
            path.display()
        );
        return Ok(Vocabulary::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read {}: {e}", path.display()),
    })?;
    let vocabulary: Vocabulary = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })?;

    if vocabulary.categories.is_empty() {
        return Err(Error::Config {
            message: "Vocabulary needs at least one category".to_string(),
        });
    }

    Ok(vocabulary)
}
