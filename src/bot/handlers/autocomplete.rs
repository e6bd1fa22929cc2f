//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions come straight from the loaded vocabulary, so they always
//! match what the expense grammars and category validation accept.

use crate::{bot::BotData, errors::Error};

/// Provides autocomplete suggestions for spending categories.
///
/// Filters the configured categories by the user's partial input
/// (case-insensitive) and returns up to Discord's limit of 25.
pub async fn autocomplete_category(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let partial = partial.to_lowercase();
    ctx.data()
        .config
        .vocabulary
        .categories
        .iter()
        .filter(|name| name.to_lowercase().contains(&partial))
        .take(25) // Discord autocomplete limit
        .cloned()
        .collect()
}
