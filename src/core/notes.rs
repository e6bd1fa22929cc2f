//! Daily note export - Mirrors channel chatter into per-day Markdown files.
//!
//! When a notes directory is configured, every message the bot watches is
//! appended to `<dir>/YYYY-MM-DD.md` (local date) in a small fixed format,
//! ready to be picked up by a personal knowledge base. Export failures are
//! the bot's least important job, so callers log and move on.

use crate::errors::Result;
use chrono::NaiveDate;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// The note file for a given local date.
#[must_use]
pub fn daily_note_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.md", date.format("%Y-%m-%d")))
}

/// Renders one message as a note entry.
#[must_use]
pub fn format_entry(
    time_label: &str,
    author: &str,
    content: &str,
    jump_url: Option<&str>,
) -> String {
    let mut entry = format!("### {time_label} - {author}\n\n{content}\n\n");
    if let Some(url) = jump_url {
        entry.push_str(&format!("[Discordで見る]({url})\n\n"));
    }
    entry.push_str("---\n\n");
    entry
}

/// Appends an entry to the day's note, creating the directory and file as
/// needed.
pub fn append_entry(dir: &Path, date: NaiveDate, entry: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(daily_note_path(dir, date))?;
    file.write_all(entry.as_bytes())?;
    Ok(())
}
