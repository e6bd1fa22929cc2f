/// Database connection and schema creation
pub mod database;

/// Application settings from environment variables
pub mod settings;

/// Vocabulary configuration loading from config.toml
pub mod vocabulary;

pub use settings::{AppConfig, load_app_configuration};
pub use vocabulary::{ReactionRule, Vocabulary};
