use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Insufficient funds in {wallet}: balance is {current}, requested {requested}")]
    InsufficientFunds {
        wallet: String,
        current: i64,
        requested: i64,
    },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    #[error("Transfer source and destination are both {wallet}")]
    SameWallet { wallet: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Error::FrameworkError(Box::new(value))
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
