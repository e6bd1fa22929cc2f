//! Discord event and interaction handlers
//!
//! This module provides the message pipeline behind the chat-driven features
//! and autocomplete for slash command parameters.

/// Autocomplete handlers for command parameters
pub mod autocomplete;

/// Ordered message pipeline for the chat-driven features
pub mod message;
