//! Common types and utilities shared across Lookout crates.
//!
//! This crate defines the chat data model, observability helpers, and the
//! shared error type used throughout the Lookout workspace. It is kept
//! dependency‑minimal so that every crate can depend on it.
//!
//! # Overview
//!
//! - [`Message`] and [`Role`]: one entry of the conversation history
//! - [`SearchResult`]: one organic hit returned by the search provider
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`LookoutError`] and [`Result`]: errors of the search and fetch providers
//!
//! # Examples
//!
//! ```rust
//! use lookout_common::{Message, Role};
//!
//! let msg = Message::user("¿Qué hora es en Lima?");
//! assert_eq!(msg.role, Role::User);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Author of a chat message.
///
/// Serialised in lowercase to match the chat-completions wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Optional instructions prepended to a request; never stored in history.
    System,
    User,
    Assistant,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A single organic result from the search provider.
///
/// Only `title` and `link` are consumed; everything else the provider sends
/// is ignored during deserialisation. A result without a link is kept (the
/// provider ordering is preserved) but never becomes a source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: Some(link.into()),
        }
    }

    /// The link, if present and not blank.
    pub fn usable_link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// Failures of the web-facing providers.
///
/// Both are absorbed by the session; the message ends up on the console.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookoutError {
    /// The search provider failed or returned an unreadable payload.
    #[error("search failed: {0}")]
    Search(String),

    /// A result page could not be downloaded.
    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Convenient alias for results that use [`LookoutError`].
pub type Result<T> = std::result::Result<T, LookoutError>;
