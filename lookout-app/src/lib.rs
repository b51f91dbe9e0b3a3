//! Conversation orchestration for the `lookout` binary.
//!
//! [`session::Session`] runs a single search-augmented turn against injected
//! providers; [`repl::run`] drives it from any line-oriented input.

pub mod repl;
pub mod session;
