//! Streaming chat-completion integration for Lookout.
//!
//! This crate exposes the [`traits::ChatClient`] seam the session talks to,
//! a Server-Sent Events reader ([`sse`]) and the OpenAI chat-completions
//! client ([`openai::OpenAiClient`]) that turns an SSE response into a lazy
//! [`traits::TokenStream`] of text fragments.
//!
//! # Examples
//! ```no_run
//! use futures::StreamExt;
//! use lookout_common::Message;
//! use lookout_llm::openai::OpenAiClient;
//! use lookout_llm::traits::ChatClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), lookout_llm::traits::LlmError> {
//! let client = OpenAiClient::new("sk-...".into(), lookout_llm::DEFAULT_OPENAI_MODEL.into())?;
//! let mut tokens = client
//!     .stream_chat(&[Message::user("Hola")], Some(0.7))
//!     .await?;
//! while let Some(fragment) = tokens.next().await {
//!     print!("{}", fragment?);
//! }
//! # Ok(())
//! # }
//! ```
pub mod openai;
pub mod sse;
pub mod traits;

/// Model used when nothing else is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
/// Sampling temperature used when nothing else is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
