use async_trait::async_trait;
use futures::Stream;
use lookout_common::Message;
use lookout_http::HttpError;
use std::pin::Pin;

/// Lazy sequence of reply fragments, in arrival order.
///
/// The stream ends when the provider signals completion; an `Err` item means
/// the reply was cut short.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Malformed chunk: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<HttpError> for LlmError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Api {
                status, message, ..
            } => LlmError::Api {
                status: status.as_u16(),
                message,
            },
            HttpError::Url(m) | HttpError::Build(m) => LlmError::Config(m),
            HttpError::Decode(m, _) => LlmError::Decode(m),
            HttpError::Network(m) => LlmError::Network(m),
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the ordered conversation and start streaming the reply.
    ///
    /// Errors returned here happen before any fragment was produced.
    async fn stream_chat(
        &self,
        messages: &[Message],
        temperature: Option<f32>,
    ) -> Result<TokenStream, LlmError>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
