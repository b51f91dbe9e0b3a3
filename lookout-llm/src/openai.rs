use crate::sse::{self, SseEvent};
use crate::traits::{ChatClient, LlmError, TokenStream};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lookout_common::Message;
use lookout_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public OpenAI endpoint; overridable for gateways and tests.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
const DONE_SENTINEL: &str = "[DONE]";

/// OpenAI chat-completions client that always requests a streamed reply.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// One `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

impl OpenAiClient {
    /// Create a new client for the given API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        Self::with_base_url(OPENAI_API_BASE, api_key, model)
    }

    /// Point the client at an OpenAI-compatible endpoint (gateway, proxy, test server).
    pub fn with_base_url(base_url: &str, api_key: String, model: String) -> Result<Self, LlmError> {
        // Url::join drops the last path segment unless it ends with '/'.
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let client = HttpClient::new(&base)
            .map_err(|e| LlmError::Config(format!("HttpClient init failed: {e}")))?;

        if api_key.trim().is_empty() {
            tracing::warn!("OpenAI API key is empty; completion requests will be rejected");
        }

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    /// Bound the whole request, streaming included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn stream_chat(
        &self,
        messages: &[Message],
        temperature: Option<f32>,
    ) -> Result<TokenStream, LlmError> {
        tracing::debug!(
            model = %self.model,
            message_count = messages.len(),
            ?temperature,
            "openai.chat.stream.start"
        );

        let req = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream: true,
            temperature,
        };

        let resp = self
            .client
            .post_stream(
                "chat/completions",
                &req,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await?;

        Ok(Box::pin(content_fragments(sse::response_events(resp))))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Map SSE events of a chat-completions stream to the text fragments they carry.
///
/// Empty deltas (role announcements, finish markers) are skipped. The
/// `[DONE]` sentinel ends the stream early; a provider error payload or an
/// undecodable chunk ends it with an error.
pub fn content_fragments<S>(events: S) -> impl Stream<Item = Result<String, LlmError>> + Send
where
    S: Stream<Item = Result<SseEvent, LlmError>> + Send + 'static,
{
    try_stream! {
        let mut events = Box::pin(events);
        while let Some(event) = events.next().await {
            let event = event?;
            let data = event.data.trim();
            if data == DONE_SENTINEL {
                break;
            }

            let chunk: ChatCompletionChunk = serde_json::from_str(data)
                .map_err(|e| LlmError::Decode(format!("{e}: {data}")))?;

            if let Some(err) = chunk.error {
                Err::<(), _>(LlmError::Stream(err.message))?;
            }

            for choice in chunk.choices {
                if let Some(reason) = choice.finish_reason.as_deref() {
                    tracing::debug!(finish_reason = reason, "openai.chat.stream.finish");
                }
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    yield text;
                }
            }
        }
    }
}
