//! One conversation: history, last-turn sources and the three providers.
//!
//! Every provider failure is absorbed here. The console gets a diagnostic
//! line, the log gets a `warn` event and the turn carries on with a safe
//! default. Only console write failures surface as errors.
use futures::StreamExt;
use lookout_common::{Message, Role, SearchResult};
use lookout_config::LookoutConfig;
use lookout_llm::traits::ChatClient;
use lookout_web::extract::{excerpt, visible_text};
use lookout_web::fetch::PageFetcher;
use lookout_web::serper::SearchProvider;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub const APOLOGY: &str = "Lo siento, hubo un error al generar la respuesta.";

/// Knobs that shape a turn, independent of which providers are wired in.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub max_results: usize,
    pub excerpt_chars: usize,
    /// 0 sends the whole history.
    pub history_window: usize,
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&LookoutConfig::default())
    }
}

impl From<&LookoutConfig> for SessionOptions {
    fn from(cfg: &LookoutConfig) -> Self {
        Self {
            max_results: cfg.search.max_results,
            excerpt_chars: cfg.session.excerpt_chars,
            history_window: cfg.session.history_window,
            temperature: cfg.llm.temperature,
            system_prompt: cfg.llm.system_prompt.clone(),
        }
    }
}

pub struct Session<W> {
    id: Uuid,
    history: Vec<Message>,
    sources: Vec<SearchResult>,
    search_provider: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    chat: Arc<dyn ChatClient>,
    options: SessionOptions,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(
        search_provider: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        chat: Arc<dyn ChatClient>,
        options: SessionOptions,
        out: W,
    ) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, model = chat.model_name(), "session.start");
        Self {
            id,
            history: Vec::new(),
            sources: Vec::new(),
            search_provider,
            fetcher,
            chat,
            options,
            out,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Sources of the most recent turn only.
    pub fn sources(&self) -> &[SearchResult] {
        &self.sources
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn append_user(&mut self, text: &str) {
        self.history.push(Message::user(text));
    }

    /// Ranked hits for `query`, or an empty list when the provider fails.
    pub async fn search(&mut self, query: &str) -> io::Result<Vec<SearchResult>> {
        match self.search_provider.search(query).await {
            Ok(mut results) => {
                results.truncate(self.options.max_results);
                Ok(results)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "session.search.error");
                writeln!(self.out, "Error en la búsqueda: {e}")?;
                Ok(Vec::new())
            }
        }
    }

    /// Visible text of the page at `url`, or `""` when it cannot be fetched.
    pub async fn fetch_text(&mut self, url: &str) -> io::Result<String> {
        match self.fetcher.fetch_html(url).await {
            Ok(html) => Ok(visible_text(&html)),
            Err(e) => {
                tracing::warn!(session_id = %self.id, %url, error = %e, "session.fetch.error");
                writeln!(self.out, "Error extrayendo texto de {url}: {e}")?;
                Ok(String::new())
            }
        }
    }

    /// Fetch every linked result in order and join their excerpts.
    ///
    /// Replaces the previous turn's sources. Results without a usable link
    /// are skipped entirely.
    pub async fn build_context(&mut self, results: &[SearchResult]) -> io::Result<String> {
        self.sources.clear();
        let mut context = String::new();
        for result in results {
            let Some(link) = result.usable_link() else {
                tracing::debug!(session_id = %self.id, title = %result.title, "session.context.skip_unlinked");
                continue;
            };
            self.sources.push(result.clone());
            let text = self.fetch_text(link).await?;
            context.push_str("\nFuente: ");
            context.push_str(&result.title);
            context.push('\n');
            context.push_str(excerpt(&text, self.options.excerpt_chars));
        }
        Ok(context)
    }

    /// Stream a reply to the console and return it.
    ///
    /// A failure before the first fragment yields [`APOLOGY`]; a failure
    /// after it yields the partial text the user already saw.
    pub async fn complete(&mut self, query: &str, context: &str) -> io::Result<String> {
        let messages = self.request_messages(query, context);
        let started = Instant::now();
        tracing::debug!(
            session_id = %self.id,
            messages = messages.len(),
            context_chars = context.chars().count(),
            "session.complete.start"
        );

        let mut stream = match self
            .chat
            .stream_chat(&messages, Some(self.options.temperature))
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "session.complete.error");
                writeln!(self.out, "Error generando respuesta: {e}")?;
                return Ok(APOLOGY.to_string());
            }
        };

        write!(self.out, "Chatbot: ")?;
        self.out.flush()?;

        let mut reply = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) if fragment.is_empty() => {}
                Ok(fragment) => {
                    write!(self.out, "{fragment}")?;
                    self.out.flush()?;
                    reply.push_str(&fragment);
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.id,
                        partial_chars = reply.chars().count(),
                        error = %e,
                        "session.complete.interrupted"
                    );
                    writeln!(self.out)?;
                    writeln!(self.out, "Error generando respuesta: {e}")?;
                    if reply.is_empty() {
                        return Ok(APOLOGY.to_string());
                    }
                    return Ok(reply);
                }
            }
        }

        writeln!(self.out, "\n")?;
        tracing::debug!(
            session_id = %self.id,
            reply_chars = reply.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "session.complete.success"
        );
        Ok(reply)
    }

    /// One full turn: record, search, read, answer, cite.
    pub async fn run_turn(&mut self, query: &str) -> io::Result<String> {
        let started = Instant::now();
        self.append_user(query);

        let results = self.search(query).await?;
        let context = self.build_context(&results).await?;
        let reply = self.complete(query, &context).await?;
        self.history.push(Message::assistant(reply.clone()));

        writeln!(self.out, "\nFuentes consultadas:")?;
        for source in &self.sources {
            writeln!(
                self.out,
                "- {}: {}",
                source.title,
                source.link.as_deref().unwrap_or_default()
            )?;
        }
        self.out.flush()?;

        tracing::info!(
            session_id = %self.id,
            result_count = results.len(),
            source_count = self.sources.len(),
            history_len = self.history.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "session.turn.complete"
        );
        Ok(reply)
    }

    fn request_messages(&self, query: &str, context: &str) -> Vec<Message> {
        let recent = windowed(&self.history, self.options.history_window);
        let mut messages = Vec::with_capacity(recent.len() + 2);
        if let Some(prompt) = &self.options.system_prompt {
            messages.push(Message::system(prompt.as_str()));
        }
        messages.extend_from_slice(recent);
        messages.push(Message::user(format!(
            "Pregunta: {query}\nContexto de búsqueda: {context}"
        )));
        messages
    }
}

/// The last `window` messages, moved forward so they open on a user turn.
fn windowed(history: &[Message], window: usize) -> &[Message] {
    if window == 0 || history.len() <= window {
        return history;
    }
    let tail = &history[history.len() - window..];
    match tail.iter().position(|m| m.role == Role::User) {
        Some(start) => &tail[start..],
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<Message> {
        (0..n)
            .flat_map(|i| [Message::user(format!("q{i}")), Message::assistant(format!("a{i}"))])
            .collect()
    }

    #[test]
    fn zero_window_keeps_everything() {
        let history = turns(30);
        assert_eq!(windowed(&history, 0).len(), 60);
    }

    #[test]
    fn short_history_is_untouched() {
        let history = turns(2);
        assert_eq!(windowed(&history, 40), &history[..]);
    }

    #[test]
    fn window_starts_on_a_user_message() {
        let mut history = turns(3);
        history.push(Message::user("q3"));
        // last 4 = a1, q2, a2, q3 -> drop the leading assistant reply
        let recent = windowed(&history, 4);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0], Message::user("q2"));
        assert_eq!(recent.last(), Some(&Message::user("q3")));
    }

    #[test]
    fn options_follow_config() {
        let mut cfg = LookoutConfig::default();
        cfg.llm.system_prompt = Some("Sé breve.".into());
        cfg.session.excerpt_chars = 120;
        let options = SessionOptions::from(&cfg);
        assert_eq!(options.excerpt_chars, 120);
        assert_eq!(options.max_results, 5);
        assert_eq!(options.system_prompt.as_deref(), Some("Sé breve."));
        assert_eq!(SessionOptions::default().history_window, 40);
    }
}
