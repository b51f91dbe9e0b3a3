#![allow(dead_code)]

use async_trait::async_trait;
use lookout_app::session::{Session, SessionOptions};
use lookout_common::{LookoutError, Message, SearchResult};
use lookout_llm::traits::{ChatClient, LlmError, TokenStream};
use lookout_web::fetch::PageFetcher;
use lookout_web::serper::SearchProvider;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Search provider that replays one scripted answer per call.
#[derive(Default)]
pub struct FakeSearch {
    answers: Mutex<VecDeque<lookout_common::Result<Vec<SearchResult>>>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn with_answers(answers: Vec<lookout_common::Result<Vec<SearchResult>>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            queries: Mutex::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str) -> lookout_common::Result<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Serves fixed HTML per URL; unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_pages<const N: usize>(pages: [(&str, &str); N]) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(u, html)| (u.to_string(), html.to_string()))
                .collect(),
            fetched: Mutex::default(),
        }
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_html(&self, url: &str) -> lookout_common::Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| LookoutError::Fetch("connection refused".into()))
    }
}

pub enum Reply {
    Fragments(Vec<&'static str>),
    FailBefore(&'static str),
    FailAfter(Vec<&'static str>, &'static str),
}

/// Chat client that records every request and streams scripted replies.
#[derive(Default)]
pub struct FakeChat {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
    calls: AtomicUsize,
}

impl FakeChat {
    pub fn with_replies(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn request(&self, idx: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[idx].clone()
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn stream_chat(
        &self,
        messages: &[Message],
        _temperature: Option<f32>,
    ) -> Result<TokenStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(messages.to_vec());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Fragments(vec!["ok"]));

        let items: Vec<Result<String, LlmError>> = match reply {
            Reply::Fragments(parts) => parts.into_iter().map(|p| Ok(p.to_string())).collect(),
            Reply::FailBefore(msg) => {
                return Err(LlmError::Api {
                    status: 401,
                    message: msg.to_string(),
                });
            }
            Reply::FailAfter(parts, msg) => parts
                .into_iter()
                .map(|p| Ok(p.to_string()))
                .chain(std::iter::once(Err(LlmError::Stream(msg.to_string()))))
                .collect(),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

pub struct Harness {
    pub search: Arc<FakeSearch>,
    pub fetcher: Arc<FakeFetcher>,
    pub chat: Arc<FakeChat>,
}

impl Harness {
    pub fn new(search: FakeSearch, fetcher: FakeFetcher, chat: FakeChat) -> Self {
        Self {
            search: Arc::new(search),
            fetcher: Arc::new(fetcher),
            chat: Arc::new(chat),
        }
    }

    pub fn session(&self, options: SessionOptions) -> Session<Vec<u8>> {
        Session::new(
            self.search.clone(),
            self.fetcher.clone(),
            self.chat.clone(),
            options,
            Vec::new(),
        )
    }
}

pub fn printed(session: &Session<Vec<u8>>) -> String {
    String::from_utf8(session.output().clone()).expect("console output is UTF-8")
}
