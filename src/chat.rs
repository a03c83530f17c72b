//! Chat assistant: sends questions with a portfolio snapshot and keeps a
//! per-profile transcript.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::{anyhow, Result};

use crate::api::{AskRequest, ChatContext, NavigatorApi};
use crate::logging::{log_chat, log_transcript_failure};
use crate::metrics::DEFAULT_ETH_PRICE;
use crate::store::DemoState;
use crate::transcript::{TranscriptEntry, TranscriptStore};

/// Transcript key for sessions without a selected persona.
const ANONYMOUS: &str = "anonymous";

pub struct ChatAssistant<'a, A: NavigatorApi + ?Sized> {
    api: &'a A,
    transcript: Option<TranscriptStore>,
    history_limit: usize,
    eth_price: f64,
}

impl<'a, A: NavigatorApi + ?Sized> ChatAssistant<'a, A> {
    /// A non-positive or non-finite `eth_price` falls back to the default.
    pub fn new(api: &'a A, eth_price: f64) -> Self {
        let mut assistant = Self {
            api,
            transcript: None,
            history_limit: 20,
            eth_price: DEFAULT_ETH_PRICE,
        };
        assistant.set_eth_price(eth_price);
        assistant
    }

    pub fn with_transcript(mut self, transcript: TranscriptStore, history_limit: usize) -> Self {
        self.transcript = Some(transcript);
        self.history_limit = history_limit;
        self
    }

    pub fn set_eth_price(&mut self, eth_price: f64) {
        if eth_price > 0.0 && eth_price.is_finite() {
            self.eth_price = eth_price;
        }
    }

    fn key(state: &DemoState) -> &'static str {
        state.current_user.unwrap_or(ANONYMOUS)
    }

    /// Fingerprint of everything the answer depends on besides the question.
    fn context_hash(&self, state: &DemoState) -> u64 {
        let mut h = DefaultHasher::new();
        state.hash().hash(&mut h);
        ((self.eth_price * 1e8) as i64).hash(&mut h);
        h.finish()
    }

    /// Ask a question about the current state. The answer is recorded in the
    /// transcript when one is attached; a transcript failure does not lose
    /// the answer.
    pub async fn ask(&mut self, state: &DemoState, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(anyhow!("question is empty"));
        }

        let req = AskRequest {
            q: question.to_string(),
            context: Some(ChatContext::from_state(state, self.eth_price)),
        };
        let answer = self.api.ask(&req).await?.answer;
        let key = Self::key(state);
        log_chat(key, question.chars().count(), answer.chars().count(), false);

        let context = self.context_hash(state);
        if let Some(t) = self.transcript.as_mut() {
            let ts = chrono::Utc::now().timestamp();
            if let Err(e) = t.append_exchange(key, question, &answer, context, ts) {
                log_transcript_failure(key, &e.to_string());
            }
        }
        Ok(answer)
    }

    /// Like [`ask`](Self::ask), but answers from the transcript when the same
    /// profile already asked exactly this question about the same portfolio
    /// and ETH price.
    pub async fn ask_cached(&mut self, state: &DemoState, question: &str) -> Result<String> {
        let key = Self::key(state);
        let context = self.context_hash(state);
        let hit = match self.transcript.as_ref() {
            Some(t) => t.cached_answer(key, question.trim(), context)?,
            None => None,
        };
        match hit {
            Some(answer) => {
                log_chat(key, question.trim().chars().count(), answer.chars().count(), true);
                Ok(answer)
            }
            None => self.ask(state, question).await,
        }
    }

    pub fn history(&self, state: &DemoState) -> Result<Vec<TranscriptEntry>> {
        match self.transcript.as_ref() {
            Some(t) => t.recent(Self::key(state), self.history_limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn clear_history(&mut self, state: &DemoState) -> Result<usize> {
        match self.transcript.as_mut() {
            Some(t) => t.clear(Self::key(state)),
            None => Ok(0),
        }
    }
}
