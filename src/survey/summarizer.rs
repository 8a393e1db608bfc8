//! Essence summarization - one backend call per sample batch

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Essence, Outcome, ResultKey, ResultStore};
use crate::llm::{CompletionRequest, Responder, SamplingParams};

/// Essences in result-store order
#[derive(Debug, Default)]
pub struct Essences {
    entries: Vec<(ResultKey, Essence)>,
    index: HashMap<ResultKey, usize>,
}

impl Essences {
    fn push(&mut self, key: ResultKey, essence: Essence) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, essence));
    }

    pub fn get(&self, key: &ResultKey) -> Option<&Essence> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResultKey, &Essence)> {
        self.entries.iter().map(|(key, essence)| (key, essence))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Asks a backend provider for the central tendency of each batch
pub struct Summarizer {
    backend: Arc<dyn Responder>,
    message: String,
    max_words: u32,
    params: SamplingParams,
}

impl Summarizer {
    pub fn new(
        backend: Arc<dyn Responder>,
        message: impl Into<String>,
        max_words: u32,
        params: SamplingParams,
    ) -> Self {
        Self {
            backend,
            message: message.into(),
            max_words,
            params,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Summarize every batch in the store. Never fails: problems become
    /// sentinel essences for the affected key only.
    pub async fn summarize(&self, store: &ResultStore) -> Essences {
        let mut essences = Essences::default();

        for (key, outcomes) in store.iter() {
            let essence = self.summarize_batch(key, outcomes).await;
            essences.push(key.clone(), essence);
        }

        essences
    }

    pub async fn summarize_batch(&self, key: &ResultKey, outcomes: &[Outcome]) -> Essence {
        let replies: Vec<&str> = outcomes.iter().filter_map(Outcome::text).collect();

        if replies.is_empty() {
            info!(combination = %key, "No valid responses to summarize");
            return Essence::NoValidResponses;
        }

        let prompt = self.build_prompt(key, &replies);
        let request = CompletionRequest {
            system: None,
            message: &prompt,
            params: self.params,
        };

        info!(combination = %key, backend = self.backend.name(), "Analyzing");
        match self.backend.complete(&request).await {
            Ok(reply) => {
                let phrase = reply.trim();
                if phrase.is_empty() {
                    warn!(combination = %key, "Backend returned an empty summary");
                    Essence::Failed("empty summary".to_string())
                } else {
                    Essence::Phrase(phrase.to_string())
                }
            }
            Err(e) => {
                warn!(combination = %key, error = %e, "Analysis failed");
                Essence::Failed(e.to_string())
            }
        }
    }

    /// Prompt listing the valid replies of one batch
    pub fn build_prompt(&self, key: &ResultKey, replies: &[&str]) -> String {
        let bound = match self.max_words {
            1 => "1 word".to_string(),
            n => format!("{} words", n),
        };

        format!(
            "Here are {} responses from {} with {} system prompt:\n\n\
            {}\n\n\
            Looking at these responses, what {} represent the central tendency of these responses?\n\n\
            Your job is to accurately give at most {} which represent this central tendency. \
            Only return these words.\n\n\
            The question they answer is:\n{}",
            replies.len(),
            key.provider,
            key.variant,
            replies
                .iter()
                .map(|r| format!("- {}", r))
                .collect::<Vec<_>>()
                .join("\n"),
            bound,
            bound,
            self.message
        )
    }
}
