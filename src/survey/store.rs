//! In-memory result store keyed by (provider, prompt variant)

use std::collections::HashMap;
use tracing::warn;

use super::{Outcome, ResultKey};
use crate::error::{Result, SurveyError};

/// Sample batches in the order they were recorded
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: Vec<(ResultKey, Vec<Outcome>)>,
    index: HashMap<ResultKey, usize>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch; a repeated key replaces the earlier batch in place
    pub fn record(&mut self, key: ResultKey, outcomes: Vec<Outcome>) {
        if let Some(&slot) = self.index.get(&key) {
            warn!(key = %key, "Replacing previously recorded samples");
            self.entries[slot].1 = outcomes;
            return;
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, outcomes));
    }

    pub fn get(&self, key: &ResultKey) -> Result<&[Outcome]> {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1.as_slice())
            .ok_or_else(|| SurveyError::NotFound(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResultKey, &[Outcome])> {
        self.entries
            .iter()
            .map(|(key, outcomes)| (key, outcomes.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResultKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
