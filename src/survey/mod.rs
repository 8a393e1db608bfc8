//! Survey data model: prompt variants, sample outcomes, result keys and essences
//!
//! A survey asks every provider the same message under every prompt variant,
//! records each batch of samples under its (provider, variant) key, and
//! reduces each batch to a short "essence" phrase.

mod report;
mod runner;
mod store;
mod summarizer;

pub use report::*;
pub use runner::*;
pub use store::*;
pub use summarizer::*;

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Prefix marking a failed sample in every rendered output
pub const ERROR_PREFIX: &str = "ERROR: ";

/// A named system prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptVariant {
    pub name: String,
    pub system_prompt: String,
}

impl PromptVariant {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
        }
    }
}

/// Result of a single sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl Outcome {
    /// Successful reply, flattened onto one line
    pub fn success(text: &str) -> Self {
        Outcome::Success(single_line(text))
    }

    /// Failed sample carrying its diagnostic, flattened onto one line
    pub fn failure(diagnostic: impl fmt::Display) -> Self {
        Outcome::Failure(single_line(&diagnostic.to_string()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Reply text of a successful sample
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Success(text) => Some(text),
            Outcome::Failure(_) => None,
        }
    }

    /// Parse a rendered line back into an outcome
    pub fn from_line(line: &str) -> Self {
        match line.strip_prefix(ERROR_PREFIX) {
            Some(diagnostic) => Outcome::Failure(diagnostic.to_string()),
            None => Outcome::Success(line.to_string()),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(text) => f.write_str(text),
            Outcome::Failure(diagnostic) => write!(f, "{}{}", ERROR_PREFIX, diagnostic),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Trim and join the non-blank lines of `text` with single spaces
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identifies one batch of samples: (provider, prompt variant)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultKey {
    pub provider: String,
    pub variant: String,
}

impl ResultKey {
    pub fn new(provider: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            variant: variant.into(),
        }
    }

    /// File stem for this batch's sample file
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.provider, self.variant)
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.provider, self.variant)
    }
}

/// Summarized central tendency of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Essence {
    Phrase(String),
    NoValidResponses,
    Failed(String),
}

impl fmt::Display for Essence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Essence::Phrase(phrase) => f.write_str(phrase),
            Essence::NoValidResponses => f.write_str("no valid responses"),
            Essence::Failed(diagnostic) => write!(f, "summarization failed: {}", diagnostic),
        }
    }
}

impl Serialize for Essence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
