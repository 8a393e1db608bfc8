//! LLM provider integrations and request pacing

mod pacing;
mod provider;

#[cfg(test)]
pub mod testing;

pub use pacing::*;
pub use provider::*;
