//! Sequential fan-out of one message over providers and prompt variants

use std::sync::Arc;
use tracing::{info, warn};

use super::{Outcome, PromptVariant, ResultKey, ResultStore};
use crate::error::Result;
use crate::llm::{CompletionRequest, Pacer, Responder, SamplingParams};

/// Request `count` samples one at a time, pausing between them.
///
/// A failed sample is recorded as [`Outcome::Failure`] and never stops the
/// loop, so the returned sequence always holds exactly `count` outcomes.
pub async fn collect_samples(
    responder: &dyn Responder,
    variant: &PromptVariant,
    message: &str,
    count: u32,
    params: SamplingParams,
    pacer: &Pacer,
) -> Vec<Outcome> {
    let request = CompletionRequest {
        system: Some(variant.system_prompt.as_str()),
        message,
        params,
    };
    let mut outcomes = Vec::with_capacity(count as usize);

    for i in 0..count {
        if i > 0 {
            pacer.pause().await;
        }

        info!(
            provider = responder.name(),
            variant = %variant.name,
            "Sending request {}/{}",
            i + 1,
            count
        );

        match responder.complete(&request).await {
            Ok(reply) => outcomes.push(Outcome::success(&reply)),
            Err(e) => {
                warn!(
                    provider = responder.name(),
                    variant = %variant.name,
                    error = %e,
                    "Request {} failed",
                    i + 1
                );
                outcomes.push(Outcome::failure(e));
            }
        }
    }

    outcomes
}

/// One run: every provider answers the message under every prompt variant
pub struct Survey {
    providers: Vec<Arc<dyn Responder>>,
    variants: Vec<PromptVariant>,
    message: String,
    sample_count: u32,
    params: SamplingParams,
    pacer: Pacer,
}

impl Survey {
    pub fn new(
        providers: Vec<Arc<dyn Responder>>,
        variants: Vec<PromptVariant>,
        message: impl Into<String>,
        sample_count: u32,
        params: SamplingParams,
    ) -> Self {
        Self {
            providers,
            variants,
            message: message.into(),
            sample_count,
            params,
            pacer: Pacer::default(),
        }
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn combinations(&self) -> usize {
        self.providers.len() * self.variants.len()
    }

    /// Run every combination in (provider, variant) order.
    ///
    /// `on_pair` sees each batch as soon as it completes; an error from it
    /// aborts the run.
    pub async fn collect<F>(&self, mut on_pair: F) -> Result<ResultStore>
    where
        F: FnMut(&ResultKey, &[Outcome]) -> Result<()>,
    {
        let mut store = ResultStore::new();

        for provider in &self.providers {
            for variant in &self.variants {
                let key = ResultKey::new(provider.name(), variant.name.as_str());
                info!(combination = %key, "Running combination");

                let outcomes = collect_samples(
                    provider.as_ref(),
                    variant,
                    &self.message,
                    self.sample_count,
                    self.params,
                    &self.pacer,
                )
                .await;

                let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
                info!(
                    combination = %key,
                    succeeded,
                    failed = outcomes.len() - succeeded,
                    "Combination complete"
                );

                on_pair(&key, &outcomes)?;
                store.record(key, outcomes);
            }
        }

        Ok(store)
    }
}
