//! Run orchestration: build the provider roster, survey, summarize, report

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, ProviderConfig};
use crate::llm::{create_provider, Pacer, Responder, SamplingParams, UnavailableProvider};
use crate::survey::{final_report_lines, ExperimentParams, Report, ReportWriter, Summarizer, Survey};

/// Application state for one survey run
pub struct App {
    /// Configuration
    pub config: Config,

    /// Providers surveyed, in order
    providers: Vec<Arc<dyn Responder>>,

    /// Backend computing the essences
    summarizer_backend: Arc<dyn Responder>,

    /// Artifact writer for the output directory
    writer: ReportWriter,
}

/// Build a responder, falling back to one that records the build error
fn build_responder(config: &ProviderConfig, app_config: &Config) -> Arc<dyn Responder> {
    match create_provider(config, app_config.request_timeout()) {
        Ok(provider) => Arc::from(provider),
        Err(e) => {
            warn!(provider = %config.name, error = %e, "Provider unavailable");
            Arc::new(UnavailableProvider::new(config.name.clone(), e.to_string()))
        }
    }
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let providers: Vec<Arc<dyn Responder>> = config
            .enabled_providers()
            .map(|p| build_responder(p, &config))
            .collect();

        let summarizer_name = config.summarizer.provider.as_str();
        let existing = providers.iter().find(|p| p.name() == summarizer_name);
        let summarizer_backend = match existing {
            Some(provider) => Arc::clone(provider),
            None => {
                let provider_config = config.provider(summarizer_name).ok_or_else(|| {
                    anyhow::anyhow!("Unknown summarizer provider: {}", summarizer_name)
                })?;
                build_responder(provider_config, &config)
            }
        };

        let writer = ReportWriter::new(config.output.directory.clone());

        Ok(Self {
            config,
            providers,
            summarizer_backend,
            writer,
        })
    }

    /// Run the whole survey and return the final report lines
    pub async fn run(&self) -> Result<Vec<String>> {
        let survey_config = &self.config.survey;
        let started_at = Utc::now();

        let survey = Survey::new(
            self.providers.clone(),
            self.config.prompt_variants.clone(),
            survey_config.message.clone(),
            survey_config.sample_count,
            SamplingParams {
                max_tokens: survey_config.max_tokens,
                temperature: survey_config.temperature,
            },
        )
        .with_pacer(Pacer::new(self.config.sample_pause()));

        info!(
            combinations = survey.combinations(),
            samples = survey_config.sample_count,
            output = %self.writer.directory().display(),
            "Starting survey"
        );

        let store = survey
            .collect(|key, outcomes| self.writer.write_samples(key, outcomes).map(|_| ()))
            .await?;

        let summarizer = Summarizer::new(
            Arc::clone(&self.summarizer_backend),
            survey_config.message.clone(),
            self.config.summarizer.max_words,
            SamplingParams {
                max_tokens: self.config.summarizer.max_tokens,
                temperature: self.config.summarizer.temperature,
            },
        );

        info!(backend = summarizer.backend_name(), "Analyzing results");
        let essences = summarizer.summarize(&store).await;

        let lines = final_report_lines(&store, &essences);
        let params = ExperimentParams::new(
            survey_config.sample_count,
            &survey_config.message,
            &self.config.prompt_variants,
            summarizer.backend_name(),
        );
        let report = Report::build(&store, &essences, params, started_at);

        self.writer.write_combined(&report)?;
        self.writer.write_final_report(&lines)?;

        info!(essences = essences.len(), "Survey complete");
        Ok(lines)
    }
}
