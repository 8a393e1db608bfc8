//! Report generation - per-combination sample files, final report, JSON record

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{Essence, Essences, Outcome, PromptVariant, ResultKey, ResultStore};
use crate::error::Result;

pub const FINAL_REPORT_TITLE: &str = "FINAL ANALYSIS - AVERAGE ESSENCE BY MODEL/PROMPT COMBO";
pub const FINAL_REPORT_FILE: &str = "final_analysis.txt";
pub const COMBINED_FILE: &str = "comprehensive_analysis.json";

/// Parameters of the run, embedded in the combined record
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentParams {
    pub num_requests_per_combo: u32,
    pub total_combinations: usize,
    pub message: String,
    pub system_prompts: Map<String, Value>,
    pub summarizer: String,
}

impl ExperimentParams {
    pub fn new(
        sample_count: u32,
        message: &str,
        variants: &[PromptVariant],
        summarizer: &str,
    ) -> Self {
        let system_prompts = variants
            .iter()
            .map(|v| (v.name.clone(), Value::String(v.system_prompt.clone())))
            .collect();

        Self {
            num_requests_per_combo: sample_count,
            total_combinations: 0,
            message: message.to_string(),
            system_prompts,
            summarizer: summarizer.to_string(),
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    /// provider -> variant -> rendered sample lines
    pub raw_responses: Map<String, Value>,
    /// provider -> variant -> rendered essence
    pub essence_analysis: Map<String, Value>,
    pub experiment_params: ExperimentParams,
}

impl Report {
    /// Assemble the record; `generated_at` is supplied by the caller so the
    /// output depends only on the arguments.
    pub fn build(
        store: &ResultStore,
        essences: &Essences,
        mut params: ExperimentParams,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut raw_responses = Map::new();
        for (key, outcomes) in store.iter() {
            let lines = outcomes
                .iter()
                .map(|o| Value::String(o.to_string()))
                .collect();
            nest(&mut raw_responses, key, Value::Array(lines));
        }

        let mut essence_analysis = Map::new();
        for key in store.keys() {
            let essence = essence_for(essences, key);
            nest(&mut essence_analysis, key, Value::String(essence.to_string()));
        }

        params.total_combinations = store.len();

        Self {
            generated_at,
            raw_responses,
            essence_analysis,
            experiment_params: params,
        }
    }
}

fn nest(map: &mut Map<String, Value>, key: &ResultKey, value: Value) {
    let provider = map
        .entry(key.provider.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(variants) = provider {
        variants.insert(key.variant.clone(), value);
    }
}

fn essence_for(essences: &Essences, key: &ResultKey) -> Essence {
    essences
        .get(key)
        .cloned()
        .unwrap_or_else(|| Essence::Failed("not summarized".to_string()))
}

/// One `<PROVIDER> + <VARIANT>: <essence>` line per key, in store order
pub fn final_report_lines(store: &ResultStore, essences: &Essences) -> Vec<String> {
    store
        .keys()
        .map(|key| {
            format!(
                "{} + {}: {}",
                key.provider.to_uppercase(),
                key.variant.to_uppercase(),
                essence_for(essences, key)
            )
        })
        .collect()
}

/// Writes run artifacts into one output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    directory: PathBuf,
}

impl ReportWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn samples_path(&self, key: &ResultKey) -> PathBuf {
        self.directory.join(format!("{}.txt", key.file_stem()))
    }

    fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write one sample per line, failures as `ERROR: <diagnostic>`
    pub fn write_samples(&self, key: &ResultKey, outcomes: &[Outcome]) -> Result<PathBuf> {
        let content: String = outcomes.iter().map(|o| format!("{}\n", o)).collect();
        let path = self.write(&format!("{}.txt", key.file_stem()), &content)?;
        info!(path = %path.display(), samples = outcomes.len(), "Saved responses");
        Ok(path)
    }

    /// Read a sample file written by [`ReportWriter::write_samples`]
    pub fn read_samples(&self, key: &ResultKey) -> Result<Vec<Outcome>> {
        let content = fs::read_to_string(self.samples_path(key))?;
        Ok(content.lines().map(Outcome::from_line).collect())
    }

    pub fn write_final_report(&self, lines: &[String]) -> Result<PathBuf> {
        let mut content = format!("{}\n{}\n\n", FINAL_REPORT_TITLE, "=".repeat(60));
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }

        let path = self.write(FINAL_REPORT_FILE, &content)?;
        info!(path = %path.display(), "Final analysis saved");
        Ok(path)
    }

    pub fn write_combined(&self, report: &Report) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(report)?;
        let path = self.write(COMBINED_FILE, &content)?;
        info!(path = %path.display(), "Comprehensive results saved");
        Ok(path)
    }
}
