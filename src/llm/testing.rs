//! Scripted responder for exercising the survey without a network

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{CompletionRequest, Responder, SamplingParams};
use crate::error::{Result, SurveyError};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub system: Option<String>,
    pub message: String,
    pub params: SamplingParams,
}

/// Replays a fixed script of replies (`Ok`) and provider errors (`Err`)
pub struct ScriptedResponder {
    name: String,
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    repeat: Option<std::result::Result<String, String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedResponder {
    pub fn new(name: &str, script: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|step| step.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with the same reply
    pub fn always(name: &str, reply: &str) -> Self {
        let mut responder = Self::new(name, Vec::new());
        responder.repeat = Some(Ok(reply.to_string()));
        responder
    }

    /// Fails every request with the same diagnostic
    pub fn failing(name: &str, diagnostic: &str) -> Self {
        let mut responder = Self::new(name, Vec::new());
        responder.repeat = Some(Err(diagnostic.to_string()));
        responder
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Responder for ScriptedResponder {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system: request.system.map(str::to_string),
            message: request.message.to_string(),
            params: request.params,
        });

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .unwrap_or_else(|| Err("script exhausted".to_string()));

        step.map_err(SurveyError::Provider)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
