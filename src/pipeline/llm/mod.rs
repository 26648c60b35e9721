pub mod anthropic;

pub use anthropic::*;

use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Cannot reach LLM API at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("LLM API returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// Chat-completion client abstraction (allows mocking).
///
/// The credential is passed per call because it may come from the
/// individual validation request rather than process configuration.
pub trait LlmClient: Send + Sync {
    fn generate(&self, api_key: &str, model: &str, prompt: &str) -> Result<String, LlmError>;
}

impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    fn generate(&self, api_key: &str, model: &str, prompt: &str) -> Result<String, LlmError> {
        (**self).generate(api_key, model, prompt)
    }
}

/// Mock LLM client for testing. Returns a canned reply or a canned error
/// and records every prompt it was sent.
pub struct MockLlmClient {
    outcome: Result<String, LlmError>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(reply: &str) -> Self {
        Self {
            outcome: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: LlmError) -> Self {
        Self {
            outcome: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _api_key: &str, _model: &str, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.outcome.clone()
    }
}
