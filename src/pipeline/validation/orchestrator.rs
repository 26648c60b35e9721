use std::fmt;

use crate::config::ValidatorConfig;
use crate::pipeline::llm::{AnthropicClient, LlmClient};

use super::offline::validate_offline;
use super::parser::parse_validation_reply;
use super::prompt::build_validation_prompt;
use super::types::{ValidationMode, ValidationRequest, ValidationResult};
use super::ValidationError;

/// Which path a request will take.
#[derive(Clone, PartialEq, Eq)]
pub enum ValidationRoute {
    /// Try the API with this credential; fall back to offline on failure.
    AttemptApi(String),
    /// Keyword heuristics only.
    Offline,
}

// Credentials never reach logs.
impl fmt::Debug for ValidationRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationRoute::AttemptApi(_) => f.write_str("AttemptApi(<redacted>)"),
            ValidationRoute::Offline => f.write_str("Offline"),
        }
    }
}

/// Validates candidate answers, preferring the API path when asked for and
/// possible, and always producing a result.
pub struct GroundingValidator {
    client: Box<dyn LlmClient>,
    config: ValidatorConfig,
}

impl GroundingValidator {
    pub fn new(client: Box<dyn LlmClient>, config: ValidatorConfig) -> Self {
        Self { client, config }
    }

    /// Validator backed by the Anthropic Messages API.
    pub fn anthropic(config: ValidatorConfig) -> Result<Self, crate::pipeline::llm::LlmError> {
        let client = AnthropicClient::new(
            &config.api_base_url,
            config.timeout_secs,
            config.max_tokens,
        )?;
        Ok(Self::new(Box::new(client), config))
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Explicit request key first, then the configured key. Blank keys are ignored.
    pub fn resolve_credential(&self, request: &ValidationRequest) -> Option<String> {
        request
            .api_key
            .as_deref()
            .or(self.config.api_key.as_deref())
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    pub fn route(&self, request: &ValidationRequest) -> ValidationRoute {
        match (request.mode, self.resolve_credential(request)) {
            (ValidationMode::Api, Some(key)) => ValidationRoute::AttemptApi(key),
            (ValidationMode::Api, None) => {
                tracing::debug!("API validation requested but no credential; using offline path");
                ValidationRoute::Offline
            }
            (ValidationMode::Offline, _) => ValidationRoute::Offline,
        }
    }

    /// Prompt that would be sent on the API path.
    pub fn build_prompt(&self, request: &ValidationRequest) -> String {
        build_validation_prompt(request)
    }

    /// Validate a candidate answer. Never fails: API errors degrade to the
    /// offline heuristics.
    pub fn validate(&self, request: &ValidationRequest) -> ValidationResult {
        if request.llm_response.trim().is_empty() {
            tracing::info!(outcome = "insufficient_content", "Validation: empty response");
            return ValidationResult::insufficient_content();
        }

        let result = match self.route(request) {
            ValidationRoute::AttemptApi(key) => match self.validate_via_api(request, &key) {
                Ok(result) => {
                    log_outcome("api", &result);
                    return result;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "API validation failed; falling back to offline");
                    validate_offline(&request.llm_response, &request.medical_report)
                }
            },
            ValidationRoute::Offline => {
                validate_offline(&request.llm_response, &request.medical_report)
            }
        };

        log_outcome("offline", &result);
        result
    }

    /// Single attempt at the API path; errors are returned, not absorbed.
    pub fn validate_via_api(
        &self,
        request: &ValidationRequest,
        api_key: &str,
    ) -> Result<ValidationResult, ValidationError> {
        let prompt = build_validation_prompt(request);
        let reply = self.client.generate(api_key, &self.config.model, &prompt)?;
        parse_validation_reply(&reply)
    }
}

/// Validate with the production Anthropic client. If the HTTP client cannot
/// be built, the request is validated offline.
pub fn validate_response(request: &ValidationRequest, config: &ValidatorConfig) -> ValidationResult {
    match GroundingValidator::anthropic(config.clone()) {
        Ok(validator) => validator.validate(request),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot build API client; validating offline");
            if request.llm_response.trim().is_empty() {
                return ValidationResult::insufficient_content();
            }
            validate_offline(&request.llm_response, &request.medical_report)
        }
    }
}

/// Log a validation outcome WITHOUT patient data.
fn log_outcome(path: &'static str, result: &ValidationResult) {
    if result.is_valid {
        tracing::info!(
            path,
            confidence = result.confidence,
            "Validation: passed"
        );
    } else {
        tracing::warn!(
            path,
            confidence = result.confidence,
            issue_count = result.issues.len(),
            flags = ?result.safety_flags,
            "Validation: rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::llm::{LlmError, MockLlmClient};
    use crate::pipeline::validation::types::ConversationTurn;

    const GLUCOSE_REPORT: &str = "Glucose: 250 mg/dL (ref 70-100)";
    const DANGEROUS: &str = "Your blood glucose of 250 mg/dL means you have diabetes and should \
                             start insulin immediately without seeing a doctor";
    const NEUTRAL: &str = "Your glucose level is 250 mg/dL, which is above the typical reference \
                           range of 70–100 mg/dL. Please discuss this with your doctor";

    /// Shares a mock with the validator so tests can inspect what was sent.
    struct SharedMock(Arc<MockLlmClient>);

    impl LlmClient for SharedMock {
        fn generate(&self, api_key: &str, model: &str, prompt: &str) -> Result<String, LlmError> {
            self.0.generate(api_key, model, prompt)
        }
    }

    fn config(api_key: Option<&str>) -> ValidatorConfig {
        ValidatorConfig {
            api_key: api_key.map(str::to_string),
            ..ValidatorConfig::default()
        }
    }

    fn validator_with(mock: MockLlmClient, api_key: Option<&str>) -> (GroundingValidator, Arc<MockLlmClient>) {
        let mock = Arc::new(mock);
        let validator =
            GroundingValidator::new(Box::new(SharedMock(Arc::clone(&mock))), config(api_key));
        (validator, mock)
    }

    fn history(n: usize) -> Vec<ConversationTurn> {
        (1..=n)
            .map(|i| {
                if i % 2 == 1 {
                    ConversationTurn::user(format!("turn-{i}-text"))
                } else {
                    ConversationTurn::assistant(format!("turn-{i}-text"))
                }
            })
            .collect()
    }

    // =================================================================
    // ROUTING
    // =================================================================

    #[test]
    fn offline_mode_never_calls_api() {
        let (validator, mock) = validator_with(MockLlmClient::new("{}"), Some("sk-configured"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT);
        let result = validator.validate(&request);
        assert!(result.is_valid);
        assert!(mock.prompts().is_empty());
    }

    #[test]
    fn api_mode_without_credential_goes_offline() {
        let (validator, mock) = validator_with(MockLlmClient::new("{}"), None);
        let request = ValidationRequest::new(DANGEROUS, GLUCOSE_REPORT).with_mode(ValidationMode::Api);

        assert_eq!(validator.route(&request), ValidationRoute::Offline);
        let result = validator.validate(&request);
        assert!(mock.prompts().is_empty());
        assert_eq!(result, validate_offline(DANGEROUS, GLUCOSE_REPORT));
        assert!(!result.is_valid);
        assert_eq!(result.confidence, 30);
    }

    #[test]
    fn explicit_key_wins_over_configured_key() {
        let (validator, _) = validator_with(MockLlmClient::new("{}"), Some("sk-configured"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT)
            .with_mode(ValidationMode::Api)
            .with_api_key("sk-explicit");
        assert_eq!(
            validator.route(&request),
            ValidationRoute::AttemptApi("sk-explicit".into())
        );
    }

    #[test]
    fn configured_key_used_when_request_has_none() {
        let (validator, _) = validator_with(MockLlmClient::new("{}"), Some("sk-configured"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        assert_eq!(
            validator.route(&request),
            ValidationRoute::AttemptApi("sk-configured".into())
        );
    }

    #[test]
    fn route_debug_redacts_key() {
        let (validator, _) = validator_with(MockLlmClient::new("{}"), Some("sk-ant-very-secret"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        let debug = format!("{:?}", validator.route(&request));
        assert_eq!(debug, "AttemptApi(<redacted>)");
        assert_eq!(format!("{:?}", ValidationRoute::Offline), "Offline");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let (validator, _) = validator_with(MockLlmClient::new("{}"), None);
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT)
            .with_mode(ValidationMode::Api)
            .with_api_key("   ");
        assert_eq!(validator.route(&request), ValidationRoute::Offline);
    }

    // =================================================================
    // API PATH
    // =================================================================

    #[test]
    fn api_result_returned_when_reply_parses() {
        let reply = "Sure! ```json\n{\"is_valid\": true, \"confidence\": 92, \"issues\": [], \
                     \"corrections\": null, \"safety_flags\": [], \"reasoning\": \"Grounded.\"}\n```";
        let (validator, mock) = validator_with(MockLlmClient::new(reply), Some("sk-test"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);

        let result = validator.validate(&request);
        assert!(result.is_valid);
        assert_eq!(result.confidence, 92);
        assert_eq!(result.reasoning, "Grounded.");
        assert_eq!(mock.prompts().len(), 1);
    }

    #[test]
    fn transport_timeout_falls_back_to_offline() {
        let (validator, mock) =
            validator_with(MockLlmClient::failing(LlmError::Timeout(30)), Some("sk-test"));

        let dangerous = ValidationRequest::new(DANGEROUS, GLUCOSE_REPORT)
            .with_mode(ValidationMode::Api);
        let result = validator.validate(&dangerous);
        assert!(!result.is_valid);
        assert_eq!(result.confidence, 30);
        assert!(result.reasoning.starts_with("Offline validation"));

        let neutral = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        let result = validator.validate(&neutral);
        assert!(result.is_valid);
        assert_eq!(result.confidence, 50);
        assert_eq!(mock.prompts().len(), 2);
    }

    #[test]
    fn unparseable_reply_falls_back_to_offline() {
        let (validator, _) = validator_with(
            MockLlmClient::new("I'm sorry, I can't help with that."),
            Some("sk-test"),
        );
        let request = ValidationRequest::new(DANGEROUS, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        assert_eq!(validator.validate(&request), validate_offline(DANGEROUS, GLUCOSE_REPORT));
    }

    #[test]
    fn reply_missing_is_valid_falls_back_to_offline() {
        let (validator, _) =
            validator_with(MockLlmClient::new(r#"{"confidence": 99}"#), Some("sk-test"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        let result = validator.validate(&request);
        assert_eq!(result.confidence, 50);
    }

    #[test]
    fn http_status_error_falls_back_to_offline() {
        let (validator, _) = validator_with(
            MockLlmClient::failing(LlmError::Status {
                status: 529,
                body: "overloaded".into(),
            }),
            Some("sk-test"),
        );
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        assert!(validator.validate(&request).is_valid);
    }

    #[test]
    fn validate_via_api_surfaces_errors() {
        let (validator, _) =
            validator_with(MockLlmClient::failing(LlmError::Timeout(30)), Some("sk-test"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT);
        let err = validator.validate_via_api(&request, "sk-test").unwrap_err();
        assert!(matches!(err, ValidationError::Llm(LlmError::Timeout(30))));
    }

    #[test]
    fn sent_prompt_contains_only_last_five_turns() {
        let reply = r#"{"is_valid": true, "confidence": 80}"#;
        let (validator, mock) = validator_with(MockLlmClient::new(reply), Some("sk-test"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT)
            .with_history(history(8))
            .with_mode(ValidationMode::Api);

        let inspected = validator.build_prompt(&request);
        validator.validate(&request);
        let sent = mock.prompts().pop().unwrap();
        assert_eq!(sent, inspected);

        for i in 1..=3 {
            assert!(!sent.contains(&format!("turn-{i}-text")), "turn {i} leaked");
        }
        for i in 4..=8 {
            assert!(sent.contains(&format!("turn-{i}-text")), "turn {i} missing");
        }
    }

    // =================================================================
    // INVARIANTS
    // =================================================================

    #[test]
    fn empty_response_short_circuits_api() {
        let (validator, mock) = validator_with(MockLlmClient::new("{}"), Some("sk-test"));
        let request = ValidationRequest::new("  ", GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        assert_eq!(validator.validate(&request), ValidationResult::insufficient_content());
        assert!(mock.prompts().is_empty());
    }

    #[test]
    fn api_dangerous_flag_forces_invalid() {
        let reply = r#"{"is_valid": true, "confidence": 75, "safety_flags": ["dangerous-advice"]}"#;
        let (validator, _) = validator_with(MockLlmClient::new(reply), Some("sk-test"));
        let request = ValidationRequest::new(DANGEROUS, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        let result = validator.validate(&request);
        assert!(!result.is_valid);
        assert_eq!(result.confidence, 75);
    }

    #[test]
    fn api_confidence_clamped() {
        let reply = r#"{"is_valid": true, "confidence": 400}"#;
        let (validator, _) = validator_with(MockLlmClient::new(reply), Some("sk-test"));
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        assert_eq!(validator.validate(&request).confidence, 100);
    }

    #[test]
    fn offline_validation_is_deterministic() {
        let (validator, _) = validator_with(MockLlmClient::new("{}"), None);
        let request = ValidationRequest::new(DANGEROUS, GLUCOSE_REPORT);
        let first = validator.validate(&request);
        assert_eq!(validator.validate(&request), first);
    }

    #[test]
    fn validate_response_without_key_runs_offline() {
        let request = ValidationRequest::new(NEUTRAL, GLUCOSE_REPORT).with_mode(ValidationMode::Api);
        let result = validate_response(&request, &config(None));
        assert!(result.is_valid);
        assert_eq!(result.confidence, 50);
    }
}
