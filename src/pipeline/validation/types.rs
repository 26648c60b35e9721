use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of most recent conversation turns included in a validation prompt.
pub const HISTORY_WINDOW: usize = 5;

/// Offline confidence when no heuristic signal fired.
pub const OFFLINE_CLEAN_CONFIDENCE: u8 = 50;

/// Offline confidence when at least one heuristic signal fired.
pub const OFFLINE_FLAGGED_CONFIDENCE: u8 = 30;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "USER",
            TurnRole::Assistant => "ASSISTANT",
        }
    }
}

/// One prior message in the conversation being validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Which validation path the caller asked for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Offline,
    Api,
}

/// Everything needed to validate one candidate answer.
#[derive(Clone, PartialEq)]
pub struct ValidationRequest {
    pub llm_response: String,
    pub conversation_history: Vec<ConversationTurn>,
    pub medical_report: String,
    pub rag_context: Option<String>,
    pub mode: ValidationMode,
    pub api_key: Option<String>,
}

impl ValidationRequest {
    /// Offline request with no history or retrieved context.
    pub fn new(llm_response: impl Into<String>, medical_report: impl Into<String>) -> Self {
        Self {
            llm_response: llm_response.into(),
            conversation_history: Vec::new(),
            medical_report: medical_report.into(),
            rag_context: None,
            mode: ValidationMode::Offline,
            api_key: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_rag_context(mut self, context: impl Into<String>) -> Self {
        self.rag_context = Some(context.into());
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

// Credentials never reach logs.
impl fmt::Debug for ValidationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRequest")
            .field("llm_response_len", &self.llm_response.len())
            .field("conversation_turns", &self.conversation_history.len())
            .field("medical_report_len", &self.medical_report.len())
            .field("has_rag_context", &self.rag_context.is_some())
            .field("mode", &self.mode)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Canonical outcome of a validation, whichever path produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Always within 0..=100.
    pub confidence: u8,
    pub issues: Vec<String>,
    pub corrections: Option<String>,
    /// Deduplicated, in first-detection order.
    pub safety_flags: Vec<String>,
    pub reasoning: String,
}

impl ValidationResult {
    /// Result for a candidate with no content to check.
    pub fn insufficient_content() -> Self {
        Self {
            is_valid: false,
            confidence: 0,
            issues: vec!["Response is empty; nothing to validate".to_string()],
            corrections: None,
            safety_flags: vec![SafetyFlag::InsufficientContent.as_str().to_string()],
            reasoning: "No response text was provided, so it cannot be grounded in the report"
                .to_string(),
        }
    }

    /// Whether any flag belongs to the dangerous-advice category.
    pub fn has_dangerous_advice_flag(&self) -> bool {
        self.safety_flags.iter().any(|f| is_dangerous_advice_flag(f))
    }

    /// Apply the invariants every outgoing result must satisfy: confidence
    /// capped at 100, flags deduplicated, and dangerous advice never valid.
    pub fn enforce_policy(mut self) -> Self {
        self.confidence = self.confidence.min(100);

        let mut seen = Vec::with_capacity(self.safety_flags.len());
        for flag in self.safety_flags.drain(..) {
            if !seen.contains(&flag) {
                seen.push(flag);
            }
        }
        self.safety_flags = seen;

        if self.has_dangerous_advice_flag() {
            self.is_valid = false;
        }
        self
    }
}

/// Tags emitted by the offline classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyFlag {
    UnsupportedClaim,
    DangerousAdvice,
    FabricatedCitation,
    Hallucination,
    InsufficientContent,
}

impl SafetyFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyFlag::UnsupportedClaim => "unsupported-claim",
            SafetyFlag::DangerousAdvice => "dangerous-advice",
            SafetyFlag::FabricatedCitation => "fabricated-citation",
            SafetyFlag::Hallucination => "hallucination",
            SafetyFlag::InsufficientContent => "insufficient-content",
        }
    }
}

impl fmt::Display for SafetyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form flags from the API path use whatever naming the model chose
/// ("DANGEROUS_MEDICAL_ADVICE", "unsafe recommendation", ...).
pub fn is_dangerous_advice_flag(flag: &str) -> bool {
    let lower = flag.to_lowercase();
    ["danger", "unsafe", "prescri", "critical"]
        .iter()
        .any(|marker| lower.contains(marker))
}
