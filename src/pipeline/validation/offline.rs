use super::grounding::check_attribution;
use super::keywords::{
    scan_citations, scan_dangerous_advice, scan_hallucinated_conditions,
    scan_unsupported_claims, Signal,
};
use super::types::{
    SafetyFlag, ValidationResult, OFFLINE_CLEAN_CONFIDENCE, OFFLINE_FLAGGED_CONFIDENCE,
};

const OFFLINE_REASONING: &str = "Offline validation using keyword matching (limited accuracy)";

/// Run every heuristic over the candidate, in reporting order:
/// unsupported claims, dangerous advice, citations, hallucinated conditions.
pub fn collect_signals(llm_response: &str, medical_report: &str) -> Vec<Signal> {
    let mut signals = Vec::new();
    signals.extend(scan_unsupported_claims(llm_response));
    signals.extend(check_attribution(llm_response));
    signals.extend(scan_dangerous_advice(llm_response));
    signals.extend(scan_citations(llm_response, medical_report));
    signals.extend(scan_hallucinated_conditions(llm_response, medical_report));
    signals
}

/// Keyword-heuristic validation. Needs no network and cannot fail; the
/// same inputs always give the same result.
pub fn validate_offline(llm_response: &str, medical_report: &str) -> ValidationResult {
    if llm_response.trim().is_empty() {
        return ValidationResult::insufficient_content();
    }

    let signals = collect_signals(llm_response, medical_report);

    let dangerous = signals
        .iter()
        .any(|s| s.flag == SafetyFlag::DangerousAdvice);
    let is_valid = signals.is_empty() && !dangerous;
    let confidence = if signals.is_empty() {
        OFFLINE_CLEAN_CONFIDENCE
    } else {
        OFFLINE_FLAGGED_CONFIDENCE
    };

    let reasoning = if signals.is_empty() {
        OFFLINE_REASONING.to_string()
    } else {
        format!(
            "{OFFLINE_REASONING}: {} heuristic signal(s) found",
            signals.len()
        )
    };

    ValidationResult {
        is_valid,
        confidence,
        issues: signals.iter().map(Signal::issue).collect(),
        corrections: None,
        safety_flags: signals.iter().map(|s| s.flag.as_str().to_string()).collect(),
        reasoning,
    }
    .enforce_policy()
}
