use super::types::ValidationResult;

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "  None".to_string();
    }
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable report of a validation result, for logs and consoles.
pub fn format_validation_report(result: &ValidationResult) -> String {
    let status = if result.is_valid { "[VALID]" } else { "[INVALID]" };

    let mut report = String::new();
    report.push_str("VALIDATION REPORT\n");
    report.push_str(status);
    report.push('\n');
    report.push_str(&format!("Confidence: {}%\n\n", result.confidence));

    report.push_str(&format!("Issues Found: {}\n", result.issues.len()));
    report.push_str(&bullet_list(&result.issues));
    report.push_str("\n\n");

    report.push_str(&format!("Safety Flags: {}\n", result.safety_flags.len()));
    report.push_str(&bullet_list(&result.safety_flags));
    report.push_str("\n\n");

    report.push_str("Reasoning:\n");
    report.push_str(&result.reasoning);
    report.push('\n');

    if let Some(correction) = &result.corrections {
        report.push_str("\nSuggested Correction:\n");
        report.push_str(correction);
        report.push('\n');
    }

    report
}
