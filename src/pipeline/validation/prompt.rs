use super::types::{ConversationTurn, ValidationRequest, HISTORY_WINDOW};

const VALIDATOR_FRAMING: &str = "You are a medical safety validator. You are validating a \
medical-assistant response that was shown to a patient. Check it for:
1. Hallucinations (claims without support in the provided report or context)
2. Medical accuracy issues
3. Safety concerns (inappropriate medical advice, dangerous recommendations)
4. Over-confident claims (presenting uncertainty as fact)";

const OUTPUT_FORMAT: &str = r#"Respond ONLY with valid JSON in exactly this format:
{
    "is_valid": true or false,
    "confidence": integer from 0 to 100,
    "issues": ["issue1", "issue2"],
    "corrections": "corrected version of the response, or null if none needed",
    "safety_flags": ["flag1", "flag2"],
    "reasoning": "brief explanation of the validation"
}

Be very STRICT about hallucinations. If a claim is not grounded in the medical report or the retrieved context, flag it."#;

/// Render the most recent `HISTORY_WINDOW` turns, oldest first.
pub fn format_recent_history(history: &[ConversationTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full prompt sent to the validation model.
pub fn build_validation_prompt(request: &ValidationRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str(VALIDATOR_FRAMING);
    prompt.push_str("\n\n");

    prompt.push_str("MEDICAL REPORT:\n");
    prompt.push_str(&request.medical_report);
    prompt.push_str("\n\n");

    prompt.push_str("CONVERSATION CONTEXT:\n");
    let history = format_recent_history(&request.conversation_history);
    if history.is_empty() {
        prompt.push_str("(no prior conversation)");
    } else {
        prompt.push_str(&history);
    }
    prompt.push_str("\n\n");

    if let Some(context) = request
        .rag_context
        .as_deref()
        .filter(|c| !c.trim().is_empty())
    {
        prompt.push_str("RAG CONTEXT (Medical Knowledge Base):\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    prompt.push_str("LLM RESPONSE TO VALIDATE:\n");
    prompt.push_str(&request.llm_response);
    prompt.push_str("\n\n");

    prompt.push_str(OUTPUT_FORMAT);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (1..=n)
            .map(|i| {
                if i % 2 == 1 {
                    ConversationTurn::user(format!("question-{i}"))
                } else {
                    ConversationTurn::assistant(format!("answer-{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn prompt_contains_all_sections() {
        let request = ValidationRequest::new("Your glucose is 250 mg/dL.", "Glucose: 250 mg/dL")
            .with_history(turns(2))
            .with_rag_context("Normal fasting glucose is 70-100 mg/dL.");
        let prompt = build_validation_prompt(&request);

        assert!(prompt.contains("medical safety validator"));
        assert!(prompt.contains("MEDICAL REPORT:\nGlucose: 250 mg/dL"));
        assert!(prompt.contains("USER: question-1"));
        assert!(prompt.contains("ASSISTANT: answer-2"));
        assert!(prompt.contains("RAG CONTEXT"));
        assert!(prompt.contains("Normal fasting glucose"));
        assert!(prompt.contains("LLM RESPONSE TO VALIDATE:\nYour glucose is 250 mg/dL."));
        assert!(prompt.contains("\"confidence\": integer from 0 to 100"));
        assert!(prompt.contains("\"safety_flags\""));
    }

    #[test]
    fn rag_section_omitted_when_absent_or_blank() {
        let request = ValidationRequest::new("x", "r");
        assert!(!build_validation_prompt(&request).contains("RAG CONTEXT"));

        let request = ValidationRequest::new("x", "r").with_rag_context("   ");
        assert!(!build_validation_prompt(&request).contains("RAG CONTEXT"));
    }

    #[test]
    fn history_bounded_to_last_five_turns() {
        let request = ValidationRequest::new("x", "r").with_history(turns(8));
        let prompt = build_validation_prompt(&request);

        assert!(!prompt.contains("question-1"));
        assert!(!prompt.contains("answer-2"));
        assert!(!prompt.contains("question-3"));
        for i in 4..=8 {
            let text = if i % 2 == 1 {
                format!("USER: question-{i}")
            } else {
                format!("ASSISTANT: answer-{i}")
            };
            assert!(prompt.contains(&text), "missing turn {i}");
        }
    }

    #[test]
    fn history_order_preserved() {
        let history = format_recent_history(&turns(8));
        let lines: Vec<&str> = history.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "ASSISTANT: answer-4");
        assert_eq!(lines[4], "ASSISTANT: answer-8");
    }

    #[test]
    fn short_history_kept_whole() {
        assert_eq!(format_recent_history(&turns(3)).lines().count(), 3);
        assert_eq!(format_recent_history(&[]), "");
    }

    #[test]
    fn empty_history_noted() {
        let prompt = build_validation_prompt(&ValidationRequest::new("x", "r"));
        assert!(prompt.contains("(no prior conversation)"));
    }
}
