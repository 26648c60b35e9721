use std::sync::LazyLock;

use regex::Regex;

use super::types::SafetyFlag;

/// A compiled phrase pattern with the flag it raises.
struct SafetyPattern {
    regex: Regex,
    flag: SafetyFlag,
    description: &'static str,
}

/// One heuristic hit in a candidate response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub flag: SafetyFlag,
    pub matched_text: String,
    /// Byte offset of the match in the candidate text.
    pub offset: usize,
    pub description: String,
}

impl Signal {
    /// Issue string reported to the caller.
    pub fn issue(&self) -> String {
        format!("{}: '{}'", self.description, self.matched_text)
    }
}

/// Absolutist diagnosis, over-confidence and cure claims.
static UNSUPPORTED_CLAIM_PATTERNS: LazyLock<Vec<SafetyPattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"(?i)\b(?:means|indicates|confirms|proves)\s+(?:that\s+)?you\s+(?:definitely\s+)?(?:have|are\s+suffering\s+from)\b",
            SafetyFlag::UnsupportedClaim,
            "Absolutist diagnosis ('this means you have')",
        ),
        pattern(
            r"(?i)\byou\s+(?:definitely|certainly|clearly|undoubtedly)\s+have\b",
            SafetyFlag::UnsupportedClaim,
            "Over-confident diagnosis ('you definitely have')",
        ),
        pattern(
            r"(?i)\b(?:definitely|certainly)\s+has\b",
            SafetyFlag::UnsupportedClaim,
            "Over-confident diagnosis ('definitely has')",
        ),
        pattern(
            r"(?i)\bwill\s+(?:definitely|certainly)\b",
            SafetyFlag::UnsupportedClaim,
            "Over-confident prognosis ('will definitely')",
        ),
        pattern(
            r"(?i)\b(?:100|one\s+hundred)\s*(?:%|percent)\s+(?:sure|certain)\b|\bguaranteed?\b",
            SafetyFlag::UnsupportedClaim,
            "Certainty claim ('100% sure', 'guaranteed')",
        ),
        pattern(
            r"(?i)\bcur(?:e|es|ed)\b",
            SafetyFlag::UnsupportedClaim,
            "Cure claim",
        ),
    ]
});

/// Prescriptive instructions and advice that steers away from care.
static DANGEROUS_ADVICE_PATTERNS: LazyLock<Vec<SafetyPattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"(?i)\b(?:you\s+)?should\s+(?:take|stop|start|increase|decrease|double|skip|discontinue|change|switch|reduce)\b",
            SafetyFlag::DangerousAdvice,
            "Prescriptive advice ('should take/stop/start')",
        ),
        pattern(
            r"(?i)\bstop\s+taking\b",
            SafetyFlag::DangerousAdvice,
            "Medication discontinuation ('stop taking')",
        ),
        pattern(
            r"(?i)\b(?:don['’]?t|do\s+not)\s+take\b",
            SafetyFlag::DangerousAdvice,
            "Medication prohibition ('don't take')",
        ),
        pattern(
            r"(?i)\b(?:need|have|must)\s+to\s+(?:start|stop|take|increase|decrease)\b",
            SafetyFlag::DangerousAdvice,
            "Imperative treatment ('need to start/stop')",
        ),
        pattern(
            r"(?i)\btake\s+\d+(?:\.\d+)?\s*(?:mg|mcg|µg|g|ml|units?|tablets?|pills?|capsules?)\b",
            SafetyFlag::DangerousAdvice,
            "Dosage instruction ('take 500 mg')",
        ),
        pattern(
            r"(?i)\b(?:increase|decrease|double|halve|reduce|skip)\s+(?:your\s+)?(?:dose|dosage|medication|medicine|insulin|pills?)\b",
            SafetyFlag::DangerousAdvice,
            "Dose change ('double your dose')",
        ),
        pattern(
            r"(?i)\bignore\s+(?:your\s+|the\s+)?(?:doctor|physician|healthcare\s+provider)",
            SafetyFlag::DangerousAdvice,
            "Discourages medical care ('ignore your doctor')",
        ),
        pattern(
            r"(?i)\bwithout\s+(?:seeing|consulting|talking\s+to|asking|checking\s+with)\s+(?:a|your)\s+(?:doctor|physician|healthcare\s+provider)",
            SafetyFlag::DangerousAdvice,
            "Discourages medical care ('without seeing a doctor')",
        ),
        pattern(
            r"(?i)\b(?:don['’]?t|do\s+not|no\s+need\s+to)\s+(?:seek|see|call|consult)\s+(?:a\s+|your\s+)?(?:doctor|physician|medical\s+(?:help|attention|care))",
            SafetyFlag::DangerousAdvice,
            "Discourages medical care ('don't seek medical help')",
        ),
    ]
});

/// Appeals to sources that must exist in the report to be trusted.
static CITATION_PATTERNS: LazyLock<Vec<SafetyPattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"(?i)\b(?:studies|research|trials?|evidence)\s+(?:shows?|proves?|confirms?|demonstrates?|ha(?:s|ve)\s+shown)\b",
            SafetyFlag::FabricatedCitation,
            "Unverifiable appeal to research",
        ),
        pattern(
            r"(?i)\baccording\s+to\s+(?:a|an|one|recent)\s+(?:\w+\s+)?(?:study|studies|trial|paper|survey|research)\b",
            SafetyFlag::FabricatedCitation,
            "Unverifiable study reference",
        ),
        pattern(
            r"\[\d{1,3}(?:\s*[,-]\s*\d{1,3})*\]",
            SafetyFlag::FabricatedCitation,
            "Numbered reference not in report",
        ),
        pattern(
            r"\b\p{Lu}\p{Ll}+\s+et\s+al\b",
            SafetyFlag::FabricatedCitation,
            "Author citation not in report",
        ),
        pattern(
            r"(?i)\bdoi:\s*10\.\d{4,9}/\S+",
            SafetyFlag::FabricatedCitation,
            "DOI not in report",
        ),
        pattern(
            r"\bJournal\s+of\s+(?:the\s+)?\p{Lu}\p{L}+",
            SafetyFlag::FabricatedCitation,
            "Journal citation not in report",
        ),
    ]
});

/// Conditions that must not be introduced unless the report mentions them.
const WATCHED_CONDITIONS: &[&str] = &[
    "diabetes",
    "cancer",
    "heart attack",
    "stroke",
    "heart failure",
    "kidney disease",
    "tumor",
    "leukemia",
    "pneumonia",
    "dementia",
    "hypertension",
    "sepsis",
];

static CONDITION_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    WATCHED_CONDITIONS
        .iter()
        .map(|c| {
            let regex = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(c)))
                .expect("Invalid condition pattern");
            (*c, regex)
        })
        .collect()
});

fn pattern(regex_str: &str, flag: SafetyFlag, description: &'static str) -> SafetyPattern {
    SafetyPattern {
        regex: Regex::new(regex_str).expect("Invalid safety regex pattern"),
        flag,
        description,
    }
}

/// First match of each pattern, in pattern order.
fn first_matches(patterns: &[SafetyPattern], text: &str) -> Vec<Signal> {
    patterns
        .iter()
        .filter_map(|sp| {
            sp.regex.find(text).map(|mat| Signal {
                flag: sp.flag,
                matched_text: mat.as_str().to_string(),
                offset: mat.start(),
                description: sp.description.to_string(),
            })
        })
        .collect()
}

/// Category (a): absolutist diagnosis, over-confidence, cure claims.
pub fn scan_unsupported_claims(text: &str) -> Vec<Signal> {
    first_matches(&UNSUPPORTED_CLAIM_PATTERNS, text)
}

/// Category (b): prescriptive or care-discouraging advice.
pub fn scan_dangerous_advice(text: &str) -> Vec<Signal> {
    first_matches(&DANGEROUS_ADVICE_PATTERNS, text)
}

/// Category (c): citations whose text does not occur in the report.
pub fn scan_citations(text: &str, report: &str) -> Vec<Signal> {
    let report_lower = report.to_lowercase();
    first_matches(&CITATION_PATTERNS, text)
        .into_iter()
        .filter(|s| !report_lower.contains(&s.matched_text.to_lowercase()))
        .collect()
}

/// Watched conditions mentioned in the response but absent from the report.
pub fn scan_hallucinated_conditions(text: &str, report: &str) -> Vec<Signal> {
    CONDITION_PATTERNS
        .iter()
        .filter_map(|(condition, regex)| {
            let mat = regex.find(text)?;
            if regex.is_match(report) {
                return None;
            }
            Some(Signal {
                flag: SafetyFlag::Hallucination,
                matched_text: mat.as_str().to_string(),
                offset: mat.start(),
                description: format!("Mentions '{condition}' but the medical report does not"),
            })
        })
        .collect()
}
