use std::sync::LazyLock;

use regex::Regex;

use super::keywords::Signal;
use super::types::SafetyFlag;

/// Phrases that tie a sentence back to the report or the clinician.
/// A claim in the same sentence as one of these is considered attributed.
static ATTRIBUTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\byour\s+(?:medical\s+)?(?:documents?|records?|reports?|results?|lab\s+results?|test\s+results?|labs?|scan|x-ray|ecg)\s+(?:shows?|indicates?|mentions?|states?|notes?|reveals?|lists?|records?|says?)\b",
        r"(?i)\b(?:Dr\.?\s+\w+|your\s+(?:doctor|physician|specialist|cardiologist|GP|healthcare\s+provider))\s+(?:noted|wrote|documented|recorded|diagnosed|prescribed|mentioned|indicated|observed|stated|reported)\b",
        r"(?i)\b(?:according\s+to|based\s+on|as\s+(?:noted|stated|documented|recorded|mentioned)\s+in)\s+(?:your|the)\s+(?:medical\s+)?(?:documents?|records?|reports?|results?|labs?|prescription|discharge\s+summary|clinical\s+notes?)\b",
        r"(?i)\bthe\s+report\s+(?:shows?|indicates?|mentions?|states?|notes?|lists?|says?)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid attribution pattern"))
    .collect()
});

/// "you have <word>": the word is checked against `NON_CLINICAL_OBJECTS`.
static YOU_HAVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\byou\s+have\s+(?:an?\s+)?([a-z][a-z-]*)").expect("Invalid you-have pattern")
});

/// Words after "you have" that are not a condition ("you have any questions").
const NON_CLINICAL_OBJECTS: &[&str] = &[
    "any", "questions", "question", "concerns", "to", "some", "more", "other", "time",
    "access", "option", "options", "the", "been", "already", "not", "no",
    "follow-up", "followup", "appointment", "appointments", "visit", "visits",
    "upcoming", "scheduled", "next",
];

/// Patient-directed clinical statements that need attribution.
static UNATTRIBUTED_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"(?i)\byou\s+are\s+(?:a\s+)?(?:diabetic|hypertensive|anemic|asthmatic|obese|immunocompromised)\b",
            "Unattributed label ('you are [medical label]')",
        ),
        (
            r"(?i)\byou(?:['’]ve|\s+have)\s+been\s+(?:diagnosed|experiencing|having|showing)\b",
            "Unattributed observation ('you have been diagnosed')",
        ),
        (
            r"(?i)\byour\s+(?:blood\s+pressure|cholesterol|glucose|sugar|levels?|count|heart\s+rate)\s+(?:is|are)\s+(?:dangerously\s+)?(?:high|low|elevated|abnormal|critical)\b",
            "Unattributed value judgment ('your [metric] is [judgment]')",
        ),
    ]
    .iter()
    .map(|(p, d)| (Regex::new(p).expect("Invalid unattributed pattern"), *d))
    .collect()
});

/// A sentence of the response with its byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Sentence<'a> {
    text: &'a str,
    offset: usize,
}

/// Abbreviations that end with a period but do not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "dr.", "mr.", "mrs.", "ms.", "prof.", "vs.", "etc.", "e.g.", "i.e.", "approx.",
];

/// Whether `prefix` ends with `abbr` as a whole word.
fn ends_with_word(prefix: &str, abbr: &str) -> bool {
    let Some(start) = prefix.len().checked_sub(abbr.len()) else {
        return false;
    };
    prefix.is_char_boundary(start)
        && prefix[start..].eq_ignore_ascii_case(abbr)
        && !prefix[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric)
}

fn ends_with_abbreviation(text: &str, period_pos: usize) -> bool {
    let prefix = &text[..=period_pos];
    if ABBREVIATIONS.iter().any(|abbr| ends_with_word(prefix, abbr)) {
        return true;
    }
    // "No. 3" numbers something; "the answer is no." ends the sentence.
    ends_with_word(prefix, "no.")
        && text[period_pos + 1..]
            .trim_start()
            .starts_with(|c: char| c.is_ascii_digit())
}

fn push_sentence<'a>(text: &'a str, from: usize, to: usize, sentences: &mut Vec<Sentence<'a>>) {
    let raw = &text[from..to];
    let trimmed = raw.trim_start();
    let lead = raw.len() - trimmed.len();
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        sentences.push(Sentence {
            text: trimmed,
            offset: from + lead,
        });
    }
}

/// Split on `.`, `!`, `?` followed by whitespace, and on newlines.
fn split_into_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' => {
                let next_is_space = chars.peek().map_or(true, |(_, n)| n.is_whitespace());
                let abbreviation = c == '.' && ends_with_abbreviation(text, i);
                (next_is_space && !abbreviation).then_some(i + 1)
            }
            _ => None,
        };

        if let Some(end) = boundary {
            push_sentence(text, start, end, &mut sentences);
            start = end;
        }
    }
    push_sentence(text, start, text.len(), &mut sentences);

    sentences
}

fn is_attributed(sentence: &str) -> bool {
    ATTRIBUTION_PATTERNS.iter().any(|p| p.is_match(sentence))
}

/// Patient-directed clinical claims in sentences with no attribution to the
/// report. At most one signal per sentence and pattern.
pub fn check_attribution(text: &str) -> Vec<Signal> {
    let mut signals = Vec::new();

    for sentence in split_into_sentences(text) {
        if is_attributed(sentence.text) {
            continue;
        }

        if let Some(caps) = YOU_HAVE.captures(sentence.text) {
            let object = caps[1].to_lowercase();
            if !NON_CLINICAL_OBJECTS.contains(&object.as_str()) {
                if let Some(mat) = caps.get(0) {
                    signals.push(Signal {
                        flag: SafetyFlag::UnsupportedClaim,
                        matched_text: mat.as_str().to_string(),
                        offset: sentence.offset + mat.start(),
                        description: "Unattributed diagnosis ('you have [condition]')"
                            .to_string(),
                    });
                }
            }
        }

        for (regex, description) in UNATTRIBUTED_PATTERNS.iter() {
            if let Some(mat) = regex.find(sentence.text) {
                signals.push(Signal {
                    flag: SafetyFlag::UnsupportedClaim,
                    matched_text: mat.as_str().to_string(),
                    offset: sentence.offset + mat.start(),
                    description: description.to_string(),
                });
            }
        }
    }

    signals
}
