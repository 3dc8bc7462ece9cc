//! Parsing of structured oracle responses.
//!
//! Oracles are prompted for JSON but routinely wrap it in prose or code fences. Every
//! parser here recovers what it can and reports `None` instead of failing, so the
//! capability layer can substitute its documented default.

use serde::Deserialize;

/// Maximum number of suggested questions kept from a single response.
pub(crate) const MAX_QUESTIONS: usize = 5;

#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: i64,
    #[serde(default)]
    reasoning: String,
}

/// Extract a `(score, reasoning)` pair from a generation response.
///
/// Accepts a bare JSON object, a JSON object embedded in surrounding prose, or a
/// `Score: NN` line as a last resort. The score is clamped to `[0, 100]`.
pub(crate) fn parse_risk_score(raw: &str) -> Option<(u8, String)> {
    if let Some(payload) = first_json_object::<ScorePayload>(raw) {
        return Some((clamp_score(payload.score), payload.reasoning));
    }

    // Fallback: a "score: NN" fragment anywhere in the text.
    let lower = raw.to_lowercase();
    let position = lower.find("score")?;
    let digits: String = raw[position..]
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    let score: i64 = digits.parse().ok()?;
    Some((clamp_score(score), raw.trim().to_string()))
}

/// Extract up to [`MAX_QUESTIONS`] question strings from a generation response.
///
/// Accepts a JSON string array (possibly embedded in prose) or a bulleted/numbered
/// list; returns an empty vector when nothing usable is present.
pub(crate) fn parse_questions(raw: &str) -> Vec<String> {
    if let Some(questions) = first_json_array(raw) {
        return questions
            .into_iter()
            .map(|question| question.trim().to_string())
            .filter(|question| !question.is_empty())
            .take(MAX_QUESTIONS)
            .collect();
    }

    raw.lines()
        .map(strip_list_marker)
        .filter(|line| line.ends_with('?'))
        .map(str::to_string)
        .take(MAX_QUESTIONS)
        .collect()
}

fn clamp_score(score: i64) -> u8 {
    score.clamp(0, 100) as u8
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']);
    let line = line.trim_start_matches(|c: char| c.is_ascii_digit());
    line.trim_start_matches(['.', ')']).trim()
}

/// Deserialize the first balanced `{...}` span found in `raw`.
fn first_json_object<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let span = balanced_span(raw, '{', '}')?;
    serde_json::from_str(span).ok()
}

fn first_json_array(raw: &str) -> Option<Vec<String>> {
    let span = balanced_span(raw, '[', ']')?;
    serde_json::from_str(span).ok()
}

fn balanced_span(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let mut depth = 0usize;
    for (offset, c) in raw[start..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(&raw[start..start + offset + c.len_utf8()]);
            }
        }
    }
    None
}

/// Severity levels embedded in the free-text risk narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Critical issues needing immediate attention.
    High,
    /// Issues that should be reviewed carefully.
    Medium,
    /// Minor concerns or suggestions.
    Low,
    /// Important sections or clauses that are absent.
    Missing,
}

impl Severity {
    fn tag(self) -> &'static str {
        match self {
            Self::High => "HIGH RISK",
            Self::Medium => "MEDIUM RISK",
            Self::Low => "LOW RISK",
            Self::Missing => "MISSING",
        }
    }
}

const SEVERITY_ORDER: [Severity; 4] = [
    Severity::High,
    Severity::Medium,
    Severity::Low,
    Severity::Missing,
];

/// Split a risk narrative into `(severity, section text)` pairs.
///
/// The narrative embeds severity tags as a loosely structured sub-protocol; sections
/// are cut at each tag occurrence, in document order. Text before the first tag (or a
/// narrative with no tags at all) is ignored here; consumers keep the full free text
/// alongside as the fallback rendering.
pub fn split_risk_sections(narrative: &str) -> Vec<(Severity, String)> {
    let mut markers: Vec<(usize, Severity)> = Vec::new();
    for severity in SEVERITY_ORDER {
        let mut search_from = 0;
        while let Some(found) = narrative[search_from..].find(severity.tag()) {
            let position = search_from + found;
            markers.push((position, severity));
            search_from = position + severity.tag().len();
        }
    }
    markers.sort_by_key(|(position, _)| *position);

    let mut sections = Vec::new();
    for (index, (position, severity)) in markers.iter().enumerate() {
        let body_start = position + severity.tag().len();
        let body_end = markers
            .get(index + 1)
            .map(|(next, _)| *next)
            .unwrap_or(narrative.len());
        let body = narrative[body_start..body_end]
            .trim_start_matches([':', '-', '—'])
            .trim()
            .to_string();
        if !body.is_empty() {
            sections.push((*severity, body));
        }
    }
    sections
}
