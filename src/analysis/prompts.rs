//! Prompt assembly for the analysis capabilities.
//!
//! Each prompt is self-contained: the oracle keeps no conversation state between calls,
//! so everything the model needs rides along in the prompt text. Document text is
//! truncated to a bounded prefix before prompting so a large upload cannot blow the
//! model's context window.

/// Maximum number of document characters included in a prompt.
pub(crate) const PROMPT_TEXT_BUDGET: usize = 4000;

/// Truncate document text to the prompt budget on a character boundary.
pub(crate) fn clip(text: &str) -> &str {
    match text.char_indices().nth(PROMPT_TEXT_BUDGET) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn language_note(language: &str) -> String {
    if language.eq_ignore_ascii_case("english") {
        String::new()
    } else {
        format!("\nIMPORTANT: Respond entirely in {language}.")
    }
}

pub(crate) fn detect_language(text: &str) -> String {
    format!(
        "Identify the language the following document is written in.\n\
         Answer with the English name of the language only, e.g. \"English\" or \"German\".\n\n\
         Document:\n{}\n\nLanguage:",
        clip(text)
    )
}

pub(crate) fn summarize(text: &str, language: &str) -> String {
    format!(
        "Summarize the following document concisely in 3-5 sentences.\n\
         Focus on the main purpose, key parties involved, and core terms.{}\n\n\
         Document:\n{}\n\nSummary:",
        language_note(language),
        clip(text)
    )
}

pub(crate) fn extract_key_info(text: &str, language: &str) -> String {
    format!(
        "Extract the following key information from this document.\n\
         Return as a structured list:\n\n\
         - Document Type:\n\
         - Parties Involved:\n\
         - Key Dates:\n\
         - Financial Amounts:\n\
         - Key Clauses/Terms:\n\
         - Obligations:\n\
         - Duration/Validity:\n{}\n\
         Document:\n{}\n\nExtracted Information:",
        language_note(language),
        clip(text)
    )
}

pub(crate) fn flag_risks(text: &str, language: &str) -> String {
    format!(
        "Analyze this document for potential risks and issues.\n\
         Identify and list:\n\n\
         HIGH RISK - Critical issues that need immediate attention\n\
         MEDIUM RISK - Issues that should be reviewed carefully\n\
         LOW RISK - Minor concerns or suggestions\n\
         MISSING - Important sections or clauses that are absent\n{}\n\
         Document:\n{}\n\nRisk Analysis:",
        language_note(language),
        clip(text)
    )
}

pub(crate) fn score_risk(filename: &str, summary: &str, risks: &str) -> String {
    format!(
        "You are scoring the overall risk of a document on a 0-100 scale.\n\
         First reason about what kind of document this is: a simple certificate or \
         receipt carries almost no risk and scores near 0; an incomplete or one-sided \
         contract scores high.\n\
         Respond with JSON only: {{\"score\": <integer 0-100>, \"reasoning\": \"<one or two sentences>\"}}\n\n\
         Document: {filename}\n\nSummary:\n{summary}\n\nRisk Analysis:\n{risks}\n\nJSON:"
    )
}

pub(crate) fn generate_report(
    summary: &str,
    key_info: &str,
    risks: &str,
    risk_score: u8,
    filename: &str,
    language: &str,
) -> String {
    format!(
        "Create a professional document analysis report based on the following:\n\n\
         SUMMARY:\n{summary}\n\n\
         KEY INFORMATION:\n{key_info}\n\n\
         RISK ANALYSIS:\n{risks}\n\n\
         RISK SCORE: {risk_score}/100\n\n\
         Format as a clean, professional report with clear sections.{}\n\
         Document: {filename}\n\nReport:",
        language_note(language)
    )
}

pub(crate) fn generate_questions(text: &str, language: &str) -> String {
    format!(
        "Suggest up to 5 short questions a careful reviewer should ask about this document.\n\
         Respond with a JSON array of strings only.{}\n\n\
         Document:\n{}\n\nJSON:",
        language_note(language),
        clip(text)
    )
}

pub(crate) fn answer_question(question: &str, context: &str, language: &str) -> String {
    format!(
        "Answer the question using ONLY the document sections below.\n\
         If the sections do not contain the answer, say so. When you infer something \
         that is not stated literally, make the inference explicit.{}\n\n\
         Document sections:\n{context}\n\nQuestion: {question}\n\nAnswer:",
        language_note(language)
    )
}
