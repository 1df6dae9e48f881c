//! Prompts for the optional document summary.
//!
//! Kept in one place so unit tests can inspect them without a live provider.

/// System prompt asking for a one-sentence summary and three tags as JSON.
///
/// `{language}` is replaced with the requested output language.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You analyse text extracted from the first pages of a PDF document.

Respond with a single JSON object and nothing else:

{"summary": "<one sentence>", "suggestedTags": ["<tag>", "<tag>", "<tag>"]}

Rules:
- The summary is ONE short sentence written in {language}.
- Give exactly 3 tags, each one to three words, written in {language}.
- Do NOT wrap the JSON in markdown fences.
- Do NOT add commentary."#;

/// Build the system prompt for `language`.
pub fn summary_system_prompt(language: &str) -> String {
    SUMMARY_SYSTEM_PROMPT.replace("{language}", language)
}

/// Build the user message carrying the text sample.
pub fn summary_user_message(text: &str) -> String {
    format!("Text extracted from the PDF:\n\n\"\"\"{}\"\"\"", text)
}
