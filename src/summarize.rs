//! Best-effort document summaries.
//!
//! After a successful conversion the caller may hand the extracted text to a
//! [`Summarizer`]. The call is fire-and-forget: [`dispatch_summary`] spawns it
//! on the Tokio runtime and returns a receiver immediately, so a conversion
//! never waits on the summary. A summarizer never fails; any provider error
//! or unparsable reply yields [`DocumentAnalysis::fallback`]. There is no
//! retry here.

use crate::error::Pdf2ImgError;
use crate::prompts::{summary_system_prompt, summary_user_message};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Only this many leading characters of the extracted text are sent.
pub const MAX_SUMMARY_INPUT_CHARS: usize = 1500;

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// A one-sentence summary plus suggested tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub summary: String,
    #[serde(alias = "suggestedTags", default)]
    pub suggested_tags: Vec<String>,
}

impl DocumentAnalysis {
    /// Substituted whenever a summary cannot be produced.
    pub fn fallback() -> Self {
        Self {
            summary: "The document could not be analysed right now.".to_string(),
            suggested_tags: Vec::new(),
        }
    }
}

/// Produces a [`DocumentAnalysis`] for a text sample. Never fails.
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, DocumentAnalysis>;
}

/// The sample actually sent for summarising, or `None` for blank text.
pub fn summary_input(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_SUMMARY_INPUT_CHARS).collect())
}

/// Spawn `summarizer` on the current Tokio runtime.
///
/// Returns `None` without spawning anything when `text` is blank. The
/// receiver resolves once the summary (or its fallback) is ready; dropping
/// it discards the result.
pub fn dispatch_summary(
    summarizer: Arc<dyn Summarizer>,
    text: &str,
) -> Option<oneshot::Receiver<DocumentAnalysis>> {
    let input = summary_input(text)?;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let analysis = summarizer.summarize(&input).await;
        if tx.send(analysis).is_err() {
            debug!("Summary receiver dropped before the summary was ready");
        }
    });
    Some(rx)
}

// ── LLM-backed summarizer ────────────────────────────────────────────────

/// [`Summarizer`] backed by any `edgequake-llm` provider.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    language: String,
    temperature: f32,
    max_tokens: usize,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            language: "English".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    /// Language for the summary and tags. Default: English.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Use a named provider (`"openai"`, `"anthropic"`, …) and model.
    pub fn with_provider(provider_name: &str, model: Option<&str>) -> Result<Self, Pdf2ImgError> {
        let model = model.unwrap_or(DEFAULT_MODEL);
        create_provider(provider_name, model).map(Self::new)
    }

    /// Pick a provider from the environment.
    ///
    /// 1. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set;
    /// 2. OpenAI when `OPENAI_API_KEY` is set (with `model` or the default);
    /// 3. whatever [`ProviderFactory::from_env`] detects.
    pub fn from_env(model: Option<&str>) -> Result<Self, Pdf2ImgError> {
        if let (Ok(prov), Ok(env_model)) = (
            std::env::var("EDGEQUAKE_LLM_PROVIDER"),
            std::env::var("EDGEQUAKE_MODEL"),
        ) {
            if !prov.is_empty() && !env_model.is_empty() {
                return create_provider(&prov, &env_model).map(Self::new);
            }
        }

        if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
            if !openai_key.is_empty() {
                return create_provider("openai", model.unwrap_or(DEFAULT_MODEL)).map(Self::new);
            }
        }

        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| Pdf2ImgError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                    Error: {}",
                    e
                ),
            })?;
        Ok(Self::new(llm_provider))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl Summarizer for LlmSummarizer {
    fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, DocumentAnalysis> {
        async move {
            let messages = vec![
                ChatMessage::system(summary_system_prompt(&self.language)),
                ChatMessage::user(summary_user_message(text)),
            ];
            match self.provider.chat(&messages, Some(&self.options())).await {
                Ok(response) => parse_analysis(&response.content).unwrap_or_else(|| {
                    warn!("Summary reply was not valid JSON; using fallback");
                    DocumentAnalysis::fallback()
                }),
                Err(e) => {
                    warn!("Summary request failed: {}", e);
                    DocumentAnalysis::fallback()
                }
            }
        }
        .boxed()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Pdf2ImgError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2ImgError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*\n(.*?)\n?```\s*$").unwrap());

/// Parse a model reply, tolerating a surrounding ```json fence.
pub fn parse_analysis(raw: &str) -> Option<DocumentAnalysis> {
    let body = match RE_JSON_FENCE.captures(raw) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => raw,
    };
    let analysis: DocumentAnalysis = serde_json::from_str(body.trim()).ok()?;
    if analysis.summary.trim().is_empty() {
        return None;
    }
    Some(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_camel_case_reply() {
        let a = parse_analysis(r#"{"summary":"A tax form.","suggestedTags":["tax","form","2024"]}"#)
            .unwrap();
        assert_eq!(a.summary, "A tax form.");
        assert_eq!(a.suggested_tags, vec!["tax", "form", "2024"]);
    }

    #[test]
    fn parses_fenced_reply() {
        let raw = "```json\n{\"summary\": \"Slides.\", \"suggested_tags\": []}\n```\n";
        assert_eq!(parse_analysis(raw).unwrap().summary, "Slides.");
    }

    #[test]
    fn rejects_garbage_and_empty_summary() {
        assert!(parse_analysis("I think this is a report.").is_none());
        assert!(parse_analysis(r#"{"summary": "  ", "suggestedTags": []}"#).is_none());
    }

    #[test]
    fn summary_input_is_char_bounded() {
        let text = "é".repeat(MAX_SUMMARY_INPUT_CHARS + 10);
        let input = summary_input(&text).unwrap();
        assert_eq!(input.chars().count(), MAX_SUMMARY_INPUT_CHARS);
        assert!(summary_input("   \n").is_none());
    }

    struct Echo;

    impl Summarizer for Echo {
        fn summarize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, DocumentAnalysis> {
            async move {
                DocumentAnalysis {
                    summary: format!("{} chars", text.chars().count()),
                    suggested_tags: vec!["echo".into()],
                }
            }
            .boxed()
        }
    }

    #[test]
    fn summarizer_future_is_awaitable_without_runtime() {
        let analysis = tokio_test::block_on(Echo.summarize("abc"));
        assert_eq!(analysis.summary, "3 chars");
        assert_eq!(analysis.suggested_tags, vec!["echo"]);
    }

    #[tokio::test]
    async fn dispatch_sends_truncated_text() {
        let long = "x".repeat(4000);
        let rx = dispatch_summary(Arc::new(Echo), &long).unwrap();
        let analysis = rx.await.unwrap();
        assert_eq!(analysis.summary, "1500 chars");
    }

    #[tokio::test]
    async fn dispatch_skips_blank_text() {
        assert!(dispatch_summary(Arc::new(Echo), "  ").is_none());
    }
}
