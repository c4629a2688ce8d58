//! Summarizer adapter: provider abstraction behind a config-driven factory.
//! `None` from a provider means "decline to produce a draft" — content
//! policy rejection and provider outage both short-circuit draft
//! creation without error.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard cap on a published summary; anything longer is truncated.
const MAX_SUMMARY_CHARS: usize = 280;

/// Trait object used by the watch cycle (and tests).
pub trait Summarizer: Send + Sync {
    /// Turn a rendered line diff into a short announcement, or decline.
    fn summarize<'a>(
        &'a self,
        diff_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Config loaded from `config/summarizer.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    pub enabled: bool,
    /// "openai" | "claude" (claude is stubbed for now)
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            model: None,
        }
    }
}

/// Load config from `config/summarizer.json`. Reading/parsing failures
/// fall back to `SummarizerConfig::default()`.
pub fn load_summarizer_config() -> SummarizerConfig {
    let path = Path::new("config/summarizer.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => SummarizerConfig::default(),
    }
}

/// Factory: build a summarizer according to config and environment.
///
/// * If `SUMMARIZER_TEST_MODE=mock`, returns a deterministic mock.
/// * Else if `config.enabled==false`, returns a disabled summarizer.
/// * Else builds the real provider (OpenAI).
pub fn build_summarizer_from_config(config: &SummarizerConfig) -> DynSummarizer {
    if std::env::var("SUMMARIZER_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockSummarizer {
            fixed: "Page updated (mock summary).".to_string(),
        });
    }

    if !config.enabled {
        return Arc::new(DisabledSummarizer);
    }

    match config.provider.as_deref() {
        Some("openai") => Arc::new(OpenAiSummarizer::new(config.model.as_deref())),
        Some("claude") => {
            // Stub: return disabled until implemented.
            Arc::new(DisabledSummarizer)
        }
        _ => Arc::new(DisabledSummarizer),
    }
}

/// Reads config from disk and builds a summarizer.
pub fn build_summarizer() -> DynSummarizer {
    let cfg = load_summarizer_config();
    build_summarizer_from_config(&cfg)
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// OpenAI provider (Chat Completions API). Requires `OPENAI_API_KEY`.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("pagewatch/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

impl Summarizer for OpenAiSummarizer {
    fn summarize<'a>(
        &'a self,
        diff_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let sys = "You announce website updates. Given a line diff (-removed, +added), \
                       write ONE neutral sentence (<=280 chars) describing what changed. \
                       Output only the sentence.";
            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: sys,
                    },
                    Msg {
                        role: "user",
                        content: diff_text,
                    },
                ],
                temperature: 0.2,
                max_tokens: 120,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .ok()?;

            if !resp.status().is_success() {
                return None;
            }
            let body: Resp = resp.json().await.ok()?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.as_str())
                .unwrap_or("");
            let cleaned = sanitize_summary(content);
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Returns `None` always; used when summarization is disabled.
pub struct DisabledSummarizer;

impl Summarizer for DisabledSummarizer {
    fn summarize<'a>(
        &'a self,
        _diff_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic summarizer for tests/local runs.
#[derive(Clone)]
pub struct MockSummarizer {
    pub fixed: String,
}

impl Summarizer for MockSummarizer {
    fn summarize<'a>(
        &'a self,
        _diff_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let out = sanitize_summary(&self.fixed);
        Box::pin(async move { if out.is_empty() { None } else { Some(out) } })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// Single line, collapsed whitespace, capped at 280 chars.
pub fn sanitize_summary(input: &str) -> String {
    let mut out = String::with_capacity(MAX_SUMMARY_CHARS);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_control() => ' ',
            c => c,
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.chars().count() >= MAX_SUMMARY_CHARS {
            break;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_and_caps() {
        assert_eq!(sanitize_summary("  a\n\n b\t c  "), "a b c");
        let long = "x".repeat(400);
        assert_eq!(sanitize_summary(&long).chars().count(), MAX_SUMMARY_CHARS);
    }

    #[tokio::test]
    async fn disabled_summarizer_declines() {
        assert_eq!(DisabledSummarizer.summarize("+line").await, None);
    }

    #[tokio::test]
    async fn mock_summarizer_returns_fixed_text() {
        let s = MockSummarizer {
            fixed: "An update.".into(),
        };
        assert_eq!(s.summarize("+line").await.as_deref(), Some("An update."));
    }

    #[serial_test::serial]
    #[test]
    fn factory_honors_mock_mode_and_disabled_config() {
        std::env::set_var("SUMMARIZER_TEST_MODE", "mock");
        let s = build_summarizer_from_config(&SummarizerConfig::default());
        assert_eq!(s.provider_name(), "mock");
        std::env::remove_var("SUMMARIZER_TEST_MODE");

        let s = build_summarizer_from_config(&SummarizerConfig::default());
        assert_eq!(s.provider_name(), "disabled");
    }
}
