use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const JUDGE_TIMEOUT: Duration = Duration::from_secs(60);

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    #[allow(dead_code)]
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    match name {
        // Anthropic API (requires ANTHROPIC_API_KEY)
        "sonnet" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-sonnet-4-5-20250929".to_string(),
            short_name: "sonnet".to_string(),
        }),
        "opus" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-opus-4-6".to_string(),
            short_name: "opus".to_string(),
        }),
        "haiku" => Ok(ModelSpec {
            provider: ProviderKind::Anthropic,
            model_id: "claude-haiku-4-5-20251001".to_string(),
            short_name: "haiku".to_string(),
        }),
        // OpenAI (requires OPENAI_API_KEY)
        "gpt-4o" => Ok(ModelSpec {
            provider: ProviderKind::OpenAI,
            model_id: "gpt-4o".to_string(),
            short_name: "gpt-4o".to_string(),
        }),
        "gpt-5.2" | "gpt5" => Ok(ModelSpec {
            provider: ProviderKind::OpenAI,
            model_id: "gpt-5.2".to_string(),
            short_name: "gpt-5.2".to_string(),
        }),
        _ => Err(anyhow!(
            "Unknown model '{}'. Available: sonnet (default), opus, haiku, gpt-4o, gpt-5.2",
            name
        )),
    }
}

pub fn create_provider(spec: &ModelSpec) -> Result<Box<dyn AIProvider>> {
    match spec.provider {
        ProviderKind::Anthropic => {
            let provider = AnthropicProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
        ProviderKind::OpenAI => {
            let provider = OpenAIProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
    }
}

// --- Judge boundary ---

/// Everything that can go wrong on the judgment path. The scorer absorbs
/// both kinds with a neutral fallback; nothing propagates past it.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judgment call failed: {0}")]
    Api(String),
    #[error("no score found in judgment response")]
    Parse,
}

/// A parsed judgment: the 0-100 base score plus the free-text rationale.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub score: i64,
    pub text: String,
}

/// Narrow interface the scorer depends on, so fusion logic never touches
/// provider response phrasing directly.
pub trait Judge {
    fn judge(&self, prompt: &str) -> Result<Verdict, JudgeError>;
}

/// Adapts any AIProvider to the Judge interface.
pub struct ApiJudge {
    provider: Box<dyn AIProvider>,
}

impl ApiJudge {
    pub fn new(provider: Box<dyn AIProvider>) -> Self {
        Self { provider }
    }

    pub fn from_model_name(name: &str) -> Result<Self> {
        let spec = resolve_model(name)?;
        tracing::debug!(model = %spec.short_name, "judge model resolved");
        let provider = create_provider(&spec)?;
        Ok(Self::new(provider))
    }
}

impl Judge for ApiJudge {
    fn judge(&self, prompt: &str) -> Result<Verdict, JudgeError> {
        let text = self
            .provider
            .complete(prompt, 1024)
            .map_err(|e| JudgeError::Api(e.to_string()))?;
        let score = parse_score(&text).ok_or(JudgeError::Parse)?;
        Ok(Verdict { score, text })
    }
}

/// Extract the base score from free-form judgment text: the first integer
/// after a "score" marker, falling back to the first bare integer in range.
/// The result is clamped to 0-100.
pub fn parse_score(text: &str) -> Option<i64> {
    let marker = Regex::new(r"(?i)score[^0-9]{0,20}(\d{1,3})").ok()?;
    if let Some(cap) = marker.captures(text) {
        let n: i64 = cap[1].parse().ok()?;
        return Some(n.clamp(0, 100));
    }

    let bare = Regex::new(r"\b(\d{1,3})\b").ok()?;
    for cap in bare.captures_iter(text) {
        if let Ok(n) = cap[1].parse::<i64>() {
            if (0..=100).contains(&n) {
                return Some(n);
            }
        }
    }
    None
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[allow(dead_code)]
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set. Set it with: export ANTHROPIC_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::builder()
            .timeout(JUDGE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Ok(Self { api_key, model_id, client })
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model_id.clone(),
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: AnthropicResponse = response
            .json()
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("No content in Anthropic API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<OpenAIMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set. Set it with: export OPENAI_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::builder()
            .timeout(JUDGE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Ok(Self { api_key, model_id, client })
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model_id.clone(),
            max_tokens,
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: OpenAIResponse = response
            .json()
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in OpenAI API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_anthropic() {
        let spec = resolve_model("sonnet").unwrap();
        assert_eq!(spec.model_id, "claude-sonnet-4-5-20250929");
        assert!(matches!(spec.provider, ProviderKind::Anthropic));

        let spec = resolve_model("opus").unwrap();
        assert_eq!(spec.model_id, "claude-opus-4-6");

        let spec = resolve_model("haiku").unwrap();
        assert!(matches!(spec.provider, ProviderKind::Anthropic));
    }

    #[test]
    fn test_resolve_model_openai() {
        let spec = resolve_model("gpt-4o").unwrap();
        assert!(matches!(spec.provider, ProviderKind::OpenAI));

        let spec = resolve_model("gpt5").unwrap();
        assert_eq!(spec.short_name, "gpt-5.2");
    }

    #[test]
    fn test_resolve_model_unknown() {
        let result = resolve_model("gpt-3");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_score_marker_variants() {
        assert_eq!(parse_score("Score: 85"), Some(85));
        assert_eq!(parse_score("score - 60"), Some(60));
        assert_eq!(parse_score("Match Score: 72/100. Strong fit."), Some(72));
        assert_eq!(parse_score("I'd score this at 45 out of 100."), Some(45));
    }

    #[test]
    fn test_parse_score_falls_back_to_bare_integer() {
        assert_eq!(parse_score("This posting rates 65 overall."), Some(65));
    }

    #[test]
    fn test_parse_score_clamps_marker_value() {
        assert_eq!(parse_score("Score: 150"), Some(100));
    }

    #[test]
    fn test_parse_score_rejects_scoreless_text() {
        assert_eq!(parse_score("Great role, strong alignment."), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn test_anthropic_provider_requires_api_key() {
        let original = env::var("ANTHROPIC_API_KEY").ok();
        unsafe {
            env::remove_var("ANTHROPIC_API_KEY");
        }

        let result = AnthropicProvider::new("claude-sonnet-4-5-20250929".to_string());

        if let Some(val) = original {
            unsafe {
                env::set_var("ANTHROPIC_API_KEY", val);
            }
        }

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_openai_provider_requires_api_key() {
        let original = env::var("OPENAI_API_KEY").ok();
        unsafe {
            env::remove_var("OPENAI_API_KEY");
        }

        let result = OpenAIProvider::new("gpt-4o".to_string());

        if let Some(val) = original {
            unsafe {
                env::set_var("OPENAI_API_KEY", val);
            }
        }

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("OPENAI_API_KEY"));
    }

    struct CannedProvider(&'static str);

    impl AIProvider for CannedProvider {
        fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
            Ok(self.0.to_string())
        }
        fn model_name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_api_judge_parses_verdict() {
        let judge = ApiJudge::new(Box::new(CannedProvider(
            "Score: 82\nStrong industry alignment and seniority match.",
        )));
        let verdict = judge.judge("prompt").unwrap();
        assert_eq!(verdict.score, 82);
        assert!(verdict.text.contains("industry alignment"));
    }

    #[test]
    fn test_api_judge_parse_failure() {
        let judge = ApiJudge::new(Box::new(CannedProvider("no numbers here")));
        let err = judge.judge("prompt").unwrap_err();
        assert!(matches!(err, JudgeError::Parse));
    }
}
