//! OpenAI-compatible chat-completions client for page extraction.
//!
//! The browser backend optionally hands rendered page text plus extraction
//! instructions to one of three providers, all of which speak the same
//! chat-completions dialect. Which provider runs, with which model and at
//! which price per million tokens, is resolved from the environment at
//! startup (see `config`). One attempt per call; retrying a flaky provider
//! is the caller's business, not this client's.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// The supported extraction providers.
///
/// An unrecognized provider name falls back to `OpenAi`, matching the
/// permissive selection the pipeline has always had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    DeepSeek,
    Grok,
    OpenAi,
}

impl Provider {
    pub fn from_name(name: &str) -> Provider {
        match name.trim().to_lowercase().as_str() {
            "deepseek" => Provider::DeepSeek,
            "grok" => Provider::Grok,
            _ => Provider::OpenAi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek",
            Provider::Grok => "grok",
            Provider::OpenAi => "openai",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "https://api.deepseek.com",
            Provider::Grok => "https://api.x.ai",
            Provider::OpenAi => "https://api.openai.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek-chat",
            Provider::Grok => "grok-3-mini",
            Provider::OpenAi => "gpt-5-nano",
        }
    }

    /// Default input price in USD per million tokens, overridable via the
    /// matching `*_COST_PER_M` environment variable.
    pub fn default_price_per_million(&self) -> f64 {
        match self {
            Provider::DeepSeek => 0.14,
            Provider::Grok => 0.10,
            Provider::OpenAi => 0.50,
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::Grok => "GROK_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn model_var(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "DEEPSEEK_MODEL",
            Provider::Grok => "GROK_MODEL",
            Provider::OpenAi => "OPENAI_MODEL",
        }
    }

    pub fn price_var(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "DEEPSEEK_COST_PER_M",
            Provider::Grok => "GROK_COST_PER_M",
            Provider::OpenAi => "OPENAI_NANO_COST_PER_M",
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client bound to one provider, model, and price.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    provider: Provider,
    api_key: String,
    model: String,
    pub price_per_million: f64,
}

impl LlmClient {
    pub fn new(provider: Provider, api_key: String, model: String, price_per_million: f64) -> Self {
        LlmClient {
            client: reqwest::Client::new(),
            provider,
            api_key,
            model,
            price_per_million,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the provider to apply `instructions` to `content` and return its
    /// raw reply text. The reply is expected (not guaranteed) to be a JSON
    /// object; callers parse with [`parse_structured`] and degrade on
    /// mismatch.
    #[instrument(level = "debug", skip_all, fields(provider = self.provider.as_str(), model = %self.model))]
    pub async fn extract(&self, instructions: &str, content: &str) -> Result<String, Box<dyn Error>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            temperature: 0.0,
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.provider.base_url()))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(120))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, elapsed_ms = t0.elapsed().as_millis() as u128, "chat completion failed");
            return Err(format!("{} API returned {}: {}", self.provider.as_str(), status, body).into());
        }

        let parsed: ChatResponse = response.json().await?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or("chat completion returned no choices")?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u128,
            bytes = reply.len(),
            "chat completion succeeded"
        );
        Ok(reply)
    }
}

/// Parse a model reply as a structured JSON object.
///
/// Tolerates markdown code fences around the object. Returns `None` for
/// anything that does not parse to a JSON object; the caller keeps the raw
/// page text and records the extraction as absent.
pub fn parse_structured(reply: &str) -> Option<serde_json::Value> {
    let trimmed = reply.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);
    match serde_json::from_str::<serde_json::Value>(unfenced) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_name() {
        assert_eq!(Provider::from_name("deepseek"), Provider::DeepSeek);
        assert_eq!(Provider::from_name("GROK"), Provider::Grok);
        assert_eq!(Provider::from_name("openai"), Provider::OpenAi);
        // Unknown names fall back to the OpenAI-compatible default.
        assert_eq!(Provider::from_name("mystery"), Provider::OpenAi);
    }

    #[test]
    fn test_provider_defaults() {
        assert_eq!(Provider::DeepSeek.default_model(), "deepseek-chat");
        assert!((Provider::DeepSeek.default_price_per_million() - 0.14).abs() < 1e-12);
        assert!((Provider::Grok.default_price_per_million() - 0.10).abs() < 1e-12);
        assert!((Provider::OpenAi.default_price_per_million() - 0.50).abs() < 1e-12);
    }

    #[test]
    fn test_parse_structured_plain_object() {
        let value = parse_structured(r#"{"company_description": "Makes anvils"}"#).unwrap();
        assert_eq!(value["company_description"], "Makes anvils");
    }

    #[test]
    fn test_parse_structured_fenced_object() {
        let reply = "```json\n{\"products_services\": [\"anvils\"]}\n```";
        let value = parse_structured(reply).unwrap();
        assert!(value["products_services"].is_array());
    }

    #[test]
    fn test_parse_structured_rejects_non_objects() {
        assert!(parse_structured("not json at all").is_none());
        assert!(parse_structured("[1, 2, 3]").is_none());
        assert!(parse_structured("").is_none());
    }

    #[test]
    fn test_chat_response_deserializes() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{}");
    }
}
