//! Environment-sourced runtime configuration.
//!
//! All knobs come from environment-style key/value pairs (a `.env` file is
//! honored by `main`). [`Settings::from_env`] is a thin wrapper over
//! [`Settings::from_lookup`], which takes an explicit lookup function so the
//! resolution rules are testable without touching the process environment.
//!
//! A missing LLM credential only degrades the browser backend to raw-content
//! mode; a missing Firecrawl credential is fatal here, reported once, because
//! the fallback backend cannot run without it.

use std::error::Error;
use tracing::warn;

use crate::llm::{LlmClient, Provider};
use crate::proxy::ProxyPool;

/// LLM extraction configuration for the browser backend.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub price_per_million: f64,
}

impl LlmSettings {
    pub fn client(&self) -> LlmClient {
        LlmClient::new(
            self.provider,
            self.api_key.clone(),
            self.model.clone(),
            self.price_per_million,
        )
    }
}

/// Managed extraction service configuration.
#[derive(Debug, Clone)]
pub struct FirecrawlSettings {
    pub api_key: String,
    pub api_url: String,
    pub cost_per_page: f64,
}

/// Everything resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` when the selected provider has no API key configured; the
    /// browser backend then returns raw content without structured fields.
    pub llm: Option<LlmSettings>,
    pub firecrawl: FirecrawlSettings,
    pub proxy: ProxyPool,
    /// Advisory soft limit in USD; crossing 80% of it logs a warning, nothing
    /// is enforced.
    pub daily_cost_limit: f64,
}

impl Settings {
    pub fn from_env() -> Result<Settings, Box<dyn Error>> {
        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, Box<dyn Error>> {
        let provider = Provider::from_name(
            &lookup("SCRAPER_LLM_PROVIDER").unwrap_or_else(|| "deepseek".to_string()),
        );

        let llm = match nonempty(lookup(provider.api_key_var())) {
            Some(api_key) => Some(LlmSettings {
                provider,
                api_key,
                model: nonempty(lookup(provider.model_var()))
                    .unwrap_or_else(|| provider.default_model().to_string()),
                price_per_million: parse_price(
                    provider.price_var(),
                    lookup(provider.price_var()),
                    provider.default_price_per_million(),
                )?,
            }),
            None => {
                warn!(
                    provider = provider.as_str(),
                    missing = provider.api_key_var(),
                    "No API key for the selected LLM provider; browser fetches will return raw content without structured extraction"
                );
                None
            }
        };

        let firecrawl_key = nonempty(lookup("FIRECRAWL_API_KEY")).ok_or(
            "FIRECRAWL_API_KEY is not set; the fallback extraction service cannot run without it",
        )?;
        let firecrawl = FirecrawlSettings {
            api_key: firecrawl_key,
            api_url: nonempty(lookup("FIRECRAWL_API_URL"))
                .unwrap_or_else(|| "https://api.firecrawl.dev".to_string()),
            cost_per_page: parse_price(
                "FIRECRAWL_COST_PER_PAGE",
                lookup("FIRECRAWL_COST_PER_PAGE"),
                0.01,
            )?,
        };

        let proxy = load_proxy_pool(&lookup);

        let daily_cost_limit =
            parse_price("DAILY_COST_LIMIT", lookup("DAILY_COST_LIMIT"), 40.0)?;

        Ok(Settings {
            llm,
            firecrawl,
            proxy,
            daily_cost_limit,
        })
    }
}

/// Load the proxy pool from its two supported shapes.
fn load_proxy_pool(lookup: &impl Fn(&str) -> Option<String>) -> ProxyPool {
    let enabled = lookup("SCRAPER_USE_PROXY")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !enabled {
        return ProxyPool::disabled();
    }

    let proxy_type = lookup("PROXY_TYPE").unwrap_or_else(|| "single".to_string());
    match proxy_type.trim().to_lowercase().as_str() {
        "rotating" => match nonempty(lookup("ROTATING_PROXY_URL")) {
            Some(url) => ProxyPool::rotating(
                url,
                nonempty(lookup("ROTATING_PROXY_USERNAME")),
                nonempty(lookup("ROTATING_PROXY_PASSWORD")),
            ),
            None => {
                warn!("SCRAPER_USE_PROXY is true but ROTATING_PROXY_URL is unset; continuing without a proxy");
                ProxyPool::disabled()
            }
        },
        _ => match nonempty(lookup("PROXY_URL")) {
            Some(url) => ProxyPool::single(
                url,
                nonempty(lookup("PROXY_USERNAME")),
                nonempty(lookup("PROXY_PASSWORD")),
            ),
            None => {
                warn!("SCRAPER_USE_PROXY is true but PROXY_URL is unset; continuing without a proxy");
                ProxyPool::disabled()
            }
        },
    }
}

fn nonempty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_price(name: &str, raw: Option<String>, default: f64) -> Result<f64, Box<dyn Error>> {
    match nonempty(raw) {
        None => Ok(default),
        Some(text) => {
            let value: f64 = text
                .parse()
                .map_err(|_| format!("{} is not a number: {:?}", name, text))?;
            if value < 0.0 {
                return Err(format!("{} must be non-negative, got {}", name, value).into());
            }
            Ok(value)
        }
    }
}
