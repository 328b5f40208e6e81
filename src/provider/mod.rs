// Translation provider boundary
//
// Each AI provider describes how to shape a chat/completion request, how to
// pull the translated text out of the response, and how long to wait when it
// answers 429. The HTTP round trip itself lives in `HttpTranslationBackend`,
// which the executor only sees through the `TranslationBackend` trait.
//
// To add a provider: implement `TranslationProvider` in a submodule and
// register its name in `ProviderFactory::create`.

pub mod anthropic;
pub mod google;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{AltError, Result};

pub const SUPPORTED_PROVIDERS: &[&str] = &["anthropic", "google", "openai"];

/// Fixed wait after an HTTP 529 "overloaded" answer, whatever the provider.
pub const OVERLOADED_BACKOFF_MS: u64 = 30_000;

/// Extra slack added on top of a provider's `retry-after` hint.
pub const RETRY_AFTER_PADDING_MS: u64 = 200;

const STATUS_OVERLOADED: u16 = 529;

/// Outbound request shape for one translation call.
#[derive(Debug, Clone)]
pub struct RequestDetails {
    pub url: String,
    pub body: Value,
    pub headers: HeaderMap,
}

/// Provider-specific request/response shaping.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Display name
    fn name(&self) -> &'static str;

    fn default_model(&self) -> &'static str;

    fn request_details(&self, model: &str, messages: &[String], api_key: &str) -> Result<RequestDetails>;

    /// Translated text from a successful response body, trimmed. Empty when
    /// the body has no usable text.
    fn get_result(&self, body: &Value) -> String;

    /// Milliseconds to wait after a 429 response; 0 when no hint is given.
    fn sleep_interval(&self, headers: &HeaderMap) -> u64;

    async fn list_models(&self, client: &Client, api_key: &str) -> Result<Vec<Value>>;
}

/// Factory for provider implementations
pub struct ProviderFactory;

impl ProviderFactory {
    /// Provider by name, case-insensitive.
    pub fn create(name: &str) -> Result<Box<dyn TranslationProvider>> {
        match name.to_lowercase().as_str() {
            "anthropic" => Ok(Box::new(anthropic::AnthropicProvider)),
            "google" => Ok(Box::new(google::GoogleProvider)),
            "openai" => Ok(Box::new(openai::OpenAiProvider)),
            _ => Err(AltError::UnknownProvider(name.to_string())),
        }
    }
}

/// `<PROVIDER>_API_KEY`
pub fn api_key_env_var(provider_name: &str) -> String {
    format!("{}_API_KEY", provider_name.to_uppercase())
}

pub fn api_key_for(provider_name: &str) -> Result<String> {
    let var = api_key_env_var(provider_name);
    match std::env::var(&var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AltError::MissingApiKey(var)),
    }
}

/// `retry-after` seconds turned into a padded millisecond wait.
pub(crate) fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs * 1000 + RETRY_AFTER_PADDING_MS)
}

/// `last_id` of a `has_more` model page, i.e. the `after` cursor for the next one.
pub(crate) fn next_page_after(page: &Value) -> Option<String> {
    if !page.get("has_more").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    page.get("last_id").and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn header_pairs(pairs: &[(&'static str, &str)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value)
            .map_err(|e| AltError::Provider(format!("Invalid value for header {}: {}", name, e)))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

/// Everything the core knows about one translation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_lang: String,
    pub target_lang: String,
    pub text: String,
    /// Per-key context from the reference table
    pub context: Option<String>,
    /// Whole-application description from configuration
    pub app_context: Option<String>,
}

/// Ordered prompt messages for a request.
pub fn build_messages(request: &TranslationRequest) -> Vec<String> {
    let src = &request.source_lang;
    let tgt = &request.target_lang;

    let mut messages = vec![format!(
        "You are a professional translator for an application's text from {} to {}. \
         Translate the text accurately without adding explanations or additional content. \
         Only return the text.",
        src, tgt
    )];

    if let Some(app_context) = request.app_context.as_deref().filter(|c| !c.is_empty()) {
        messages.push(format!(
            "Here is some high-level information about the application you are translating text for: {}",
            app_context
        ));
    }

    if let Some(context) = request.context.as_deref().filter(|c| !c.is_empty()) {
        messages.push(format!(
            "Here is some additional context for the string you are going to translate: {}",
            context
        ));
    }

    messages.push(format!(
        "Here we go. Translate the following text from {} to {}:\n\n{}",
        src, tgt, request.text
    ));

    messages
}

/// Result of a single provider attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Translated(String),
    /// Transient; wait `backoff_ms` before the next attempt
    RateLimited { backoff_ms: u64 },
    /// Network, HTTP, parse or empty-result failure
    Failed(String),
}

/// What the executor calls for each attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn name(&self) -> String;

    async fn translate(&self, request: &TranslationRequest) -> ProviderOutcome;
}

/// Outcome implied by a response status alone; `None` when the body should
/// be read for a translation.
///
/// 429 defers to the provider's `sleep_interval`, 529 always waits
/// [`OVERLOADED_BACKOFF_MS`], any other non-success status fails.
pub(crate) fn classify_status(
    provider: &dyn TranslationProvider,
    status: StatusCode,
    headers: &HeaderMap,
) -> Option<ProviderOutcome> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let backoff_ms = provider.sleep_interval(headers);
        debug!("{} rate limited; suggested wait {} ms", provider.name(), backoff_ms);
        return Some(ProviderOutcome::RateLimited { backoff_ms });
    }
    if status.as_u16() == STATUS_OVERLOADED {
        debug!("{} overloaded", provider.name());
        return Some(ProviderOutcome::RateLimited {
            backoff_ms: OVERLOADED_BACKOFF_MS,
        });
    }
    if !status.is_success() {
        return Some(ProviderOutcome::Failed(format!("{} API error {}", provider.name(), status)));
    }
    None
}

/// Backend talking to a real provider over HTTP.
pub struct HttpTranslationBackend {
    client: Client,
    provider: Box<dyn TranslationProvider>,
    api_key: String,
    model: String,
}

impl HttpTranslationBackend {
    pub fn new(provider: Box<dyn TranslationProvider>, api_key: String, model: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(300)).build()?;
        let model = model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self {
            client,
            provider,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    fn name(&self) -> String {
        self.provider.name().to_string()
    }

    async fn translate(&self, request: &TranslationRequest) -> ProviderOutcome {
        let messages = build_messages(request);
        trace!("messages: {:?}", messages);

        let details = match self.provider.request_details(&self.model, &messages, &self.api_key) {
            Ok(details) => details,
            Err(e) => return ProviderOutcome::Failed(e.to_string()),
        };

        debug!("Sending translation request to {} ({})", self.provider.name(), self.model);

        let response = match self
            .client
            .post(&details.url)
            .headers(details.headers)
            .json(&details.body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ProviderOutcome::Failed(format!("HTTP request failed: {}", e)),
        };

        let status = response.status();
        if let Some(outcome) = classify_status(self.provider.as_ref(), status, response.headers()) {
            return match outcome {
                ProviderOutcome::Failed(message) => {
                    let error_text = response.text().await.unwrap_or_default();
                    ProviderOutcome::Failed(format!("{}: {}", message, error_text))
                }
                other => other,
            };
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return ProviderOutcome::Failed(format!("Failed to parse response: {}", e)),
        };
        trace!("response body: {}", body);

        let text = self.provider.get_result(&body);
        if text.is_empty() {
            warn!("Empty translation received from {}", self.provider.name());
            return ProviderOutcome::Failed("Empty translation received".to_string());
        }

        ProviderOutcome::Translated(text)
    }
}

/// Models offered by the named provider, using its `<PROVIDER>_API_KEY`.
pub async fn list_models(provider_name: &str) -> Result<Vec<Value>> {
    let provider = ProviderFactory::create(provider_name)?;
    let api_key = api_key_for(provider_name)?;
    let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
    debug!("Listing {} models", provider.name());
    provider.list_models(&client, &api_key).await
}

/// Model identifiers for display: `id`, then `name`, else the raw object.
pub fn model_display_names(models: &[Value]) -> Vec<String> {
    models
        .iter()
        .map(|m| {
            m.get("id")
                .or_else(|| m.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| m.to_string())
        })
        .collect()
}
