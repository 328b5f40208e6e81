use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{header_pairs, next_page_after, retry_after_ms, RequestDetails, TranslationProvider};
use crate::error::Result;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const MODELS_URL: &str = "https://api.anthropic.com/v1/models";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider;

#[async_trait]
impl TranslationProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn default_model(&self) -> &'static str {
        "claude-3-7-sonnet-20250219"
    }

    fn request_details(&self, model: &str, messages: &[String], api_key: &str) -> Result<RequestDetails> {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": "user", "content": m }))
            .collect();

        Ok(RequestDetails {
            url: MESSAGES_URL.to_string(),
            body: json!({
                "model": model,
                "max_tokens": 1024,
                "messages": messages,
            }),
            headers: header_pairs(&[
                ("content-type", "application/json"),
                ("x-api-key", api_key),
                ("anthropic-version", API_VERSION),
            ])?,
        })
    }

    fn get_result(&self, body: &Value) -> String {
        body.pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn sleep_interval(&self, headers: &HeaderMap) -> u64 {
        let should_retry = headers
            .get("x-should-retry")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "true");
        if !should_retry {
            return 0;
        }
        retry_after_ms(headers).unwrap_or(0)
    }

    async fn list_models(&self, client: &Client, api_key: &str) -> Result<Vec<Value>> {
        let headers = header_pairs(&[("x-api-key", api_key), ("anthropic-version", API_VERSION)])?;
        let mut models = Vec::new();
        let mut last_id: Option<String> = None;

        loop {
            let mut request = client.get(MODELS_URL).headers(headers.clone());
            if let Some(id) = &last_id {
                request = request.query(&[("after", id)]);
            }
            let page: Value = request.send().await?.error_for_status()?.json().await?;

            let data = page.get("data").and_then(Value::as_array).cloned().unwrap_or_default();
            if data.is_empty() {
                break;
            }
            models.extend(data);
            debug!("Fetched {} Anthropic models so far", models.len());

            last_id = next_page_after(&page);
            if last_id.is_none() {
                break;
            }
        }

        Ok(models)
    }
}
