use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{header_pairs, retry_after_ms, RequestDetails, TranslationProvider};
use crate::error::Result;

const API_BASE: &str = "https://generativelanguage.googleapis.com";

pub struct GoogleProvider;

#[async_trait]
impl TranslationProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "Google"
    }

    fn default_model(&self) -> &'static str {
        "gemini-2.0-flash"
    }

    fn request_details(&self, model: &str, messages: &[String], api_key: &str) -> Result<RequestDetails> {
        let contents: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": "user", "parts": [{ "text": m }] }))
            .collect();

        Ok(RequestDetails {
            url: format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                API_BASE, model, api_key
            ),
            body: json!({ "contents": contents }),
            headers: header_pairs(&[("content-type", "application/json")])?,
        })
    }

    fn get_result(&self, body: &Value) -> String {
        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn sleep_interval(&self, headers: &HeaderMap) -> u64 {
        retry_after_ms(headers).unwrap_or(0)
    }

    async fn list_models(&self, client: &Client, api_key: &str) -> Result<Vec<Value>> {
        let url = format!("{}/v1/models", API_BASE);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = client.get(&url).query(&[("key", api_key)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: Value = request.send().await?.error_for_status()?.json().await?;

            let batch = page.get("models").and_then(Value::as_array).cloned().unwrap_or_default();
            if batch.is_empty() {
                break;
            }
            models.extend(batch);
            debug!("Fetched {} Google models so far", models.len());

            page_token = page.get("nextPageToken").and_then(Value::as_str).map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        Ok(models)
    }
}
