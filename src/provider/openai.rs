use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{header_pairs, next_page_after, retry_after_ms, RequestDetails, TranslationProvider};
use crate::error::Result;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODELS_URL: &str = "https://api.openai.com/v1/models";

pub struct OpenAiProvider;

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn default_model(&self) -> &'static str {
        "gpt-4-turbo"
    }

    /// Every message is a system instruction except the text itself.
    fn request_details(&self, model: &str, messages: &[String], api_key: &str) -> Result<RequestDetails> {
        let last = messages.len().saturating_sub(1);
        let messages: Vec<Value> = messages
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                let role = if idx == last { "user" } else { "system" };
                json!({ "role": role, "content": m })
            })
            .collect();

        let bearer = format!("Bearer {}", api_key);
        Ok(RequestDetails {
            url: COMPLETIONS_URL.to_string(),
            body: json!({
                "model": model,
                "messages": messages,
                "temperature": 0.3,
                "max_tokens": 1024,
            }),
            headers: header_pairs(&[("content-type", "application/json"), ("authorization", bearer.as_str())])?,
        })
    }

    fn get_result(&self, body: &Value) -> String {
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn sleep_interval(&self, headers: &HeaderMap) -> u64 {
        retry_after_ms(headers).unwrap_or(0)
    }

    async fn list_models(&self, client: &Client, api_key: &str) -> Result<Vec<Value>> {
        let mut models = Vec::new();
        let mut last_id: Option<String> = None;

        loop {
            let mut request = client.get(MODELS_URL).bearer_auth(api_key);
            if let Some(id) = &last_id {
                request = request.query(&[("after", id)]);
            }
            let page: Value = request.send().await?.error_for_status()?.json().await?;

            let data = page.get("data").and_then(Value::as_array).cloned().unwrap_or_default();
            if data.is_empty() {
                break;
            }
            models.extend(data);
            debug!("Fetched {} OpenAI models so far", models.len());

            last_id = next_page_after(&page);
            if last_id.is_none() {
                break;
            }
        }

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_roles_system_then_user() {
        let messages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let details = OpenAiProvider.request_details("gpt-test", &messages, "sk").unwrap();

        let roles: Vec<&str> = details.body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "system", "user"]);
        assert_eq!(details.body["temperature"], 0.3);
        assert_eq!(details.headers["authorization"], "Bearer sk");
    }

    #[test]
    fn test_get_result() {
        let body = json!({ "choices": [{ "message": { "content": " Hallo " } }] });
        assert_eq!(OpenAiProvider.get_result(&body), "Hallo");
        assert_eq!(OpenAiProvider.get_result(&json!({ "choices": [] })), "");
    }

    #[test]
    fn test_sleep_interval() {
        let mut headers = HeaderMap::new();
        assert_eq!(OpenAiProvider.sleep_interval(&headers), 0);
        headers.insert("retry-after", HeaderValue::from_static("1"));
        assert_eq!(OpenAiProvider.sleep_interval(&headers), 1200);
    }
}
