use async_trait::async_trait;
use reqwest::Client;

#[cfg(test)]
use mockall::automock;

use crate::config::GeminiConfig;
use crate::error::{Result, SchemaError};
use crate::models::{GeminiRequest, GeminiResponse};

/// One generateContent round trip. No retries and no timeout beyond the
/// client's own defaults.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate_content(&self, req: &GeminiRequest) -> Result<GeminiResponse>;
}

pub struct GeminiTransport {
    client: Client,
    api_key: String,
    url: String,
}

impl GeminiTransport {
    pub fn new(cfg: &GeminiConfig) -> Result<Self> {
        if cfg.model.trim().is_empty() {
            return Err(SchemaError::Config("Gemini model name is empty".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            api_key: cfg.api_key.clone(),
            url: generate_url(&cfg.endpoint, &cfg.model),
        })
    }
}

fn generate_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        endpoint.trim_end_matches('/'),
        model
    )
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate_content(&self, req: &GeminiRequest) -> Result<GeminiResponse> {
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            // Gemini wraps failures as {"error": {"message": ...}}
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(SchemaError::Upstream(format!(
                "Gemini API error ({status}): {message}"
            )));
        }

        response.json().await.map_err(|e| {
            SchemaError::Upstream(format!("Failed to parse Gemini API response: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url_joins_cleanly() {
        assert_eq!(
            generate_url("https://generativelanguage.googleapis.com/v1beta/", "gemini-3-flash-preview"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_request_body_asks_for_json() {
        let req = GeminiRequest::json_prompt("hello".to_string(), Some(0.4));
        let body = serde_json::to_value(&req).expect("request should serialize");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let cfg = GeminiConfig {
            api_key: "k".to_string(),
            model: " ".to_string(),
            endpoint: "https://example.com".to_string(),
            temperature: None,
        };
        assert!(matches!(GeminiTransport::new(&cfg), Err(SchemaError::Config(_))));
    }

    #[tokio::test]
    async fn test_gemini_transport_live() {
        // Only runs against the real API when asked to and a key is present.
        if std::env::var("SCHEMA_LIVE_TESTS").is_err() {
            return;
        }
        if let Ok(api_key) = std::env::var("GOOGLE_API_KEY") {
            let cfg = GeminiConfig {
                api_key,
                model: "gemini-3-flash-preview".to_string(),
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                temperature: Some(0.0),
            };
            let transport = match GeminiTransport::new(&cfg) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Failed to create transport in test: {e}");
                    return;
                }
            };
            let req = GeminiRequest::json_prompt(
                r#"Return {"ok": true} and nothing else."#.to_string(),
                Some(0.0),
            );
            let res = transport.generate_content(&req).await;
            assert!(res.is_ok());
        }
    }
}
