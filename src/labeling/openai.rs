//! OpenAI-compatible structured-completion labeler.

use async_trait::async_trait;
use reqwest::Client;
use schemars::generate::SchemaSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LabelingConfig;
use crate::error::{LabelingError, Result};

use super::{ClusterLabeler, LabelRequest, LabelResponse};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Each cluster below is a group of \
incident reports. Write a very short title (5 words maximum) that summarizes each cluster \
collectively. Usually, you would include the product name that most correlates to those \
incident reports. Return exactly one entry per cluster, in the same order, with the cluster's \
text entries copied unchanged.";

/// Labeler backed by an OpenAI-compatible chat completions API.
pub struct OpenAiLabeler {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    description: &'static str,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenAI error response format.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// JSON schema of [`LabelResponse`] in the form strict structured outputs
/// accept: subschemas inlined, no `$schema`/`title` keys.
pub fn response_schema() -> std::result::Result<serde_json::Value, serde_json::Error> {
    let generator = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<LabelResponse>();

    let mut value = serde_json::to_value(&schema)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    Ok(value)
}

impl OpenAiLabeler {
    /// Create a labeler from configuration.
    pub fn from_config(config: &LabelingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or(LabelingError::MissingApiKey)?;

        Self::new(&config.base_url, &config.model, &api_key, config.timeout_secs)
    }

    /// Create a labeler with explicit parameters.
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LabelingError::Unreachable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        })
    }

    fn build_request(&self, request: &LabelRequest) -> Result<ChatRequest<'_>> {
        let clusters_json = serde_json::to_string(&request.clusters)?;

        Ok(ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Classify the following clusters:\n{}", clusters_json),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "ticket_response",
                    description: "Clustered ticket descriptions",
                    schema: response_schema()?,
                    strict: true,
                },
            },
            temperature: 0.0,
        })
    }

    async fn request_labels(&self, request: &LabelRequest) -> Result<LabelResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request(request)?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LabelingError::Timeout(self.timeout_secs * 1000)
                } else if e.is_connect() {
                    LabelingError::Unreachable(format!("Connection failed: {}", e))
                } else {
                    LabelingError::Unreachable(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error.message)
                .unwrap_or(error_text);
            return Err(LabelingError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            LabelingError::MalformedResponse(format!("Failed to parse completion: {}", e))
        })?;

        Ok(parse_completion(completion)?)
    }
}

fn parse_completion(completion: ChatResponse) -> std::result::Result<LabelResponse, LabelingError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| LabelingError::MalformedResponse("no choices in response".to_string()))?;

    if let Some(refusal) = message.refusal {
        return Err(LabelingError::MalformedResponse(format!("model refused: {}", refusal)));
    }

    let content = message
        .content
        .ok_or_else(|| LabelingError::MalformedResponse("completion has no content".to_string()))?;

    LabelResponse::decode(&content)
}

#[async_trait]
impl ClusterLabeler for OpenAiLabeler {
    async fn label(&self, request: &LabelRequest) -> Result<LabelResponse> {
        tracing::debug!(model = %self.model, clusters = request.clusters.len(), "requesting cluster labels");
        self.request_labels(request).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeler() -> OpenAiLabeler {
        OpenAiLabeler::new("https://api.openai.com/v1/", "gpt-4o-2024-08-06", "test-key", 30).unwrap()
    }

    #[test]
    fn test_base_url_normalization() {
        assert!(!labeler().base_url.ends_with('/'));
    }

    #[test]
    fn test_from_config_with_api_key() {
        let config = LabelingConfig {
            api_key: Some("test-key".to_string()),
            ..LabelingConfig::default()
        };

        let labeler = OpenAiLabeler::from_config(&config).unwrap();
        assert_eq!(labeler.name(), "openai");
        assert_eq!(labeler.model, "gpt-4o-2024-08-06");
    }

    #[test]
    fn test_schema_is_strict_and_inlined() {
        let schema = response_schema().unwrap();
        let text = schema.to_string();

        assert!(!text.contains("$ref"));
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));

        let entry = &schema["properties"]["clusters"]["items"];
        assert_eq!(entry["additionalProperties"], serde_json::json!(false));
        assert!(entry["properties"].get("description").is_some());
        assert!(entry["properties"].get("text_entries").is_some());
    }

    #[test]
    fn test_build_request_embeds_clusters() {
        let labeler = labeler();
        let request = LabelRequest::new(vec![vec!["vpn down".to_string()], vec![]]);

        let body = serde_json::to_value(labeler.build_request(&request).unwrap()).unwrap();

        assert_eq!(body["model"], "gpt-4o-2024-08-06");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(
            body["messages"][1]["content"],
            "Classify the following clusters:\n[[\"vpn down\"],[]]"
        );
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_parse_completion() {
        let completion: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"clusters\":[{\"description\":\"VPN\",\"text_entries\":[\"vpn down\"]}]}"
                }
            }]
        }))
        .unwrap();

        let response = parse_completion(completion).unwrap();
        assert_eq!(response.clusters[0].description, "VPN");
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let completion = ChatResponse { choices: vec![] };
        assert!(matches!(
            parse_completion(completion),
            Err(LabelingError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_completion_refusal() {
        let completion: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{ "message": { "content": null, "refusal": "cannot help" } }]
        }))
        .unwrap();

        let err = parse_completion(completion).unwrap_err();
        assert!(err.to_string().contains("cannot help"));
    }

    // Run with: OPENAI_API_KEY=xxx cargo test test_openai_labeling_integration -- --ignored
    #[tokio::test]
    #[ignore = "requires API key"]
    async fn test_openai_labeling_integration() {
        let labeler = OpenAiLabeler::from_config(&LabelingConfig::default()).unwrap();
        let request = LabelRequest::new(vec![
            vec!["apple".into(), "banana".into(), "orange".into()],
            vec!["dog".into(), "cat".into(), "hamster".into()],
            vec!["car".into(), "bus".into(), "train".into()],
        ]);

        let response = labeler.label(&request).await.unwrap();
        assert_eq!(response.clusters.len(), 3);
    }
}
