//! Minimal OpenAI Chat Completions client.
//!
//! This crate provides a focused client for oracle-style queries:
//! - Plain chat completions
//! - Categorical classification against a closed option set
//! - Structured extraction into a caller-supplied record type

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Errors that can occur when querying the oracle backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response ({detail}): {raw}")]
    MalformedResponse { detail: String, raw: String },

    #[error("Unrecognized option: {answer:?}")]
    UnrecognizedOption { answer: String },

    #[error("Schema violation ({detail}): {raw}")]
    SchemaViolation { detail: String, raw: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Oracle API client.
#[derive(Clone)]
pub struct Oracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl Oracle {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client from the OPENAI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send a completion request and return the full response.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let api_request = self.build_api_request(&request);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!("{API_BASE}/chat/completions"))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        let api_response: ApiResponse =
            serde_json::from_str(&raw).map_err(|e| Error::MalformedResponse {
                detail: format!("invalid completion payload: {e}"),
                raw: raw.clone(),
            })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::MalformedResponse {
                detail: "completion has no choices".to_string(),
                raw,
            })?;

        Ok(Response {
            id: api_response.id,
            model: api_response.model,
            content,
            usage: Usage {
                prompt_tokens: api_response.usage.as_ref().map_or(0, |u| u.prompt_tokens),
                completion_tokens: api_response
                    .usage
                    .as_ref()
                    .map_or(0, |u| u.completion_tokens),
            },
        })
    }

    /// Ask a closed question and return the selected option.
    ///
    /// The backend is instructed to reply with a JSON object holding a
    /// `responses` sequence; the first entry is normalized (trimmed,
    /// case-folded) and matched against `options`. A shape mismatch is a
    /// [`Error::MalformedResponse`]; an answer outside the option set is an
    /// [`Error::UnrecognizedOption`] rather than a silent default.
    pub async fn classify(&self, question: &str, options: &[&str]) -> Result<String, Error> {
        let system = "You answer closed-choice questions about your own behavior based on \
                      everything you remember. Reply with a JSON object of the form \
                      {\"responses\": [\"<option>\"]}, selecting exactly one of the offered \
                      options verbatim.";
        let user = format!("{question}\n\nOptions: {}", options.join(", "));

        let request = Request::new(vec![Message::system(system), Message::user(user)])
            .with_json_object_response();

        let response = self.complete(request).await?;
        tracing::debug!(payload = %response.content, "classification payload received");
        select_option(&response.content, options)
    }

    /// Request a structured record conforming to `T`.
    ///
    /// The backend is expected to emit a single JSON object matching the
    /// target schema described in the prompts. Missing required fields fail
    /// with [`Error::SchemaViolation`]; transport failure with
    /// [`Error::BackendUnavailable`].
    pub async fn extract<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<T, Error> {
        let request = Request::new(vec![Message::system(system), Message::user(user)])
            .with_json_object_response();

        let response = self.complete(request).await?;
        tracing::debug!(payload = %response.content, "extraction payload received");
        parse_record(&response.content)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        let messages: Vec<ApiMessage> = request
            .messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect();

        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request
                .json_object_response
                .then(|| ApiResponseFormat {
                    r#type: "json_object".to_string(),
                }),
        }
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request to send to the backend.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub json_object_response: bool,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            max_tokens: None,
            temperature: None,
            json_object_response: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Require the backend to reply with a single JSON object.
    pub fn with_json_object_response(mut self) -> Self {
        self.json_object_response = true;
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A completion response from the backend.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub model: String,
    pub content: String,
    pub usage: Usage,
}

/// Token usage information.
#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

// ============================================================================
// Payload parsing
// ============================================================================

/// Parse a classification payload and match it against the option set.
///
/// The payload must be a JSON object with a `responses` field holding a
/// non-empty sequence whose first element is a string.
fn select_option(payload: &str, options: &[&str]) -> Result<String, Error> {
    let malformed = |detail: &str| Error::MalformedResponse {
        detail: detail.to_string(),
        raw: payload.to_string(),
    };

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| malformed(&format!("payload is not JSON: {e}")))?;

    let responses = value
        .get("responses")
        .ok_or_else(|| malformed("missing `responses` field"))?;

    let list = responses
        .as_array()
        .ok_or_else(|| malformed("`responses` is not a sequence"))?;

    let first = list
        .first()
        .ok_or_else(|| malformed("`responses` is empty"))?;

    let answer = first
        .as_str()
        .ok_or_else(|| malformed("first response is not a string"))?;

    let normalized = answer.trim().to_lowercase();
    options
        .iter()
        .find(|option| option.trim().to_lowercase() == normalized)
        .map(|option| option.to_string())
        .ok_or_else(|| Error::UnrecognizedOption {
            answer: answer.trim().to_string(),
        })
}

/// Parse an extraction payload into the target record type.
fn parse_record<T: DeserializeOwned>(payload: &str) -> Result<T, Error> {
    serde_json::from_str(payload).map_err(|e| Error::SchemaViolation {
        detail: e.to_string(),
        raw: payload.to_string(),
    })
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiResponseFormat {
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: &[&str] = &["Yes", "No"];

    #[test]
    fn test_client_creation() {
        let client = Oracle::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_client_with_model() {
        let client = Oracle::new("test-key").with_model("gpt-4o-mini");
        assert_eq!(client.model, "gpt-4o-mini");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new(vec![Message::user("Hello")])
            .with_max_tokens(256)
            .with_temperature(0.7)
            .with_json_object_response();

        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.json_object_response);
    }

    #[test]
    fn test_select_option_exact() {
        let selected = select_option(r#"{"responses": ["Yes"]}"#, OPTIONS).unwrap();
        assert_eq!(selected, "Yes");
    }

    #[test]
    fn test_select_option_normalizes_whitespace_and_case() {
        let selected = select_option(r#"{"responses": ["  yEs \n"]}"#, OPTIONS).unwrap();
        // The canonical option label is returned, not the raw answer.
        assert_eq!(selected, "Yes");

        let selected = select_option(r#"{"responses": ["NO"]}"#, OPTIONS).unwrap();
        assert_eq!(selected, "No");
    }

    #[test]
    fn test_select_option_missing_responses() {
        let err = select_option(r#"{"answer": "Yes"}"#, OPTIONS).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_select_option_empty_sequence() {
        let err = select_option(r#"{"responses": []}"#, OPTIONS).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_select_option_non_string_first_element() {
        let err = select_option(r#"{"responses": [42]}"#, OPTIONS).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_select_option_not_a_sequence() {
        let err = select_option(r#"{"responses": "Yes"}"#, OPTIONS).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_select_option_not_json() {
        let err = select_option("Yes, definitely.", OPTIONS).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_select_option_unrecognized() {
        let err = select_option(r#"{"responses": ["Maybe"]}"#, OPTIONS).unwrap_err();
        match err {
            Error::UnrecognizedOption { answer } => assert_eq!(answer, "Maybe"),
            other => panic!("expected UnrecognizedOption, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_record_ok() {
        #[derive(Deserialize)]
        struct Record {
            content: String,
            importance: i64,
        }

        let record: Record =
            parse_record(r#"{"content": "be nicer", "importance": 85}"#).unwrap();
        assert_eq!(record.content, "be nicer");
        assert_eq!(record.importance, 85);
    }

    #[test]
    fn test_parse_record_missing_field() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Record {
            content: String,
            importance: i64,
        }

        let err = parse_record::<Record>(r#"{"content": "be nicer"}"#).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
    }
}
