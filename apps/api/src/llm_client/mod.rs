/// LLM Client: the single point of entry for all Gemini calls in Oput.
///
/// ARCHITECTURAL RULE: No other module may call the generation API directly.
/// All assistant replies MUST go through `LlmClient::generate_reply`, which never
/// fails: every upstream problem is turned into a user-facing reply.
///
/// Calls are not retried. A quota or network failure is reported to the student
/// in-band and the next message simply tries again.
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::chat::context::ConversationContext;
use crate::models::profile::{ConversationTurn, Role};

pub mod prompts;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for every assistant reply.
pub const MODEL: &str = "gemini-2.0-flash-exp";
const MAX_OUTPUT_TOKENS: u32 = 600;
const TEMPERATURE: f32 = 0.7;
const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;

pub const NOT_CONFIGURED_REPLY: &str = "I apologize, but the AI service is not properly configured. \
    Please check the API key configuration and try again.";
pub const QUOTA_REPLY: &str = "I apologize, but I've reached my daily request limit. \
    This is due to API quota restrictions. Please try again tomorrow, or consider upgrading your API plan for higher limits. \
    In the meantime, you can still browse opportunities manually using the search and filter features.";
pub const AUTH_REPLY: &str = "I apologize, but there's an authentication issue with the AI service. \
    Please check the API key configuration.";
pub const BAD_REQUEST_REPLY: &str = "I apologize, but there was an issue with your request. \
    Please try rephrasing your question.";
pub const UNEXPECTED_RESPONSE_REPLY: &str =
    "I apologize, but I received an unexpected response. Please try again.";
pub const CONNECTION_REPLY: &str = "I apologize, but I'm having trouble connecting to the AI service. \
    Please check your internet connection and try again.";
pub const EMPTY_REPLY: &str = "I apologize, but I encountered an error. Please try again.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Gemini API key is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// The reply shown to the student in place of a generated answer.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::NotConfigured => NOT_CONFIGURED_REPLY.to_string(),
            LlmError::Api { status: 429, .. } => QUOTA_REPLY.to_string(),
            LlmError::Api {
                status: 401 | 403, ..
            } => AUTH_REPLY.to_string(),
            LlmError::Api { status: 400, .. } => BAD_REQUEST_REPLY.to_string(),
            LlmError::Api { message, .. } if message.to_lowercase().contains("quota") => {
                QUOTA_REPLY.to_string()
            }
            LlmError::Api { message, .. } => format!(
                "I apologize, but I encountered an error: {message}. \
                 Please try again or use the manual search features."
            ),
            LlmError::Http(_) => CONNECTION_REPLY.to_string(),
            LlmError::MalformedResponse(_) => UNEXPECTED_RESPONSE_REPLY.to_string(),
            LlmError::EmptyContent => EMPTY_REPLY.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    })
    .collect()
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl LlmResponse {
    /// Text of the first part of the first candidate.
    pub fn text(&self) -> Result<&str, LlmError> {
        let content = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .ok_or_else(|| LlmError::MalformedResponse("missing candidates[0].content".into()))?;
        let text = content
            .parts
            .first()
            .and_then(|p| p.text.as_deref())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// The conversation engine used by the chat service.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("Gemini API key not found. AI responses will be limited.");
        }
        Self { client, api_key }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Produces the assistant's next reply. Never fails: upstream errors are logged
    /// and replaced by the matching advisory text.
    pub async fn generate_reply(
        &self,
        turns: &[ConversationTurn],
        context: &ConversationContext,
    ) -> String {
        let prompt = prompts::build_conversation_prompt(turns, context);
        match self.call(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                match &e {
                    LlmError::NotConfigured => debug!("Skipping LLM call: {e}"),
                    LlmError::MalformedResponse(_) | LlmError::EmptyContent => {
                        error!("Unexpected Gemini API response: {e}")
                    }
                    _ => error!("Gemini API error: {e}"),
                }
                e.user_message()
            }
        }
    }

    /// Makes a single generateContent call and returns the reply text.
    pub async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let request_body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: safety_settings(),
        };

        let response = self
            .client
            .post(format!("{GEMINI_API_BASE}/{MODEL}:generateContent"))
            .query(&[("key", api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: LlmResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        let text = parsed.text()?.to_string();

        debug!("LLM call succeeded: {} chars", text.len());
        Ok(text)
    }
}

/// Speaker label used when flattening turns into the prompt.
pub fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_map_to_distinct_replies() {
        let api = |status| LlmError::Api {
            status,
            message: "boom".to_string(),
        };
        assert_eq!(api(429).user_message(), QUOTA_REPLY);
        assert_eq!(api(401).user_message(), AUTH_REPLY);
        assert_eq!(api(403).user_message(), AUTH_REPLY);
        assert_eq!(api(400).user_message(), BAD_REQUEST_REPLY);
        assert!(api(500).user_message().contains("boom"));
    }

    #[test]
    fn test_quota_message_detected_without_429() {
        let e = LlmError::Api {
            status: 503,
            message: "Quota exceeded for project".to_string(),
        };
        assert_eq!(e.user_message(), QUOTA_REPLY);
    }

    #[test]
    fn test_response_text_from_first_candidate() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hello from Oput"}]}}]}"#;
        let parsed: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text().unwrap(), "Hello from Oput");
    }

    #[test]
    fn test_missing_candidates_is_malformed() {
        let parsed: LlmResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        let err = parsed.text().unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
        assert_eq!(err.user_message(), UNEXPECTED_RESPONSE_REPLY);
    }

    #[test]
    fn test_blank_text_is_empty_content() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#;
        let parsed: LlmResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed.text(), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: safety_settings(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 600);
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_unconfigured_client_returns_advisory() {
        let llm = LlmClient::new(Client::new(), None);
        let reply = llm
            .generate_reply(
                &[ConversationTurn::user("hello")],
                &ConversationContext::default(),
            )
            .await;
        assert_eq!(reply, NOT_CONFIGURED_REPLY);
    }
}
