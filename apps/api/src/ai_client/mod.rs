/// AI client. The single point of entry for every call to the AI services:
/// mock-interview question generation and analysis, job-description parsing,
/// candidate shortlisting and the resume RAG service.
///
/// No other module may reach the AI services directly.
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

pub const GENERATE_QUESTION_PATH: &str = "/api/mock-interview/generate-question";
pub const ANALYZE_INTERVIEW_PATH: &str = "/api/mock-interview/analyze";
pub const PARSE_JOB_DESCRIPTION_PATH: &str = "/api/parse-job-description";
pub const SHORTLIST_PATH: &str = "/api/ai/shortlist-candidates";
pub const RESUME_RAG_PATH: &str = "/api/resume-rag-python";

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Service unavailable after {retries} retries")]
    Exhausted { retries: u32 },

    #[error("AI service returned an empty body")]
    EmptyContent,
}

impl From<AiError> for AppError {
    fn from(e: AiError) -> Self {
        AppError::Ai(e.to_string())
    }
}

/// Wraps the AI services with retry logic and JSON helpers.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
}

impl AiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AiError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.into(),
        })
    }

    /// POSTs a JSON body and returns the raw response text.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, AiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<AiError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "AI call to {} attempt {} failed, retrying after {}ms...",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AiError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("AI service returned {}: {}", status, body);
                last_error = Some(AiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AiError::Api {
                    status: status.as_u16(),
                    message: error_message(&body),
                });
            }

            let text = response.text().await?;
            debug!("AI call to {} succeeded ({} bytes)", path, text.len());

            if text.trim().is_empty() {
                return Err(AiError::EmptyContent);
            }
            return Ok(text);
        }

        Err(last_error.unwrap_or(AiError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }

    /// Calls the service and deserializes the response body.
    pub async fn call_json<B, T>(&self, path: &str, body: &B) -> Result<T, AiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.call(path, body).await?;

        // Some services wrap their JSON in markdown code fences
        let text = strip_json_fences(&text);

        serde_json::from_str(text).map_err(AiError::Parse)
    }

    /// Loosely-typed variant for duck-typed responses that go through a
    /// normalization boundary before reaching handlers.
    pub async fn call_value<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, AiError> {
        self.call_json::<B, Value>(path, body).await
    }
}

/// Pulls `error` or `message` out of an error body, falling back to the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from service output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"score\": 82}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 82}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"score\": 82}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 82}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"score\": 82}  ";
        assert_eq!(strip_json_fences(input), "{\"score\": 82}");
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error":"bad job id"}"#), "bad job id");
        assert_eq!(error_message(r#"{"message":"quota"}"#), "quota");
        assert_eq!(error_message("plain text"), "plain text");
    }
}
