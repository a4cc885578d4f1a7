//! HTTP client for the job/application CRUD and auth API.

use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::value_as_id;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            BackendError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        match e.status() {
            Some(401) => AppError::Unauthorized,
            Some(403) => AppError::Forbidden,
            Some(404) => AppError::NotFound(e.message()),
            _ => AppError::Upstream(e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.into(),
        })
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        info!("Sending {} request to {}", method, url);

        let request = self.client.request(method, url);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, BackendError> {
        let res = request.send().await?;
        let status = res.status();
        let body = res.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| BackendError::Shape(e.to_string()));
        }

        error!("Error response: status={}, body={}", status, body);
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);

        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn post<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        let request = self.request(Method::POST, path, token).json(body);
        self.send(request).await
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, BackendError> {
        let request = self.request(Method::GET, path, token);
        self.send(request).await
    }

    // ── Auth ────────────────────────────────────────────────────────────────

    /// POST /api/auth/check-email → `{ available }`.
    pub async fn check_email(&self, email: &str) -> Result<bool, BackendError> {
        let body = self
            .post("/api/auth/check-email", &json!({ "email": email }), None)
            .await?;
        body.get("available")
            .and_then(Value::as_bool)
            .ok_or_else(|| BackendError::Shape("check-email response missing 'available'".into()))
    }

    /// POST /api/auth/register. Returns the created user id when the backend reports one.
    pub async fn register(&self, payload: &Value) -> Result<Option<String>, BackendError> {
        let body = self.post("/api/auth/register", payload, None).await?;
        Ok(body
            .pointer("/user/id")
            .or_else(|| body.pointer("/user/_id"))
            .and_then(value_as_id))
    }

    /// POST /api/auth/login → session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, BackendError> {
        let body = self
            .post(
                "/api/auth/login",
                &json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BackendError::Shape("login response missing 'token'".into()))
    }

    // ── Jobs & applications ─────────────────────────────────────────────────

    /// GET /api/jobs/{id}. Unwraps a `{ job }` or `{ data }` envelope.
    pub async fn get_job(&self, job_id: &str, token: Option<&str>) -> Result<Value, BackendError> {
        let body = self.get(&format!("/api/jobs/{job_id}"), token).await?;
        Ok(unwrap_envelope(body, &["job", "data"]))
    }

    /// GET /api/applications?jobId={id}. Always yields an array.
    pub async fn list_applications(
        &self,
        job_id: &str,
        token: Option<&str>,
    ) -> Result<Vec<Value>, BackendError> {
        let body = self
            .get(&format!("/api/applications?jobId={job_id}"), token)
            .await?;
        match unwrap_envelope(body, &["applications", "data"]) {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(BackendError::Shape(format!(
                "expected an application list, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// PATCH /api/applications/{id} with `{ status }`.
    pub async fn update_application_status(
        &self,
        application_id: &str,
        status: &str,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        let request = self
            .request(
                Method::PATCH,
                &format!("/api/applications/{application_id}"),
                token,
            )
            .json(&json!({ "status": status }));
        self.send(request).await
    }
}

/// Bearer token from an incoming request, forwarded as-is to the backend.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Returns the first present envelope field, or the body itself.
fn unwrap_envelope(body: Value, keys: &[&str]) -> Value {
    for key in keys {
        if let Some(inner) = body.get(*key) {
            if !inner.is_null() {
                return inner.clone();
            }
        }
    }
    body
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
