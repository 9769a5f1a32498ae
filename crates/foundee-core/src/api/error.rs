//! Typed backend errors.

use std::fmt;

use serde_json::Value;

/// Classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 401: the credential was missing or rejected. The session is cleared.
    Unauthorized,
    /// 400: validation or conflict, e.g. binding an already-bound code.
    BadRequest,
    /// 403: the code belongs to someone else or is not bound.
    Forbidden,
    /// 404: unknown code or record.
    NotFound,
    /// Any other non-success status.
    Status,
    /// The request never produced a response.
    Transport,
    /// The response body did not match the expected shape.
    Parse,
}

impl ApiErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 409 | 422 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            _ => Self::Status,
        }
    }
}

/// A failed backend call.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status when a response was received.
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// The backend's `detail` field when present, otherwise the raw body.
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            detail: None,
        }
    }

    /// Builds an error from a non-success response.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = ApiErrorKind::from_status(status);
        let body = body.trim();
        let detail = if body.is_empty() {
            None
        } else {
            Some(extract_detail(body).unwrap_or_else(|| body.to_string()))
        };
        let message = match &detail {
            Some(detail) => format!("HTTP {status}: {detail}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind,
            status: Some(status),
            message,
            detail,
        }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Could not reach the server".to_string()
        } else {
            format!("Request failed: {err}")
        };
        Self::new(ApiErrorKind::Transport, message)
    }

    pub fn parse(err: impl fmt::Display) -> Self {
        Self::new(ApiErrorKind::Parse, format!("Unexpected response: {err}"))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Whether the error means the code already has an owner.
    pub fn is_already_bound(&self) -> bool {
        self.kind == ApiErrorKind::BadRequest
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    /// Text to show the user: the backend detail if it sent one.
    pub fn user_message(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self.message)
    }
}

/// FastAPI-style bodies carry either `{"detail": "..."}` or a list of
/// validation errors with `msg` fields.
fn extract_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
