use thiserror::Error;

/// Errors raised by process engine adapters.
///
/// Classified by HTTP status so services can decide how to react without
/// knowing about the transport.
#[derive(Debug, Error)]
pub enum EngineError {
    /// 400: the engine refused the request; carries the engine's message if any
    #[error("Client error: {}", .message.as_deref().unwrap_or("no message"))]
    ClientError { message: Option<String> },

    /// 401, 403
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// 409
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-2xx status
    #[error("Server error (HTTP {status}): {body}")]
    ServerError { status: u16, body: String },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Create error from HTTP status code and response body
    ///
    /// - 400: client error, message taken from a `{"message": ...}` body or the raw text
    /// - 401, 403: unauthorized
    /// - 404: not found
    /// - 409: conflict
    /// - Other: server error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => EngineError::ClientError {
                message: extract_message(&body),
            },
            401 | 403 => EngineError::Unauthorized(body),
            404 => EngineError::NotFound(body),
            409 => EngineError::Conflict(extract_message(&body).unwrap_or(body)),
            _ => EngineError::ServerError { status, body },
        }
    }

    /// Human-readable message from the engine, when it sent one.
    pub fn message(&self) -> Option<&str> {
        match self {
            EngineError::ClientError { message } => message.as_deref(),
            EngineError::Unauthorized(m) | EngineError::NotFound(m) | EngineError::Conflict(m) => {
                Some(m.as_str())
            }
            EngineError::ServerError { body, .. } => Some(body.as_str()),
            EngineError::Network(_)
            | EngineError::InvalidRequest(_)
            | EngineError::InvalidResponse(_) => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, EngineError::ClientError { .. })
    }
}

/// Pull a message out of an error body: `message` or `error` field of a JSON
/// object, else the trimmed text itself. Blank bodies yield `None`.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return ["message", "error"]
            .iter()
            .find_map(|field| map.get(*field).and_then(|v| v.as_str()))
            .map(str::to_string)
            .filter(|m| !m.trim().is_empty());
    }
    Some(trimmed.to_string())
}
