use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

/// Failure of a single HTTP exchange, before any domain interpretation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Closed set of outcomes a failed authentication step maps to.
///
/// The provider exposes nothing finer than "blocked" versus "anything else"
/// over this API.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The provider detected automated access and blocks the flow.
    /// Not retryable within the run; needs manual intervention.
    #[error("CHALLENGE_ASKED")]
    ChallengeAsked,

    /// Bad credentials, expired flow, malformed response or connectivity.
    #[error("LOGIN_FAILED")]
    LoginFailed,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, url: &str, body: &str) -> Self {
        TransportError::Status {
            status,
            url: url.to_string(),
            body: Self::truncate_body(body),
        }
    }

    pub fn invalid_response(url: &str, message: impl Into<String>) -> Self {
        TransportError::InvalidResponse {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status of the failed exchange, when the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(e) => e.status(),
            _ => None,
        }
    }
}

/// Map a failed request to its authentication error kind.
pub fn classify(err: &TransportError) -> AuthError {
    debug!(error = %err, "Authentication request failed");
    match err.status() {
        Some(StatusCode::FORBIDDEN) => AuthError::ChallengeAsked,
        _ => AuthError::LoginFailed,
    }
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        classify(&err)
    }
}
