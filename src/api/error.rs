use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: the bearer token is no longer valid.
    #[error("unauthorized")]
    Unauthorized,

    #[error("API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Network(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Http { .. } => "http_error",
            ApiError::Network(_) => "network_error",
            ApiError::Decode(_) => "decode_failed",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
