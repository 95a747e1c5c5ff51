use crate::input::ResolveError;
use crate::types::ErrorEnvelope;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

const APPLICATION_JSON: &str = "application/json";

/// Final result of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success(Vec<u8>),
    Unauthorized,
    NoInputProvided,
    RemoteFetchFailed,
    TranslationFailed,
}

impl RequestOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NoInputProvided | Self::RemoteFetchFailed => StatusCode::BAD_REQUEST,
            Self::TranslationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message, `None` on success.
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Success(_) => None,
            Self::Unauthorized => Some("Unauthorized"),
            Self::NoInputProvided => Some("No YAML to convert"),
            Self::RemoteFetchFailed => Some("Failed to fetch YAML from given URL"),
            Self::TranslationFailed => Some("Failed to convert YAML to JSON"),
        }
    }

    fn into_body(self) -> Vec<u8> {
        match self {
            Self::Success(body) => body,
            failure => {
                let envelope = ErrorEnvelope {
                    error: failure.error_message().unwrap_or_default(),
                };
                // A struct of one static string always serializes.
                let mut body = serde_json::to_vec(&envelope).unwrap_or_default();
                body.push(b'\n');
                body
            }
        }
    }
}

impl From<ResolveError> for RequestOutcome {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoInput => Self::NoInputProvided,
            ResolveError::Fetch(_) => Self::RemoteFetchFailed,
        }
    }
}

impl IntoResponse for RequestOutcome {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))],
            self.into_body(),
        )
            .into_response()
    }
}
