use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("No directions API credential configured")]
    MissingCredential,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Response is missing {0}")]
    MissingField(&'static str),

    #[error("Request was canceled")]
    Canceled,
}

/// The coarse failure categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    MissingCredential,
    NetworkError,
    MalformedResponse,
    Canceled,
}

impl DirectionsError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            DirectionsError::MissingCredential => FetchErrorKind::MissingCredential,
            DirectionsError::Request(_) | DirectionsError::Api { .. } => {
                FetchErrorKind::NetworkError
            }
            DirectionsError::Deserialize(_) | DirectionsError::MissingField(_) => {
                FetchErrorKind::MalformedResponse
            }
            DirectionsError::Canceled => FetchErrorKind::Canceled,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, DirectionsError::Canceled)
    }
}

// openrouteservice error envelope: {"error": {"code": 2010, "message": "..."}}
#[derive(Deserialize, Debug)]
pub(crate) struct OrsErrorDetail {
    pub code: u32,
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct OrsErrorPayload {
    pub error: OrsErrorDetail,
}
