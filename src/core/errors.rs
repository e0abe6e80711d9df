use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("AnkiConnect error: {0}")]
    Bridge(String),

    #[error("Unexpected response shape: {0}")]
    Shape(String),

    #[error("Review API refused the request: {status} {reason}")]
    Unauthorized { status: u16, reason: String },

    #[error("Task cancelled")]
    Cancelled,

    #[error("CompanionError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for CompanionError {
    fn from(error: std::io::Error) -> Self {
        CompanionError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for CompanionError {
    fn from(error: reqwest::Error) -> Self {
        CompanionError::Reqwest(Box::new(error))
    }
}
