use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Rating must be a number between {min} and {max}")]
    InvalidRating { min: f64, max: f64 },

    #[error("Review text is required and must be at most {max_len} characters")]
    InvalidText { max_len: usize },

    #[error("Name must be at most {max_len} characters")]
    InvalidName { max_len: usize },

    #[error("A review has already been submitted from this address")]
    DuplicateSubmission,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Failed to persist reviews: {0}")]
    PersistenceFailure(String),

    #[error("Stored state at {path} is unreadable: {reason}")]
    LoadCorruption { path: String, reason: String },
}

impl ResponseError for ReviewError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::InvalidRating { .. }
            | ReviewError::InvalidText { .. }
            | ReviewError::InvalidName { .. }
            | ReviewError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            ReviewError::DuplicateSubmission => StatusCode::FORBIDDEN,
            ReviewError::PersistenceFailure(_) | ReviewError::LoadCorruption { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<std::io::Error> for ReviewError {
    fn from(err: std::io::Error) -> Self {
        ReviewError::PersistenceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(err: serde_json::Error) -> Self {
        ReviewError::PersistenceFailure(err.to_string())
    }
}
