use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrApiError {
    #[error("No image file provided")]
    NoImageProvided,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("File type not allowed")]
    FileTypeNotAllowed,

    #[error("Invalid file content")]
    InvalidFileContent { detected: String },

    #[error("File too large")]
    PayloadTooLarge,

    #[error("Processing timeout")]
    ProcessingTimeout { elapsed_secs: f64 },

    #[error("Too many requests: {limit}")]
    RateLimited { limit: String, retry_after_secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl OcrApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            OcrApiError::NoImageProvided
            | OcrApiError::NoSelectedFile
            | OcrApiError::FileTypeNotAllowed
            | OcrApiError::InvalidFileContent { .. } => StatusCode::BAD_REQUEST,
            OcrApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            OcrApiError::ProcessingTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            OcrApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            OcrApiError::Io(_)
            | OcrApiError::Image(_)
            | OcrApiError::Ocr(_)
            | OcrApiError::OcrUnavailable(_)
            | OcrApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field. Server-side faults collapse into
    /// one generic message; the cause only goes to the log.
    pub fn client_message(&self) -> String {
        if self.status().is_server_error() {
            "Processing failed".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for OcrApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = ?self, "Request rejected");
        }

        let body = Json(json!({ "error": self.client_message() }));
        let mut response = (status, body).into_response();

        if let OcrApiError::RateLimited {
            retry_after_secs, ..
        } = &self
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, OcrApiError>;
