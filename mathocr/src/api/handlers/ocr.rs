use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::error::{OcrApiError, Result};
use crate::processing::allowed_extension;

/// Name of the multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OcrResponse {
    /// Text recognised in the image.
    pub text: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

struct ImageField {
    file_name: String,
    bytes: Bytes,
}

fn map_multipart_error(error: MultipartError) -> OcrApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrApiError::PayloadTooLarge
    } else {
        debug!(error = %error, "Unreadable multipart body");
        OcrApiError::NoImageProvided
    }
}

/// First file part named `image`. Plain form values with that name do not count.
async fn read_image_field(multipart: &mut Multipart) -> Result<ImageField> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(OcrApiError::NoImageProvided),
            Err(e) => return Err(map_multipart_error(e)),
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = field.bytes().await.map_err(map_multipart_error)?;
        return Ok(ImageField { file_name, bytes });
    }
}

/// `POST /ocr`
#[utoipa::path(
    post,
    path = "/ocr",
    tag = "ocr",
    request_body(content_type = "multipart/form-data", content = String, description = "Form with a single file field `image` (png, jpg, jpeg, bmp, tiff or heic, at most 5 MiB)"),
    responses(
        (status = 200, description = "Text extracted from the image", body = OcrResponse),
        (status = 400, description = "Missing file, empty filename, disallowed extension or content", body = ErrorResponse),
        (status = 408, description = "Recognition finished after the timeout", body = ErrorResponse),
        (status = 413, description = "Request body larger than the limit", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
    )
)]
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection, "Request is not multipart");
        OcrApiError::NoImageProvided
    })?;

    let field = read_image_field(&mut multipart).await?;
    if field.file_name.is_empty() {
        return Err(OcrApiError::NoSelectedFile);
    }

    let extension = allowed_extension(&field.file_name).ok_or(OcrApiError::FileTypeNotAllowed)?;

    info!(
        file_name = %field.file_name,
        size = field.bytes.len(),
        "Processing upload"
    );

    let upload = state.uploads.persist(&field.bytes, &extension).await?;
    let text = state.pipeline.recognize(upload).await?;

    Ok(Json(OcrResponse { text }))
}
