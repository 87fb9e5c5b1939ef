use axum::Json;
use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MathCalc OCR API",
        version = "1.0.0",
        description = "Extracts text from uploaded images with Tesseract.",
    ),
    paths(
        handlers::index,
        handlers::ocr::extract_text,
        handlers::health::health_check,
    ),
    components(schemas(
        handlers::ocr::OcrResponse,
        handlers::ocr::ErrorResponse,
        handlers::health::HealthData,
    )),
    tags(
        (name = "ocr", description = "Text extraction from images"),
        (name = "health", description = "Health check"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
