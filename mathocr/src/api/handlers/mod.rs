pub(crate) mod health;
pub mod ocr;

pub use health::health_check;

pub const WELCOME_MESSAGE: &str = "Welcome to MathCalc's OCR API!";

/// `GET /`
#[utoipa::path(
    get,
    path = "/",
    tag = "ocr",
    responses(
        (status = 200, description = "Welcome message", body = String, content_type = "text/plain"),
    )
)]
pub async fn index() -> &'static str {
    WELCOME_MESSAGE
}
