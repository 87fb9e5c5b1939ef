use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use leptess::LepTess;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{OcrApiError, Result};

/// Turns an opened image into text.
///
/// Implementations block for the full duration of recognition and must be
/// called from a blocking context (`spawn_blocking`), never directly on the
/// async runtime.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &DynamicImage) -> Result<String>;

    fn is_available(&self) -> bool {
        true
    }
}

enum OcrBackend {
    Tesseract { languages: String },
    Unavailable { reason: String },
}

/// Tesseract through leptess. Every extraction opens its own Tesseract
/// handle, so concurrent requests never wait on each other. When Tesseract
/// cannot be initialised at startup the engine still constructs and every
/// extraction fails with [`OcrApiError::OcrUnavailable`].
pub struct OcrEngine {
    backend: OcrBackend,
}

fn create_tesseract(languages: &str) -> std::result::Result<LepTess, String> {
    LepTess::new(None, languages).map_err(|e| e.to_string())
}

impl OcrEngine {
    pub fn new(config: &OcrConfig) -> Self {
        // Opened once to fail fast on missing language data, then dropped.
        let backend = match create_tesseract(&config.languages) {
            Ok(_) => {
                info!(languages = %config.languages, "Tesseract OCR initialized");
                OcrBackend::Tesseract {
                    languages: config.languages.clone(),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Self { backend }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
        }
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    image.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

impl TextExtractor for OcrEngine {
    fn extract_text(&self, image: &DynamicImage) -> Result<String> {
        match &self.backend {
            OcrBackend::Tesseract { languages } => {
                let png = encode_png(image)?;
                let mut lt = create_tesseract(languages).map_err(OcrApiError::Ocr)?;
                lt.set_image_from_mem(&png)
                    .map_err(|e| OcrApiError::Ocr(format!("Failed to set image: {e}")))?;
                let text = lt
                    .get_utf8_text()
                    .map_err(|e| OcrApiError::Ocr(format!("Failed to extract text: {e}")))?;

                Ok(text.trim().to_string())
            }
            OcrBackend::Unavailable { reason } => Err(OcrApiError::OcrUnavailable(reason.clone())),
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }
}
