use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::ImageReader;
use tracing::{debug, info, warn};

use super::uploads::TempUpload;
use super::validation::is_allowed_mime_type;
use crate::error::{OcrApiError, Result};
use crate::ocr::{MimeDetector, TextExtractor};

/// Enough of the file for any signature the sniffer knows.
const SNIFF_LEN: u64 = 8192;

/// Sniff, decode and recognise a stored upload, then delete it.
#[derive(Clone)]
pub struct OcrPipeline {
    mime: Arc<dyn MimeDetector>,
    engine: Arc<dyn TextExtractor>,
    timeout: Duration,
}

struct Recognition {
    text: String,
    elapsed: Duration,
}

impl OcrPipeline {
    pub fn new(
        mime: Arc<dyn MimeDetector>,
        engine: Arc<dyn TextExtractor>,
        timeout: Duration,
    ) -> Self {
        Self {
            mime,
            engine,
            timeout,
        }
    }

    pub fn engine_available(&self) -> bool {
        self.engine.is_available()
    }

    /// Runs the blocking part on the blocking pool and always deletes the
    /// upload before returning.
    ///
    /// The timeout is checked after recognition has finished: a slow run is
    /// not interrupted, its text is discarded and
    /// [`OcrApiError::ProcessingTimeout`] is returned instead.
    pub async fn recognize(&self, upload: TempUpload) -> Result<String> {
        let path = upload.path().to_path_buf();
        let mime = Arc::clone(&self.mime);
        let engine = Arc::clone(&self.engine);

        let outcome = tokio::task::spawn_blocking(move || {
            recognize_file(&path, mime.as_ref(), engine.as_ref())
        })
        .await;

        let discarded = upload.discard().await;
        if let Err(e) = &discarded {
            warn!(error = %e, "Failed to delete upload after processing");
        }

        let recognition =
            outcome.map_err(|e| OcrApiError::Internal(format!("OCR task panicked: {e}")))??;
        discarded?;

        if recognition.elapsed > self.timeout {
            warn!(
                elapsed_ms = recognition.elapsed.as_millis() as u64,
                timeout_secs = self.timeout.as_secs(),
                "OCR finished after the timeout, discarding result"
            );
            return Err(OcrApiError::ProcessingTimeout {
                elapsed_secs: recognition.elapsed.as_secs_f64(),
            });
        }

        info!(
            elapsed_ms = recognition.elapsed.as_millis() as u64,
            chars = recognition.text.chars().count(),
            "OCR completed"
        );
        Ok(recognition.text)
    }
}

fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
    Ok(head)
}

fn recognize_file(
    path: &Path,
    mime: &dyn MimeDetector,
    engine: &dyn TextExtractor,
) -> Result<Recognition> {
    let detected = mime.detect_mime_type(&read_head(path)?);
    if !is_allowed_mime_type(&detected) {
        return Err(OcrApiError::InvalidFileContent { detected });
    }
    debug!(mime = %detected, "Upload content accepted");

    // Format comes from the bytes, not the extension.
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;

    let start = Instant::now();
    let text = engine.extract_text(&image)?;

    Ok(Recognition {
        text,
        elapsed: start.elapsed(),
    })
}
