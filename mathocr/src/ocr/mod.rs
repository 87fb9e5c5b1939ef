//! OCR (Optical Character Recognition) Module
//!
//! Two capabilities the upload pipeline treats as black boxes:
//! - [`MimeDetector`] sniffs the real content type of uploaded bytes
//!   ([`InferMimeDetector`], backed by `infer`)
//! - [`TextExtractor`] turns an opened image into text
//!   ([`OcrEngine`], Tesseract via leptess)
//!
//! Both are synchronous and blocking; callers run them on the blocking pool.
//!
//! # Configuration
//!
//! Controlled via `OcrConfig` (see `config.rs`):
//! - `languages`: Tesseract language codes
//! - `timeout_secs`: threshold above which a finished run is reported as 408

mod mime;
mod provider;

pub use mime::{InferMimeDetector, MimeDetector, UNKNOWN_MIME_TYPE};
pub use provider::{OcrEngine, TextExtractor};
