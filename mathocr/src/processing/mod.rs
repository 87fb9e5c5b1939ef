pub mod pipeline;
pub mod uploads;
pub mod validation;

pub use pipeline::OcrPipeline;
pub use uploads::{TempUpload, UploadStore};
pub use validation::{allowed_extension, ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES};
