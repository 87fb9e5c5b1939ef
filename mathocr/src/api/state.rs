use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::ocr::{InferMimeDetector, MimeDetector, TextExtractor};
use crate::processing::{OcrPipeline, UploadStore};
use crate::rate_limit::RateLimiter;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: UploadStore,
    pub pipeline: OcrPipeline,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn TextExtractor>) -> Self {
        Self::with_components(config, Arc::new(InferMimeDetector::new()), engine)
    }

    pub fn with_components(
        config: Config,
        mime: Arc<dyn MimeDetector>,
        engine: Arc<dyn TextExtractor>,
    ) -> Self {
        let config = Arc::new(config);
        let uploads = UploadStore::new(&config.uploads.dir);
        let pipeline = OcrPipeline::new(
            mime,
            engine,
            Duration::from_secs(config.ocr.timeout_secs),
        );
        let limiter = RateLimiter::new(&config.rate_limit);

        Self {
            config,
            uploads,
            pipeline,
            limiter,
        }
    }
}
