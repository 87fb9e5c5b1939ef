// Common test utilities for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use image::{DynamicImage, ImageFormat};
use tower::ServiceExt;

use mathocr::api::{create_router, AppState};
use mathocr::config::Config;
use mathocr::error::Result;
use mathocr::ocr::TextExtractor;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const BOUNDARY: &str = "mathocr-test-boundary";

/// Engine that returns fixed text and counts how often it ran.
pub struct StubEngine {
    text: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubEngine {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextExtractor for StubEngine {
    fn extract_text(&self, _image: &DynamicImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(self.text.clone())
    }
}

pub fn test_config(upload_dir: &Path) -> Config {
    let mut config = Config::default();
    config.uploads.dir = upload_dir.to_string_lossy().into_owned();
    config.uploads.max_body_bytes = mathocr::config::DEFAULT_MAX_BODY_BYTES;
    config.ocr.timeout_secs = 10;
    config.rate_limit = Default::default();
    config
}

pub fn build_app(config: Config, engine: Arc<dyn TextExtractor>) -> Router {
    init_test_logger();
    create_router(AppState::new(config, engine))
}

pub fn encode_image(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(120, 40);
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), format)
        .expect("encode test image");
    output
}

pub enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let body = multipart_body(parts);
    Request::builder()
        .method("POST")
        .uri("/ocr")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

pub fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
    multipart_request(&[Part::File {
        name: "image",
        file_name,
        bytes,
    }])
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn send_from(app: &Router, addr: [u8; 4], request: Request<Body>) -> Response {
    app.clone()
        .layer(MockConnectInfo(SocketAddr::from((addr, 52_000))))
        .oneshot(request)
        .await
        .unwrap()
}

pub async fn json_body(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body)
        .unwrap_or_else(|e| panic!("body is not JSON ({e}): {}", String::from_utf8_lossy(&body)));
    (status, json)
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
