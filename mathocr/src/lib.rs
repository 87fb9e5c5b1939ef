pub mod api;
pub mod config;
pub mod error;
pub mod ocr;
pub mod processing;
pub mod rate_limit;
