use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mathocr::api::{create_router, AppState};
use mathocr::config::Config;
use mathocr::ocr::{OcrEngine, TextExtractor};

#[derive(Parser)]
#[command(name = "mathocr")]
#[command(about = "HTTP service that extracts text from uploaded images")]
struct Args {
    /// Address to bind, overrides HOST
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides PORT
    #[arg(long)]
    port: Option<u16>,
}

/// Interval between sweeps of idle rate-limit counters.
const LIMITER_PURGE_INTERVAL_SECS: u64 = 60;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mathocr=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    init_tracing();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Initializing OCR engine (languages: {})...", config.ocr.languages);
    let engine = OcrEngine::new(&config.ocr);
    if !engine.is_available() {
        tracing::warn!("OCR unavailable - every /ocr request will fail with 500");
    }

    let state = AppState::new(config.clone(), Arc::new(engine));

    state.uploads.ensure_dir().await?;
    tracing::info!("Upload directory: {}", state.uploads.dir().display());

    let cancel_token = CancellationToken::new();

    if state.limiter.is_enabled() {
        tracing::info!(
            "Rate limits: default [{}], /ocr [{}]",
            config.rate_limit.default_limits,
            config.rate_limit.ocr_limits
        );
        let limiter = state.limiter.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Rate limit sweeper shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(LIMITER_PURGE_INTERVAL_SECS)) => {
                        let removed = limiter.purge_expired();
                        if removed > 0 {
                            tracing::debug!("Purged {} idle rate limit counters", removed);
                        }
                    }
                }
            }
        });
    } else {
        tracing::warn!("Rate limiting disabled");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("MathCalc OCR API starting on http://{}", addr);
    tracing::info!("  OCR endpoint: http://{}/ocr", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  OpenAPI document: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel_token))
    .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
