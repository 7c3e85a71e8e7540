mod config;
mod error;
mod import;
mod invoice;
mod label;
mod ocr;
mod pdf_text;
mod server;
mod store;
mod vocab;

use invoice::InvoiceExtractor;
use label::LabelRecognizer;
use ocr::OcrBackend;
use server::AppState;
use std::sync::{Arc, Mutex};
use store::InventoryStore;
use tracing::info;
use vocab::Vocabulary;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .init();

    let cfg = config::Config::load_or_default("config.toml")?;
    let store = InventoryStore::new(&cfg.db_path)?;

    let vocab = Arc::new(Vocabulary::default());
    let backend = ocr_backend(&cfg);
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        labels: Arc::new(LabelRecognizer::new(
            backend,
            vocab.clone(),
            cfg.label_scoring,
        )),
        invoices: Arc::new(InvoiceExtractor::new(vocab)),
    };

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, db = %cfg.db_path, "listening");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(feature = "tesseract")]
fn ocr_backend(cfg: &config::Config) -> Arc<dyn OcrBackend> {
    Arc::new(ocr::TesseractBackend::new(None, &cfg.ocr.lang))
}

#[cfg(not(feature = "tesseract"))]
fn ocr_backend(_cfg: &config::Config) -> Arc<dyn OcrBackend> {
    tracing::warn!("built without the tesseract feature; label OCR is disabled");
    Arc::new(ocr::DisabledBackend)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}
