//! HTTP surface: extraction endpoints plus plain CRUD for the catalog.
//!
//! Extraction handlers run on the blocking pool; image decoding, OCR and
//! PDF text extraction are all CPU-bound. The store sits behind a mutex,
//! which is enough for a single-user inventory service.

use crate::error::ExtractionError;
use crate::import::{self, ImportSummary};
use crate::invoice::{InvoiceExtractor, ParsedInvoice};
use crate::label::{LabelRecognizer, ParsedLabel};
use crate::store::{
    InventoryStore, Product, ProductInput, ProductUpdate, Spool, SpoolInput, SpoolUpdate,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::task;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<InventoryStore>>,
    pub labels: Arc<LabelRecognizer>,
    pub invoices: Arc<InvoiceExtractor>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/v1/ocr/parse-label", post(parse_label))
        .route("/api/v1/invoice/parse", post(parse_invoice))
        .route("/api/v1/invoice/import", post(import_invoice))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route(
            "/api/v1/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/v1/spools", get(list_spools).post(create_spool))
        .route(
            "/api/v1/spools/:id",
            get(get_spool).put(update_spool).delete(delete_spool),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// -- extraction ---------------------------------------------------------------

async fn parse_label(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<ParsedLabel>, ApiError> {
    require_content_type(&headers, "image/")?;
    let labels = state.labels.clone();
    let parsed = task::spawn_blocking(move || labels.parse(&body))
        .await
        .map_err(join_error)??;
    Ok(Json(parsed))
}

async fn parse_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<ParsedInvoice>, ApiError> {
    require_content_type(&headers, "application/pdf")?;
    let invoices = state.invoices.clone();
    let parsed = task::spawn_blocking(move || invoices.parse(&body))
        .await
        .map_err(join_error)??;
    Ok(Json(parsed))
}

async fn import_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<ImportSummary>, ApiError> {
    require_content_type(&headers, "application/pdf")?;
    let invoices = state.invoices.clone();
    let store = state.store.clone();
    let summary = task::spawn_blocking(move || {
        let parsed = invoices.parse(&body)?;
        let mut store = store.lock().map_err(|_| poisoned())?;
        import::import_invoice(&mut store, &parsed)
    })
    .await
    .map_err(join_error)??;
    Ok(Json(summary))
}

// -- products -----------------------------------------------------------------

async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    let product = store.insert_product(&input).map_err(storage)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    Ok(Json(store.list_products().map_err(storage)?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    store
        .get_product(id)
        .map_err(storage)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product", id))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    store
        .update_product(id, &update)
        .map_err(storage)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product", id))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    if store.delete_product(id).map_err(storage)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("product", id))
    }
}

// -- spools -------------------------------------------------------------------

async fn create_spool(
    State(state): State<AppState>,
    Json(input): Json<SpoolInput>,
) -> Result<(StatusCode, Json<Spool>), ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    if store.get_product(input.product_id).map_err(storage)?.is_none() {
        return Err(ApiError::from(ExtractionError::InvalidInput(format!(
            "unknown product_id {}",
            input.product_id
        ))));
    }
    let spool = store.insert_spool(&input).map_err(storage)?;
    Ok((StatusCode::CREATED, Json(spool)))
}

async fn list_spools(State(state): State<AppState>) -> Result<Json<Vec<Spool>>, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    Ok(Json(store.list_spools().map_err(storage)?))
}

async fn get_spool(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Spool>, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    store
        .get_spool(id)
        .map_err(storage)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("spool", id))
}

async fn update_spool(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<SpoolUpdate>,
) -> Result<Json<Spool>, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    store
        .update_spool(id, &update)
        .map_err(storage)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("spool", id))
}

async fn delete_spool(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.lock().map_err(|_| poisoned())?;
    if store.delete_spool(id).map_err(storage)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("spool", id))
    }
}

// -- error plumbing -----------------------------------------------------------

/// HTTP-facing error: a status code plus a JSON `{"error": ...}` body.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(kind: &str, id: i64) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{kind} {id} not found"),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        if err.is_client_error() {
            Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
            }
        } else {
            // Full cause goes to the log; the response carries a summary.
            error!(error = %err, "request failed");
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "internal error".to_string(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn require_content_type(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let ok = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(expected));
    if ok {
        Ok(())
    } else {
        Err(ApiError::from(ExtractionError::InvalidInput(format!(
            "expected content type {expected}*"
        ))))
    }
}

fn storage(e: rusqlite::Error) -> ApiError {
    ApiError::from(ExtractionError::Unexpected(format!("storage failure: {e}")))
}

fn poisoned() -> ExtractionError {
    ExtractionError::Unexpected("store lock poisoned".to_string())
}

fn join_error(e: task::JoinError) -> ApiError {
    ApiError::from(ExtractionError::Unexpected(format!(
        "blocking task failed: {e}"
    )))
}
