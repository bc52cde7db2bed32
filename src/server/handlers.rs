//! HTTP request handlers for the render API.
//!
//! # Endpoints
//!
//! - `POST /` - Compile inline Typst markup
//! - `POST /template/{template_name}` - Compile a stored template with JSON data
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, RenderError, RequestError, TemplateError};
use crate::render::{CompileJob, PdfEngine};
use crate::template::{merge_data, parse_overrides, TemplateStore, DATA_FILE};

/// Filename used for PDFs compiled from inline markup.
pub const INLINE_FILENAME: &str = "output.pdf";

/// MIME type of every successful response.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Holds only immutable, thread-safe parts: the engine (whose per-job state
/// lives in the job itself) and the template store.
pub struct AppState<E: PdfEngine> {
    /// Engine used to compile every request
    pub engine: Arc<E>,

    /// Where named templates are loaded from
    pub templates: Arc<TemplateStore>,
}

impl<E: PdfEngine> AppState<E> {
    /// Create a new application state.
    pub fn new(engine: E, templates: TemplateStore) -> Self {
        Self {
            engine: Arc::new(engine),
            templates: Arc::new(templates),
        }
    }

    /// Run a compile job on the blocking thread pool.
    pub async fn render(&self, job: CompileJob) -> Result<Vec<u8>, RenderError> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.compile(job))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }
}

impl<E: PdfEngine> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            templates: Arc::clone(&self.templates),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Error type identifier (e.g., "template_not_found", "invalid_json")
    pub code: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        message: impl Into<String>,
        code: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to HTTP response.
///
/// Compilation failures are reported with a generic message; the engine's
/// diagnostics only go to the log.
///
/// - 4xx errors are logged at WARN level (404 at DEBUG)
/// - 5xx errors are logged at ERROR level
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Request(err) => {
                let code = match err {
                    RequestError::MissingContent => "missing_content",
                    RequestError::InvalidJson(_) => "invalid_json",
                    RequestError::NotAnObject { .. } => "invalid_body",
                    RequestError::InvalidUtf8 => "invalid_encoding",
                };
                (StatusCode::BAD_REQUEST, code, err.to_string())
            }

            ApiError::Template(err) => match err {
                TemplateError::InvalidName { .. } => {
                    (StatusCode::BAD_REQUEST, "invalid_template_name", err.to_string())
                }
                TemplateError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "template_not_found", err.to_string())
                }
                TemplateError::Io { .. }
                | TemplateError::InvalidDefaults { .. }
                | TemplateError::Serialize { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "template_error",
                    "Failed to generate PDF from template".to_string(),
                ),
            },

            ApiError::Render { template, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "compilation_failed",
                match template {
                    Some(_) => "Failed to generate PDF from template".to_string(),
                    None => "Failed to generate PDF".to_string(),
                },
            ),
        };

        // Log errors based on severity
        if status.is_server_error() {
            error!(
                code = code,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                code = code,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                code = code,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(message, code, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Whether the request declares a JSON body (`application/json` or `*+json`).
fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let essence = value.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case("application/json")
                || essence.to_ascii_lowercase().ends_with("+json")
        })
        .unwrap_or(false)
}

/// Extract the markup of a raw compile request.
///
/// JSON bodies must carry the markup in a `content` string field; any other
/// body is taken as UTF-8 markup text.
pub fn extract_content(headers: &HeaderMap, body: &[u8]) -> Result<String, RequestError> {
    if body.is_empty() {
        return Err(RequestError::MissingContent);
    }

    let content = if is_json_request(headers) {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| RequestError::InvalidJson(e.to_string()))?;
        match value.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => String::new(),
        }
    } else {
        String::from_utf8(body.to_vec()).map_err(|_| RequestError::InvalidUtf8)?
    };

    if content.is_empty() {
        return Err(RequestError::MissingContent);
    }
    Ok(content)
}

/// Download filename for a template render: `<name>_<timestamp>.pdf`.
///
/// The timestamp is ISO-8601 UTC with millisecond precision, with `:` and `.`
/// replaced by `-` so it is safe in a `Content-Disposition` header.
pub fn template_filename(name: &str, at: DateTime<Utc>) -> String {
    let timestamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(|c: char| c == ':' || c == '.', "-");
    format!("{}_{}.pdf", name, timestamp)
}

/// Build the `200 OK` PDF download response.
fn pdf_response(pdf: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        pdf,
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle inline compile requests.
///
/// # Endpoint
///
/// `POST /`
///
/// # Body
///
/// Either raw Typst markup (any non-JSON content type) or a JSON object
/// `{"content": "<markup>"}`.
///
/// # Response
///
/// - `200 OK`: PDF with `Content-Disposition: attachment; filename=output.pdf`
/// - `400 Bad Request`: Missing or empty content, invalid JSON
/// - `401 Unauthorized`: Missing or wrong token (when auth is enabled)
/// - `500 Internal Server Error`: Compilation failed
pub async fn compile_handler<E: PdfEngine>(
    State(state): State<AppState<E>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content = extract_content(&headers, &body)?;

    debug!(bytes = content.len(), "Compiling inline document");

    let pdf = state
        .render(CompileJob::inline(content))
        .await
        .map_err(ApiError::inline_render)?;

    info!(bytes = pdf.len(), "Rendered inline document");

    Ok(pdf_response(pdf, INLINE_FILENAME))
}

/// Handle template compile requests.
///
/// # Endpoint
///
/// `POST /template/{template_name}`
///
/// # Body
///
/// Optional JSON object of overrides. Keys replace the template's default
/// data (`data.json`) one level deep; an empty body keeps the defaults.
///
/// # Response
///
/// - `200 OK`: PDF with filename `<template_name>_<timestamp>.pdf`
/// - `400 Bad Request`: Body is not a JSON object, or invalid template name
/// - `401 Unauthorized`: Missing or wrong token (when auth is enabled)
/// - `404 Not Found`: Template does not exist
/// - `500 Internal Server Error`: Compilation failed or `data.json` is invalid
pub async fn template_handler<E: PdfEngine>(
    State(state): State<AppState<E>>,
    Path(template_name): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let template = state.templates.load(&template_name).await?;

    let overrides = parse_overrides(&body)?;
    let merged = merge_data(template.defaults, overrides)?;

    let data = serde_json::to_vec_pretty(&Value::Object(merged)).map_err(|e| {
        TemplateError::Serialize {
            name: template_name.clone(),
            reason: e.to_string(),
        }
    })?;

    debug!(
        template = %template_name,
        data_bytes = data.len(),
        "Compiling template"
    );

    let job = CompileJob::template(template.dir).with_shadow(format!("/{}", DATA_FILE), data);
    let pdf = state
        .render(job)
        .await
        .map_err(|e| ApiError::template_render(&template_name, e))?;

    let filename = template_filename(&template_name, Utc::now());

    info!(
        template = %template_name,
        bytes = pdf.len(),
        filename = %filename,
        "Rendered template"
    );

    Ok(pdf_response(pdf, &filename))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
