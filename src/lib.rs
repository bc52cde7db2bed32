//! # Typst Render Server
//!
//! A small HTTP service that compiles [Typst](https://typst.app) documents to
//! PDF.
//!
//! Clients either send Typst markup directly, or name a template stored on
//! disk and send JSON data that is merged over the template's defaults. The
//! heavy lifting (parsing, layout, PDF export) is done by the `typst` and
//! `typst-pdf` crates.
//!
//! ## Features
//!
//! - **Inline compilation**: `POST /` with raw markup or `{"content": "..."}`
//! - **Templates**: `POST /template/{name}` with JSON overrides for `data.json`
//! - **Isolation**: every request compiles in its own world; shared state is read-only
//! - **Authentication**: optional shared-secret bearer token
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`template`] - Template store and data merging
//! - [`render`] - PDF engine trait, Typst world and fonts
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use typst_render_server::{create_router, FontCache, RouterConfig, TemplateStore, TypstEngine};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = TypstEngine::new(FontCache::new());
//!     let templates = TemplateStore::new("templates");
//!     let router = create_router(engine, templates, RouterConfig::without_auth());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod render;
pub mod server;
pub mod template;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, RenderError, RequestError, TemplateError};
pub use render::{CompileJob, FontCache, PdfEngine, RenderWorld, ShadowFile, TypstEngine};
pub use server::{
    auth_middleware, compile_handler, create_router, health_handler, template_handler, AppState,
    AuthError, BearerAuth, ErrorResponse, HealthResponse, RouterConfig,
};
pub use template::{merge_data, Template, TemplateStore};
