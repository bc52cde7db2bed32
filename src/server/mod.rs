//! HTTP server layer for the render server.
//!
//! This module provides the HTTP API for compiling Typst documents to PDF.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │           POST /          POST /template/{template_name}        │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │  (bearer)   │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{auth_middleware, extract_token, AuthError, BearerAuth};
pub use handlers::{
    compile_handler, extract_content, health_handler, template_filename, template_handler,
    AppState, ErrorResponse, HealthResponse, INLINE_FILENAME, PDF_CONTENT_TYPE,
};
pub use routes::{create_router, RouterConfig};
