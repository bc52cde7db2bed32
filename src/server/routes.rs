//! Router configuration for the render server.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, CORS and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                           - Health check (public)
//! POST /                            - Compile inline markup (protected)
//! POST /template/{template_name}    - Compile a stored template (protected)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use typst_render_server::render::{FontCache, TypstEngine};
//! use typst_render_server::server::routes::{create_router, RouterConfig};
//! use typst_render_server::template::TemplateStore;
//!
//! let engine = TypstEngine::new(FontCache::new());
//! let templates = TemplateStore::new("/srv/templates");
//!
//! let config = RouterConfig::new("my-secret-token")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(engine, templates, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, BearerAuth};
use super::handlers::{compile_handler, health_handler, template_handler, AppState};
use crate::render::PdfEngine;
use crate::template::TemplateStore;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Shared secret for bearer authentication (None = auth disabled)
    pub auth_token: Option<String>,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration requiring the given token.
    ///
    /// By default:
    /// - Authentication is enabled
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(auth_token.into()),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Create a configuration with authentication disabled.
    pub fn without_auth() -> Self {
        Self {
            auth_token: None,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Whether authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.auth_token.is_some()
    }
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("auth_enabled", &self.auth_enabled())
            .field("cors_origins", &self.cors_origins)
            .field("enable_tracing", &self.enable_tracing)
            .finish()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (health check)
/// - Compile routes (with bearer auth when a token is configured)
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router<E>(engine: E, templates: TemplateStore, config: RouterConfig) -> Router
where
    E: PdfEngine,
{
    let app_state = AppState::new(engine, templates);
    let cors = build_cors_layer(&config);

    let router = match &config.auth_token {
        Some(token) => build_protected_router(app_state, BearerAuth::new(token), cors),
        None => build_public_router(app_state, cors),
    };

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Compile routes shared by both router flavours.
fn compile_routes<E: PdfEngine>(app_state: AppState<E>) -> Router {
    Router::new()
        .route("/", post(compile_handler::<E>))
        .route("/template/{template_name}", post(template_handler::<E>))
        .with_state(app_state)
}

/// Build router with authentication on the compile routes.
fn build_protected_router<E: PdfEngine>(
    app_state: AppState<E>,
    auth: BearerAuth,
    cors: CorsLayer,
) -> Router {
    let protected_routes = compile_routes(app_state)
        .layer(middleware::from_fn_with_state(auth, auth_middleware));

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(cors)
}

/// Build router without authentication.
fn build_public_router<E: PdfEngine>(app_state: AppState<E>, cors: CorsLayer) -> Router {
    compile_routes(app_state)
        .route("/health", get(health_handler))
        .layer(cors)
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
