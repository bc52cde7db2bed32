//! Typst Render Server - compile Typst documents to PDF over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use typst_render_server::{
    config::Config,
    render::{FontCache, TypstEngine},
    server::{create_router, RouterConfig},
    template::TemplateStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let templates_root = config.templates_root();

    info!("Typst Render Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Templates: {}", templates_root.display());
    if !templates_root.is_dir() {
        warn!("  Templates directory does not exist; only POST / will succeed");
    }
    if !config.font_dirs.is_empty() {
        info!("  Extra font dirs: {:?}", config.font_dirs);
    }

    // Auth status with warning if disabled
    if config.auth_enabled() {
        info!("  Auth: enabled (bearer token)");
    } else {
        warn!("  Auth: DISABLED - all endpoints are publicly accessible");
        warn!("        Enable for production: --auth-token=<token> or AUTH_TOKEN");
    }

    // Load fonts once; every request shares them read-only
    let fonts = FontCache::with_dirs(&config.font_dirs);
    let engine = TypstEngine::new(fonts);
    info!("  Fonts: {} loaded", engine.fonts().len());
    let templates = TemplateStore::new(templates_root);

    let router = create_router(engine, templates, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -X POST -H 'Content-Type: text/plain' --data '= Hello' http://{}/ -o output.pdf",
        addr
    );
    info!(
        "    curl -X POST -H 'Content-Type: application/json' --data '{{}}' http://{}/template/<name> -o out.pdf",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "typst_render_server=debug,tower_http=debug"
    } else {
        "typst_render_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = match &config.auth_token {
        Some(token) => RouterConfig::new(token.clone()),
        None => RouterConfig::without_auth(),
    };

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config.with_tracing(!config.no_tracing)
}
