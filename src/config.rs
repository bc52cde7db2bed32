//! Configuration management for the Typst render server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables (`PORT`, `AUTH_TOKEN`, ...)
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use typst_render_server::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}", config.bind_address());
//! println!("Templates: {}", config.templates_root().display());
//! ```
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 3000)
//! - `AUTH_TOKEN` - Shared secret for bearer authentication (unset disables auth)
//! - `TEMPLATES_DIR` - Templates root (default: `./templates`)
//! - `FONT_DIRS` - Extra font directories (comma-separated)
//! - `CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::path::PathBuf;

use clap::Parser;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default templates directory, relative to the process working directory.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Typst render server - compile Typst markup and templates to PDF over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "typst-render-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Shared secret expected in the `Authorization` header.
    ///
    /// Accepted as `Bearer <token>` or a bare `<token>`. When unset, every
    /// request is accepted.
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    // =========================================================================
    // Rendering Configuration
    // =========================================================================
    /// Directory containing one subdirectory per template.
    ///
    /// Relative paths are resolved against the current working directory.
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR, env = "TEMPLATES_DIR")]
    pub templates_dir: PathBuf,

    /// Additional directories to scan for fonts (comma-separated).
    ///
    /// The fonts bundled with Typst are always available.
    #[arg(long = "font-dir", env = "FONT_DIRS", value_delimiter = ',')]
    pub font_dirs: Vec<PathBuf>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(token) = &self.auth_token {
            if token.is_empty() {
                return Err(
                    "AUTH_TOKEN is set but empty. Provide a token or unset it to disable auth"
                        .to_string(),
                );
            }
        }

        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        for dir in &self.font_dirs {
            if !dir.is_dir() {
                return Err(format!("font directory does not exist: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether bearer authentication is enforced.
    pub fn auth_enabled(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Templates root as an absolute path.
    pub fn templates_root(&self) -> PathBuf {
        if self.templates_dir.is_absolute() {
            return self.templates_dir.clone();
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(&self.templates_dir),
            Err(_) => self.templates_dir.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
