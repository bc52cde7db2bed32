//! Template Store for resolving templates from the templates root.
//!
//! # Example
//!
//! ```ignore
//! use typst_render_server::template::TemplateStore;
//!
//! let store = TemplateStore::new("/srv/templates");
//! let template = store.load("invoice").await?;
//!
//! println!("root: {}", template.dir.display());
//! println!("defaults: {:?}", template.defaults);
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TemplateError;

/// File name of a template's entry point.
pub const MAIN_FILE: &str = "main.typ";

/// File name of a template's optional default data.
pub const DATA_FILE: &str = "data.json";

/// Longest accepted template name.
pub const MAX_TEMPLATE_NAME_LEN: usize = 128;

// =============================================================================
// Template
// =============================================================================

/// A template resolved from disk for a single request.
#[derive(Debug, Clone)]
pub struct Template {
    /// Template name as it appeared in the request path
    pub name: String,

    /// Directory holding the template files (compilation root)
    pub dir: PathBuf,

    /// Default data from `data.json`, or empty when the file is absent
    pub defaults: Map<String, Value>,
}

// =============================================================================
// TemplateStore
// =============================================================================

/// Resolves template names to template directories under a fixed root.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The templates root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a template by name.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::InvalidName`] if the name is outside the safe character set
    /// - [`TemplateError::NotFound`] if `main.typ` does not exist
    /// - [`TemplateError::InvalidDefaults`] if `data.json` is not a JSON object
    /// - [`TemplateError::Io`] for any other filesystem error
    pub async fn load(&self, name: &str) -> Result<Template, TemplateError> {
        validate_template_name(name)?;

        let dir = self.root.join(name);
        let main_path = dir.join(MAIN_FILE);

        match tokio::fs::metadata(&main_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(TemplateError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TemplateError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => {
                return Err(TemplateError::Io {
                    name: name.to_string(),
                    message: e.to_string(),
                })
            }
        }

        let defaults = read_defaults(name, &dir.join(DATA_FILE)).await?;

        debug!(
            template = name,
            default_keys = defaults.len(),
            "Loaded template"
        );

        Ok(Template {
            name: name.to_string(),
            dir,
            defaults,
        })
    }
}

/// Read and parse `data.json`, defaulting to an empty object when absent.
async fn read_defaults(name: &str, path: &Path) -> Result<Map<String, Value>, TemplateError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => {
            return Err(TemplateError::Io {
                name: name.to_string(),
                message: e.to_string(),
            })
        }
    };

    let value: Value =
        serde_json::from_slice(&raw).map_err(|e| TemplateError::InvalidDefaults {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(TemplateError::InvalidDefaults {
            name: name.to_string(),
            reason: format!("expected a JSON object, found {}", super::json_kind(&other)),
        }),
    }
}

/// Check that a template name is safe to join onto the templates root.
///
/// Names are limited to ASCII letters, digits, `-` and `_` so they can never
/// contain path separators or `..`.
pub fn validate_template_name(name: &str) -> Result<(), TemplateError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_TEMPLATE_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(TemplateError::InvalidName {
            name: name.to_string(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
