use thiserror::Error;

/// Errors caused by a malformed request body
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// No markup was supplied to the raw compile endpoint
    #[error("Missing Typst content in request body")]
    MissingContent,

    /// Body claimed to be JSON (or had to be) but did not parse
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),

    /// Template overrides must be a JSON object
    #[error("Request body must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    /// Text body was not valid UTF-8
    #[error("Request body is not valid UTF-8 text")]
    InvalidUtf8,
}

/// Errors that can occur when resolving a template on disk
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    /// Template name contains characters outside the allowed set (should map to HTTP 400)
    #[error("Invalid template name '{name}': use 1-128 ASCII letters, digits, '-' or '_'")]
    InvalidName { name: String },

    /// No `main.typ` exists for the template (should map to HTTP 404)
    #[error("Template '{name}' not found")]
    NotFound { name: String },

    /// Filesystem error while reading template files
    #[error("I/O error reading template '{name}': {message}")]
    Io { name: String, message: String },

    /// `data.json` exists but is not a JSON object
    #[error("Default data for template '{name}' is invalid: {reason}")]
    InvalidDefaults { name: String, reason: String },

    /// Merged data could not be serialized for the compiler
    #[error("Cannot serialize data for template '{name}': {reason}")]
    Serialize { name: String, reason: String },
}

/// Errors raised by the compilation engine
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Typst reported one or more errors while compiling
    #[error("Compilation failed: {message}")]
    Compilation { message: String },

    /// Document compiled but PDF export failed
    #[error("PDF export failed: {message}")]
    Export { message: String },

    /// The blocking compile task panicked or was cancelled
    #[error("Compilation task failed: {0}")]
    Task(String),
}

/// Top-level error returned by HTTP handlers
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Compilation failure, tagged with the template it came from (if any)
    #[error("{source}")]
    Render {
        template: Option<String>,
        #[source]
        source: RenderError,
    },
}

impl ApiError {
    /// Wrap a compilation failure from the raw-content endpoint.
    pub fn inline_render(source: RenderError) -> Self {
        ApiError::Render {
            template: None,
            source,
        }
    }

    /// Wrap a compilation failure from the template endpoint.
    pub fn template_render(name: impl Into<String>, source: RenderError) -> Self {
        ApiError::Render {
            template: Some(name.into()),
            source,
        }
    }
}
