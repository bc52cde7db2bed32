//! Bearer token authentication for the render server.
//!
//! When a shared secret is configured, every compile request must carry it in
//! the `Authorization` header, either as `Bearer <token>` or as the bare
//! token:
//!
//! ```text
//! Authorization: Bearer s3cret
//! Authorization: s3cret
//! ```
//!
//! The token must match the configured secret byte for byte. The comparison
//! runs in constant time.
//!
//! When no secret is configured the middleware is not installed at all and
//! every request passes.
//!
//! # Example
//!
//! ```rust
//! use typst_render_server::server::auth::BearerAuth;
//!
//! let auth = BearerAuth::new("s3cret");
//!
//! assert!(auth.verify(Some("Bearer s3cret")).is_ok());
//! assert!(auth.verify(Some("s3cret")).is_ok());
//! assert!(auth.verify(Some("Bearer wrong")).is_err());
//! assert!(auth.verify(None).is_err());
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header was sent
    MissingCredentials,

    /// A token was sent but does not match the configured secret
    InvalidCredentials,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Missing Authorization header"),
            AuthError::InvalidCredentials => write!(f, "Invalid authentication token"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let code = match &self {
            AuthError::MissingCredentials => "unauthenticated",
            AuthError::InvalidCredentials => "invalid_credentials",
        };
        let message = self.to_string();

        // A wrong token may be an attack; a missing one is usually a misconfigured client
        match &self {
            AuthError::InvalidCredentials => {
                warn!(code = code, status = status.as_u16(), "Authentication failed: {}", message);
            }
            AuthError::MissingCredentials => {
                debug!(code = code, status = status.as_u16(), "Authentication failed: {}", message);
            }
        }

        let error_response = ErrorResponse::with_status(message, code, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Bearer Token Authentication
// =============================================================================

/// Shared-secret authenticator.
///
/// Constructed once from configuration and cloned into the middleware; the
/// secret never changes for the lifetime of the process.
#[derive(Clone)]
pub struct BearerAuth {
    /// The expected token
    token: Vec<u8>,
}

impl BearerAuth {
    /// Create a new authenticator expecting `token`.
    pub fn new(token: impl AsRef<[u8]>) -> Self {
        Self {
            token: token.as_ref().to_vec(),
        }
    }

    /// Check the raw value of an `Authorization` header.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the header carries the expected token, otherwise
    /// [`AuthError::MissingCredentials`] or [`AuthError::InvalidCredentials`].
    pub fn verify(&self, header: Option<&str>) -> Result<(), AuthError> {
        let header = header.ok_or(AuthError::MissingCredentials)?;
        let provided = extract_token(header);

        if provided.as_bytes().ct_eq(&self.token).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").field("token", &"<redacted>").finish()
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// `Bearer <token>` (scheme matched case-insensitively) yields `<token>`; any
/// other value is taken as the token itself.
pub fn extract_token(header: &str) -> &str {
    let header = header.trim();
    match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
        _ => header,
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware enforcing [`BearerAuth`].
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware, routing::post};
/// use typst_render_server::server::auth::{BearerAuth, auth_middleware};
///
/// let auth = BearerAuth::new("s3cret");
/// let app = Router::new()
///     .route("/", post(compile_handler))
///     .layer(middleware::from_fn_with_state(auth, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(auth): State<BearerAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = match request.headers().get(AUTHORIZATION) {
        None => None,
        // A header that is not visible ASCII cannot match any configured token
        Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidCredentials)?),
    };

    auth.verify(header)?;

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
