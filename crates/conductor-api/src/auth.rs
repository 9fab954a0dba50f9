//! Bearer token authentication for the management API.

use std::path::Path;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;

use crate::error::ApiError;
use crate::state::AppState;

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Pick the API token: the configured one if set, else the token stored at
/// `token_path`, else a freshly generated token written to `token_path`.
pub fn resolve_token(configured: Option<&str>, token_path: &Path) -> String {
    if let Some(token) = configured.map(str::trim).filter(|t| !t.is_empty()) {
        return token.to_string();
    }

    if let Ok(contents) = std::fs::read_to_string(token_path) {
        let token = contents.trim();
        if !token.is_empty() {
            tracing::info!("API token loaded from {}", token_path.display());
            return token.to_string();
        }
    }

    let token = generate_token();
    if let Some(parent) = token_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(token_path, &token) {
        Ok(()) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ =
                    std::fs::set_permissions(token_path, std::fs::Permissions::from_mode(0o600));
            }
            tracing::info!("API token saved to {}", token_path.display());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save API token to {}", token_path.display());
        }
    }
    token
}

/// Middleware requiring `Authorization: Bearer <token>` matching
/// `AppState::api_token`.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let header = match req.headers().get("authorization") {
        Some(value) => value,
        None => {
            return ApiError::Unauthorized("Missing Authorization header".to_string())
                .into_response()
        }
    };

    let presented = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == state.api_token => next.run(req).await,
        Some(_) => ApiError::Unauthorized("Invalid bearer token".to_string()).into_response(),
        None => ApiError::Unauthorized("Malformed Authorization header".to_string())
            .into_response(),
    }
}
