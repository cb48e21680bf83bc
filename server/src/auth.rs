//! Dev-mode session resolution.
//!
//! The real platform owns sign-up, password reset, and email verification;
//! the server only needs a `CurrentUser` per request. Sessions are issued
//! by `POST /api/auth/login` and carried as a bearer token.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use rummage_common::identity::CurrentUser;

use crate::error::ApiError;
use crate::store::Store;

/// Resolve the caller from the `Authorization: Bearer <token>` header.
pub fn current_user(store: &Store, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::AuthenticationRequired)?;
    store
        .session(token)
        .ok_or(ApiError::AuthenticationRequired)
}

/// Like [`current_user`], additionally requiring a verified email address
/// (listing creation and checkout demand one).
pub fn verified_user(store: &Store, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let user = current_user(store, headers)?;
    if !user.email_verified {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}
