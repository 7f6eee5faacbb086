//! Axum extractors for presented credentials.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::bearer::get_bearer;

/// The bearer credential of a request, if any.
///
/// Never rejects: an absent credential is a normal input for the authority,
/// which answers it with `MissingCredential` without touching storage.
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BearerToken(get_bearer(&parts.headers).map(str::to_string)))
    }
}
