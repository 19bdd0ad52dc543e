use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

use crate::error::CoreError;

pub const HOLDER_HEADER: &str = "x-holder-id";

/// Identity of the session selecting seats.
///
/// Authentication happens upstream; by the time a request reaches this
/// service the gateway has stamped the caller's session id into
/// `X-Holder-Id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderId(pub String);

impl<S> FromRequestParts<S> for HolderId
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let holder = parts
            .headers
            .get(HOLDER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CoreError::ValidationFailed("X-Holder-Id header is required".to_string())
            })?;

        if holder.len() > 128 {
            return Err(CoreError::ValidationFailed("X-Holder-Id is too long".to_string()));
        }

        Ok(HolderId(holder.to_string()))
    }
}

/// `Json` whose rejections (bad syntax, missing fields, wrong content type)
/// come back as a `ValidationFailed` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(CoreError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose parse failures come back as a `ValidationFailed` body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CoreError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CoreError))]
pub struct ApiQuery<T>(pub T);
