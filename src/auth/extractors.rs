use std::convert::Infallible;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::error::AuthError;

/// Raw `Authorization` header value, if present and valid UTF-8.
///
/// Never rejects; the bearer rules are applied by `AuthService::profile`.
pub struct AuthorizationHeader(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for AuthorizationHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(AuthorizationHeader(value))
    }
}

/// JSON request body that rejects with `AuthError` instead of axum's plain-text rejections.
///
/// A non-JSON content type or an empty body yields `T::default()`, so missing
/// input is reported by the service as `MissingField`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            debug!("request body is not JSON; treating it as empty");
            return Ok(JsonBody(T::default()));
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            warn!(error = %e, "failed to buffer request body");
            AuthError::MalformedBody
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }

        let Json(value) = Json::<T>::from_bytes(&bytes).map_err(|e| {
            warn!(error = %e, "rejected JSON body");
            AuthError::MalformedBody
        })?;
        Ok(JsonBody(value))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(mime) = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
    else {
        return false;
    };
    let mime = mime.trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
