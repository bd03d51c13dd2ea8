/// Request body extractor accepting JSON or url-encoded forms
///
/// HTML forms post `application/x-www-form-urlencoded` bodies, carrying the
/// `_csrf` token and `_method` override as ordinary fields; API clients post
/// JSON. Handlers take [`JsonOrForm`] and see the same value either way.
///
/// ```rust,ignore
/// async fn login(JsonOrForm(req): JsonOrForm<LoginRequest>) -> ApiResult<Json<User>> {
///     ...
/// }
/// ```
///
/// Fields the target type does not name, such as `_csrf`, are ignored.

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::{header, HeaderMap},
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Body deserialized from JSON or a url-encoded form, chosen by content type
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form_encoded(req.headers()) {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

/// Whether the request body is `application/x-www-form-urlencoded`
pub fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}
