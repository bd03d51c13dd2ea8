use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Query, Request},
    http::{request::Parts, HeaderMap, Method},
    response::Response,
};
use courseware_shared::auth::csrf;
use serde::Deserialize;
use tower_cookies::{
    cookie::{Cookie, SameSite},
    Cookies,
};

use crate::{
    error::ApiError,
    extract::is_form_encoded,
    pipeline::{PipelineStage, RequestContext},
};

/// Cookie holding the per-client CSRF secret
pub const CSRF_COOKIE: &str = "_csrf";

/// Field name accepted in query strings and form bodies
const CSRF_FIELD: &str = "_csrf";

/// Headers checked for a token, in order
const CSRF_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

#[derive(Debug, Default, Deserialize)]
struct TokenField {
    #[serde(rename = "_csrf")]
    token: Option<String>,
}

/// Mints tokens for the current client
///
/// Added to the request extensions by the CSRF stage. Handlers that render
/// forms or bootstrap API clients hand out [`CsrfToken::token`].
#[derive(Debug, Clone)]
pub struct CsrfToken {
    secret: String,
}

impl CsrfToken {
    /// A fresh token for this client's secret
    pub fn token(&self) -> String {
        csrf::create_token(&self.secret)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CsrfToken>()
            .cloned()
            .ok_or_else(|| ApiError::InternalError("CSRF stage is not installed".to_string()))
    }
}

/// Validates anti-forgery tokens on state-changing requests
///
/// The client's secret lives in the `_csrf` cookie and is issued on first
/// contact. `POST`, `PUT`, `PATCH` and `DELETE` must present a token minted
/// from that secret, in a header, the `_csrf` query parameter, or the `_csrf`
/// field of a url-encoded body.
pub struct CsrfStage {
    secure_cookie: bool,
    body_limit: usize,
}

impl CsrfStage {
    pub fn new(secure_cookie: bool, body_limit: usize) -> Self {
        Self {
            secure_cookie,
            body_limit,
        }
    }

    fn issue_secret(&self, cookies: &Cookies) -> String {
        let secret = csrf::generate_secret();
        let cookie = Cookie::build((CSRF_COOKIE, secret.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .build();
        cookies.add(cookie);
        secret
    }

    /// Reads the `_csrf` field of a url-encoded body, putting the body back
    async fn token_from_body(&self, ctx: &mut RequestContext) -> Result<Option<String>, ApiError> {
        if !is_form_encoded(ctx.request.headers()) {
            return Ok(None);
        }

        let (parts, body) = std::mem::take(&mut ctx.request).into_parts();
        let bytes = to_bytes(body, self.body_limit)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

        let field: TokenField = serde_urlencoded::from_bytes(&bytes).unwrap_or_default();
        ctx.request = Request::from_parts(parts, Body::from(bytes));

        Ok(field.token)
    }
}

fn is_state_changing(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    CSRF_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl PipelineStage for CsrfStage {
    async fn execute(&self, ctx: &mut RequestContext) -> Result<Option<Response>, ApiError> {
        let Some(cookies) = ctx.request.extensions().get::<Cookies>().cloned() else {
            return Err(ApiError::InternalError(
                "Cookie layer is not installed".to_string(),
            ));
        };

        let secret = match cookies.get(CSRF_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
            _ => self.issue_secret(&cookies),
        };

        ctx.request.extensions_mut().insert(CsrfToken {
            secret: secret.clone(),
        });

        if !is_state_changing(ctx.request.method()) {
            return Ok(None);
        }

        let mut token = token_from_headers(ctx.request.headers());

        if token.is_none() {
            token = Query::<TokenField>::try_from_uri(ctx.request.uri())
                .ok()
                .and_then(|Query(field)| field.token);
        }

        if token.is_none() {
            token = self.token_from_body(ctx).await?;
        }

        match token {
            Some(token) if csrf::verify_token(&secret, &token) => Ok(None),
            _ => {
                tracing::debug!(field = CSRF_FIELD, "CSRF token missing or invalid");
                Err(ApiError::InvalidCsrfToken)
            }
        }
    }

    fn name(&self) -> &'static str {
        "csrf"
    }
}
