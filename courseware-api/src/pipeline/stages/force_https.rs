use async_trait::async_trait;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    error::ApiError,
    pipeline::{PipelineStage, RequestContext},
};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Redirects requests that did not arrive over HTTPS
///
/// TLS terminates at the proxy, so the only signal is `X-Forwarded-Proto`.
/// Anything other than `https` is answered with `302 Found` pointing at the
/// same host and URI under `https://`.
pub struct ForceHttpsStage;

#[async_trait]
impl PipelineStage for ForceHttpsStage {
    async fn execute(&self, ctx: &mut RequestContext) -> Result<Option<Response>, ApiError> {
        let headers = ctx.request.headers();

        let proto = headers
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if proto == "https" {
            return Ok(None);
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing Host header".to_string()))?;

        let path = ctx
            .request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let location = format!("https://{}{}", host, path);

        Ok(Some(
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        ))
    }

    fn name(&self) -> &'static str {
        "force_https"
    }
}
