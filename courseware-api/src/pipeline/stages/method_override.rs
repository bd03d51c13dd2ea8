use async_trait::async_trait;
use axum::{
    extract::Query,
    http::Method,
    response::Response,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    pipeline::{PipelineStage, RequestContext},
};

#[derive(Debug, Deserialize)]
struct OverrideParam {
    #[serde(rename = "_method")]
    method: Option<String>,
}

/// Lets HTML forms issue PUT, PATCH and DELETE
///
/// A `POST` carrying `?_method=<verb>` is re-dispatched with that verb.
/// Unknown verbs and non-`POST` requests are left alone. Must run before
/// route dispatch since routing matches on the method.
pub struct MethodOverrideStage;

fn override_target(value: &str) -> Option<Method> {
    match value.trim().to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

#[async_trait]
impl PipelineStage for MethodOverrideStage {
    async fn execute(&self, ctx: &mut RequestContext) -> Result<Option<Response>, ApiError> {
        if ctx.request.method() != Method::POST {
            return Ok(None);
        }

        let target = Query::<OverrideParam>::try_from_uri(ctx.request.uri())
            .ok()
            .and_then(|Query(param)| param.method)
            .and_then(|value| override_target(&value));

        if let Some(method) = target {
            tracing::debug!(%method, "Overriding POST method");
            *ctx.request.method_mut() = method;
        }

        Ok(None)
    }

    fn name(&self) -> &'static str {
        "method_override"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Request};

    async fn method_after(method: Method, uri: &str) -> Method {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let mut ctx = RequestContext::new(request);

        assert!(MethodOverrideStage.execute(&mut ctx).await.unwrap().is_none());
        ctx.request.method().clone()
    }

    #[tokio::test]
    async fn test_post_overridden() {
        assert_eq!(method_after(Method::POST, "/api/users/1?_method=delete").await, Method::DELETE);
        assert_eq!(method_after(Method::POST, "/api/users/1?_method=PATCH").await, Method::PATCH);
    }

    #[tokio::test]
    async fn test_only_post_is_overridden() {
        assert_eq!(method_after(Method::GET, "/?_method=DELETE").await, Method::GET);
    }

    #[tokio::test]
    async fn test_unknown_verb_ignored() {
        assert_eq!(method_after(Method::POST, "/?_method=TRACE").await, Method::POST);
        assert_eq!(method_after(Method::POST, "/").await, Method::POST);
    }
}
