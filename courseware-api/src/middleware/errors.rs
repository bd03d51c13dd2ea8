/// Error responder
///
/// The outermost middleware. Responses produced from an [`ApiError`] carry an
/// [`ErrorReport`] extension; this layer re-renders them for the operating
/// mode, so development clients see the full detail and everyone else sees
/// only the message:
///
/// ```json
/// { "message": "Forbidden", "error": {} }
/// ```
///
/// Error responses produced outside our handlers (routing misses, extractor
/// rejections, body limits) are rendered the same way. A method the router
/// does not serve counts as a routing miss and becomes `404 Not Found`.
///
/// Headers already set on the response, such as session and CSRF cookies,
/// are preserved.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{
    config::Mode,
    error::{ApiError, ErrorReport},
};

/// Middleware entry point for `axum::middleware::from_fn_with_state`
pub async fn render_errors(State(mode): State<Mode>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let report = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => report,
        None => match untagged_report(response.status()) {
            Some(report) => report,
            None => return response,
        },
    };

    let mut rendered = report.into_response(mode.exposes_error_detail());

    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }

    rendered
}

/// Report for an error response that did not come from an `ApiError`
fn untagged_report(status: StatusCode) -> Option<ErrorReport> {
    if status == StatusCode::NOT_FOUND || status == StatusCode::METHOD_NOT_ALLOWED {
        return Some(ApiError::not_found().report());
    }

    if !status.is_client_error() && !status.is_server_error() {
        return None;
    }

    let kind = match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
        StatusCode::UNPROCESSABLE_ENTITY => "validation_error",
        s if s.is_server_error() => "internal_error",
        _ => "http_error",
    };

    let message = status.canonical_reason().unwrap_or("Error").to_string();

    Some(ErrorReport {
        status,
        kind,
        description: message.clone(),
        message,
        details: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        response::IntoResponse,
        routing::get,
        Router,
    };
    use serde_json::{json, Value};
    use tower::Service as _;

    async fn forbidden() -> ApiError {
        ApiError::Forbidden("Forbidden".to_string())
    }

    async fn with_cookie() -> impl IntoResponse {
        (
            [(header::SET_COOKIE, "_csrf=abc; Path=/")],
            ApiError::Unauthorized("Invalid username or password".to_string()),
        )
    }

    async fn ok() -> &'static str {
        "fine"
    }

    fn app(mode: Mode) -> Router {
        Router::new()
            .route("/forbidden", get(forbidden))
            .route("/cookie", get(with_cookie))
            .route("/ok", get(ok))
            .layer(axum::middleware::from_fn_with_state(mode, render_errors))
    }

    async fn call(mode: Mode, method: &str, uri: &str) -> (StatusCode, Response) {
        let response = app(mode)
            .call(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        (response.status(), response)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_development_exposes_detail() {
        let (status, response) = call(Mode::Development, "GET", "/forbidden").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let body = json_body(response).await;
        assert_eq!(body["message"], "Forbidden");
        assert_eq!(body["error"]["status"], 403);
        assert_eq!(body["error"]["kind"], "forbidden");
    }

    #[tokio::test]
    async fn test_other_modes_hide_detail() {
        for mode in [Mode::Production, Mode::Test, Mode::Other] {
            let (status, response) = call(mode, "GET", "/forbidden").await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(
                json_body(response).await,
                json!({ "message": "Forbidden", "error": {} })
            );
        }
    }

    #[tokio::test]
    async fn test_routing_miss_is_not_found() {
        let (status, response) = call(Mode::Production, "GET", "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["message"], "Not Found");

        let (status, _) = call(Mode::Production, "DELETE", "/ok").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_headers_preserved() {
        let (status, response) = call(Mode::Production, "GET", "/cookie").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::SET_COOKIE).unwrap(),
            "_csrf=abc; Path=/"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_success_untouched() {
        let (status, response) = call(Mode::Development, "GET", "/ok").await;
        assert_eq!(status, StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"fine");
    }
}
