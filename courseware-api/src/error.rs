/// Error handling for the API server
///
/// Handlers, pipeline stages and the not-found fallback all fail with
/// [`ApiError`]. Converting an `ApiError` into a response attaches an
/// [`ErrorReport`] to the response extensions; the error responder
/// (`middleware::errors`) turns that report into the final error view for the
/// current operating mode.
///
/// # Error view
///
/// ```json
/// { "message": "Forbidden", "error": {} }
/// ```
///
/// In development mode `error` carries `status`, `kind`, `description` and
/// any validation `details`.
///
/// # Example
///
/// ```
/// use courseware_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler() -> ApiResult<Json<Value>> {
///     Err(ApiError::Forbidden("Forbidden".to_string()))
/// }
/// ```

use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courseware_shared::{
    auth::{gates::GateError, password::PasswordError},
    db::users::StoreError,
    models::user::UserError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or mismatched anti-forgery token (403)
    #[error("Invalid CSRF token")]
    InvalidCsrfToken,

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unprocessable entity (422)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500); the payload is never shown outside development
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// What the error responder needs to render an error
///
/// Stored in the response extensions by `ApiError::into_response`.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub description: String,
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// The rendered error view
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorView {
    pub message: String,
    pub error: Value,
}

impl ApiError {
    /// The not-found condition synthesized for unmatched requests
    pub fn not_found() -> Self {
        ApiError::NotFound("Not Found".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::InvalidCsrfToken => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::InvalidCsrfToken => "invalid_csrf_token",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
        }
    }

    /// Message shown to clients in every mode
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg.clone(),
            ApiError::InvalidCsrfToken => "Invalid CSRF token".to_string(),
            ApiError::ValidationError(_) => "Request validation failed".to_string(),
            ApiError::InternalError(_) => "Internal Server Error".to_string(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            status: self.status(),
            kind: self.kind(),
            message: self.message(),
            description: self.to_string(),
            details: match self {
                ApiError::ValidationError(details) => Some(details.clone()),
                _ => None,
            },
        }
    }
}

impl ErrorReport {
    /// Renders the error view, with full detail only when `expose_detail`
    pub fn render(&self, expose_detail: bool) -> ErrorView {
        let error = if expose_detail {
            let mut detail = json!({
                "status": self.status.as_u16(),
                "kind": self.kind,
                "description": self.description,
            });
            if let Some(details) = &self.details {
                detail["details"] = json!(details);
            }
            detail
        } else {
            json!({})
        };

        ErrorView {
            message: self.message.clone(),
            error,
        }
    }

    pub fn into_response(self, expose_detail: bool) -> Response {
        let view = self.render(expose_detail);
        let mut response = (self.status, Json(view)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InternalError(cause) => tracing::error!("Internal error: {}", cause),
            other => tracing::debug!(status = %other.status(), "{}", other),
        }

        // Rendered without detail until the error responder sees it
        self.report().into_response(false)
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            GateError::NotAdmin => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(UserError::Validation(errors)) => errors.into(),
            StoreError::Invalid(err @ UserError::SelfReference(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            StoreError::UnknownClient(_) => ApiError::BadRequest(err.to_string()),
            StoreError::Database(err) => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::InternalError(format!("Session error: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
