/// Session endpoints, mounted at `/`
///
/// # Endpoints
///
/// - `GET /` - session status, a CSRF token and pending flash messages
/// - `POST /login` - authenticate with username and password
/// - `POST /logout` - end the session and redirect to `/`

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use courseware_shared::{
    auth::password,
    models::user::{Role, User},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use validator::Validate;

use crate::{
    app::AppState,
    auth::{self, CurrentUser},
    error::{ApiError, ApiResult},
    extract::JsonOrForm,
    flash::{Flash, FlashKind, FlashMessage},
    pipeline::stages::CsrfToken,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(status))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub authenticated: bool,

    /// The logged-in user, if any
    pub user: Option<User>,

    /// Role flags the logged-in user holds, empty when anonymous
    pub roles: Vec<Role>,

    /// Token to send back with state-changing requests
    pub csrf_token: String,

    /// Messages staged by the previous request
    pub flash: Vec<FlashMessage>,

    pub version: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Session status
///
/// Always public. Clients call it first to pick up a CSRF token.
///
/// ```text
/// GET /
/// ```
///
/// ```json
/// {
///   "authenticated": false,
///   "user": null,
///   "roles": [],
///   "csrf_token": "3f9c...-a41e...",
///   "flash": [],
///   "version": "0.1.0"
/// }
/// ```
pub async fn status(
    current: Option<CurrentUser>,
    csrf: CsrfToken,
    flash: Flash,
) -> ApiResult<Json<StatusResponse>> {
    let user = current.map(|CurrentUser(user)| user);

    Ok(Json(StatusResponse {
        authenticated: user.is_some(),
        roles: user.as_ref().map(User::roles).unwrap_or_default(),
        user,
        csrf_token: csrf.token(),
        flash: flash.take().await?,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Log in
///
/// ```text
/// POST /login
/// Content-Type: application/json
/// X-CSRF-Token: <token>
///
/// { "username": "alice", "password": "correct horse" }
/// ```
///
/// An HTML form may post the same fields url-encoded, with the token in
/// the `_csrf` field.
///
/// Returns the user on success. Unknown usernames and wrong passwords get
/// the same `401` and stage an error flash message.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    flash: Flash,
    JsonOrForm(req): JsonOrForm<LoginRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = state.users.find_by_username(&req.username).await?;

    let verified = match &user {
        Some(user) => password::verify_password(&req.password, &user.password)?,
        None => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        tracing::debug!(username = %req.username, "Login rejected");
        flash.push(FlashKind::Error, INVALID_CREDENTIALS).await?;
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    auth::log_in(&session, &user).await?;

    Ok(Json(user))
}

/// Log out
///
/// Clears the session and answers `302 Found` to `/` with an info flash.
pub async fn logout(session: Session) -> ApiResult<Response> {
    auth::log_out(&session).await?;

    Flash::new(session)
        .push(FlashKind::Info, "You have been logged out")
        .await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, "/")]).into_response())
}
