/// User endpoints, mounted at `/api/users`
///
/// Every endpoint sits behind the authenticated gate.
///
/// # Endpoints
///
/// - `GET /api/users` - list users
/// - `POST /api/users` - create a user (admin only)
/// - `GET /api/users/me` - the logged-in user
/// - `GET /api/users/:id` - one user
/// - `PATCH /api/users/:id` - partial update
///
/// # Write rules
///
/// Users may edit their own profile fields and password. Changing another
/// user, a role flag or the client reference requires the admin flag.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use courseware_shared::{
    auth::password,
    models::user::{NewUser, UpdateUser, User},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    auth::CurrentUser,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::JsonOrForm,
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(me))
        .route("/:id", get(get_user).patch(update_user))
}

/// Pagination parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Page size, 1 to 100 (default 50)
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}

impl ListParams {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Page of users
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub limit: i64,
    pub offset: i64,
}

/// Create request: the user fields plus a plaintext password
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(flatten)]
    pub user: NewUser,

    pub password: Option<String>,
}

/// Update request: the changed fields plus an optional new password
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(flatten)]
    pub changes: UpdateUser,

    pub password: Option<String>,
}

fn hash_new_password(plaintext: &str) -> ApiResult<String> {
    password::validate_password(plaintext).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }])
    })?;

    Ok(password::hash_password(plaintext)?)
}

fn touches_privileges(changes: &UpdateUser) -> bool {
    changes.is_client.is_some()
        || changes.is_admin.is_some()
        || changes.is_instructor.is_some()
        || changes.is_student.is_some()
        || changes.client.is_some()
}

/// List users in creation order
///
/// ```text
/// GET /api/users?limit=20&offset=40
/// ```
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListUsersResponse>> {
    let (limit, offset) = (params.limit(), params.offset());
    let users = state.users.list(limit, offset).await?;

    Ok(Json(ListUsersResponse {
        users,
        limit,
        offset,
    }))
}

/// Create a user
///
/// ```text
/// POST /api/users
/// Content-Type: application/json
///
/// { "username": "kim", "password": "s3cret-pass", "is_student": true }
/// ```
///
/// Omitted fields take their defaults. Without a password the account
/// exists but cannot log in.
///
/// # Errors
///
/// - `403 Forbidden`: caller is not an admin
/// - `422 Unprocessable Entity`: validation failed
/// - `400 Bad Request`: `client` names an unknown user
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonOrForm(req): JsonOrForm<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if !caller.is_admin {
        return Err(ApiError::Forbidden(
            "Administrator access required".to_string(),
        ));
    }

    let mut data = req.user;
    data.password = match req.password.as_deref() {
        Some(plaintext) => hash_new_password(plaintext)?,
        None => String::new(),
    };

    let user = state.users.create(data).await?;
    tracing::info!(user_id = %user.id, created_by = %caller.id, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// The logged-in user
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    state
        .users
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Partially update a user
///
/// ```text
/// PATCH /api/users/:id
/// Content-Type: application/json
///
/// { "phone": "555-0100", "client": null }
/// ```
///
/// `null` clears `idn` or `client`; absent fields are left as they are.
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    JsonOrForm(req): JsonOrForm<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let mut changes = req.changes;

    if !caller.is_admin && (caller.id != id || touches_privileges(&changes)) {
        return Err(ApiError::Forbidden(
            "Administrator access required".to_string(),
        ));
    }

    changes.password = req.password.as_deref().map(hash_new_password).transpose()?;

    let user = state
        .users
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, updated_by = %caller.id, "User updated");

    Ok(Json(user))
}
