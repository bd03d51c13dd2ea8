/// Session-backed authentication
///
/// The authenticated identity is the user id stored in the session under
/// [`USER_ID_KEY`]. The `restore_identity` pipeline stage resolves it on each
/// request and attaches a [`CurrentUser`] to the request extensions.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use courseware_shared::models::user::User;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::ApiError;

/// Session key holding the authenticated user's id
pub const USER_ID_KEY: &str = "user_id";

/// The user resolved from the session for this request
///
/// Extracting it fails with 401 when the request is anonymous. Use
/// `Option<CurrentUser>` where anonymous access is fine.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Records `user` as the session's identity
///
/// The session id is rotated first so a pre-login id cannot be reused.
pub async fn log_in(session: &Session, user: &User) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;
    tracing::info!(user_id = %user.id, name = %user.display_name(), "User logged in");
    Ok(())
}

/// Drops the session and everything in it
pub async fn log_out(session: &Session) -> Result<(), ApiError> {
    if let Some(user_id) = session.get::<Uuid>(USER_ID_KEY).await? {
        tracing::info!(user_id = %user_id, "User logged out");
    }
    session.flush().await?;
    Ok(())
}

/// Reads the identity stored in the session, if any
pub async fn session_user_id(session: &Session) -> Result<Option<Uuid>, ApiError> {
    Ok(session.get::<Uuid>(USER_ID_KEY).await?)
}
