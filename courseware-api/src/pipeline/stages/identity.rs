use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use courseware_shared::db::users::UserStore;
use tower_sessions::Session;
use tracing::debug;

use crate::{
    auth::{self, CurrentUser, USER_ID_KEY},
    error::ApiError,
    pipeline::{PipelineStage, RequestContext},
};

/// Restores the authenticated identity from the session
///
/// A session naming a user that no longer exists is logged out rather than
/// failing the request.
pub struct RestoreIdentityStage {
    users: Arc<dyn UserStore>,
}

impl RestoreIdentityStage {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl PipelineStage for RestoreIdentityStage {
    async fn execute(&self, ctx: &mut RequestContext) -> Result<Option<Response>, ApiError> {
        let Some(session) = ctx.request.extensions().get::<Session>().cloned() else {
            return Err(ApiError::InternalError(
                "Session layer is not installed".to_string(),
            ));
        };

        let Some(user_id) = auth::session_user_id(&session).await? else {
            return Ok(None);
        };

        match self.users.find_by_id(user_id).await? {
            Some(user) => {
                ctx.request.extensions_mut().insert(CurrentUser(user.clone()));
                ctx.user = Some(user);
            }
            None => {
                debug!(user_id = %user_id, "Session references a missing user, clearing identity");
                session.remove::<uuid::Uuid>(USER_ID_KEY).await?;
            }
        }

        Ok(None)
    }

    fn name(&self) -> &'static str {
        "restore_identity"
    }
}
