/// Flash messages
///
/// One-shot messages staged in the session by one request and consumed by
/// the next (typically across a redirect).

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::ApiError;

const FLASH_KEY: &str = "_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub message: String,
}

/// Handle on the session's flash queue
#[derive(Debug, Clone)]
pub struct Flash {
    session: Session,
}

impl Flash {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Stages a message for the next request
    pub async fn push(&self, kind: FlashKind, message: impl Into<String>) -> Result<(), ApiError> {
        let mut queue: Vec<FlashMessage> = self.session.get(FLASH_KEY).await?.unwrap_or_default();
        queue.push(FlashMessage {
            kind,
            message: message.into(),
        });
        self.session.insert(FLASH_KEY, queue).await?;
        Ok(())
    }

    /// Removes and returns every staged message
    pub async fn take(&self) -> Result<Vec<FlashMessage>, ApiError> {
        Ok(self
            .session
            .remove::<Vec<FlashMessage>>(FLASH_KEY)
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::InternalError(format!("Session unavailable: {}", msg)))?;

        Ok(Self::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn test_flash_is_consumed_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let flash = Flash::new(session);

        flash.push(FlashKind::Error, "Invalid username or password").await.unwrap();
        flash.push(FlashKind::Info, "Try again").await.unwrap();

        let messages = flash.take().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, FlashKind::Error);
        assert_eq!(messages[1].message, "Try again");

        assert!(flash.take().await.unwrap().is_empty());
    }
}
