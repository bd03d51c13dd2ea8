use async_trait::async_trait;
use axum::response::Response;

use crate::{
    error::ApiError,
    pipeline::{PipelineStage, RequestContext},
    routes::{mount_for, Mount},
};

/// Evaluates the capability gate of the route group a request targets
///
/// Runs after identity restoration so the gate sees the session's user. The
/// gate applies to every path under the mount, including ones no handler
/// serves; those fall through to the not-found fallback once admitted.
pub struct CapabilityGateStage {
    mounts: &'static [Mount],
}

impl CapabilityGateStage {
    pub fn new(mounts: &'static [Mount]) -> Self {
        Self { mounts }
    }
}

#[async_trait]
impl PipelineStage for CapabilityGateStage {
    async fn execute(&self, ctx: &mut RequestContext) -> Result<Option<Response>, ApiError> {
        let Some(mount) = mount_for(self.mounts, ctx.request.uri().path()) else {
            return Ok(None);
        };

        mount.capability.check(ctx.user.as_ref()).map_err(|err| {
            tracing::debug!(prefix = mount.prefix, "Gate rejected request: {}", err);
            ApiError::from(err)
        })?;

        Ok(None)
    }

    fn name(&self) -> &'static str {
        "capability_gates"
    }
}
