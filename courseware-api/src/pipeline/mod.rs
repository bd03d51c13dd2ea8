//! Request pipeline
//!
//! The security-relevant part of request handling is an explicit, ordered
//! list of named stages run by a single middleware before route dispatch.
//! Each stage inspects or rewrites the request held in [`RequestContext`]
//! and either lets the request continue, answers it early, or fails it.
//!
//! The standard order is fixed:
//!
//! ```text
//! force_https        (production only)
//! method_override
//! restore_identity
//! csrf
//! capability_gates
//! ```
//!
//! Sessions and cookies are established by layers wrapped around the runner,
//! so every stage can rely on them.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use courseware_shared::{db::users::UserStore, models::user::User};
use tracing::{debug, warn};

use crate::{config::Mode, error::ApiError, routes::MOUNTS};

pub mod stages;

use stages::{
    CapabilityGateStage, CsrfStage, ForceHttpsStage, MethodOverrideStage, RestoreIdentityStage,
};

/// Per-request state shared by the stages
pub struct RequestContext {
    pub request: Request,

    /// Identity resolved from the session, filled in by `restore_identity`
    pub user: Option<User>,
}

impl RequestContext {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            user: None,
        }
    }
}

/// A named step of the request pipeline
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Runs the stage
    ///
    /// Returns:
    /// - `Ok(None)` - continue with the next stage
    /// - `Ok(Some(response))` - answer the request now (e.g. a redirect)
    /// - `Err(error)` - fail the request; the error responder renders it
    async fn execute(&self, ctx: &mut RequestContext) -> Result<Option<Response>, ApiError>;

    /// Stage name for logging
    fn name(&self) -> &'static str;
}

/// Ordered list of stages composed by one runner
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<Vec<Box<dyn PipelineStage>>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn PipelineStage>>) -> Self {
        Self {
            stages: Arc::new(stages),
        }
    }

    /// The standard pipeline for `mode`
    pub fn standard(mode: Mode, users: Arc<dyn UserStore>, body_limit: usize) -> Self {
        let mut stages: Vec<Box<dyn PipelineStage>> = Vec::new();

        if mode.is_production() {
            stages.push(Box::new(ForceHttpsStage));
        }

        stages.push(Box::new(MethodOverrideStage));
        stages.push(Box::new(RestoreIdentityStage::new(users)));
        stages.push(Box::new(CsrfStage::new(mode.is_production(), body_limit)));
        stages.push(Box::new(CapabilityGateStage::new(&MOUNTS)));

        Self::new(stages)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage in order, then hands the request to `next`
    pub async fn run(&self, request: Request, next: Next) -> Response {
        let mut ctx = RequestContext::new(request);

        for (idx, stage) in self.stages.iter().enumerate() {
            match stage.execute(&mut ctx).await {
                Ok(None) => continue,
                Ok(Some(response)) => {
                    debug!(
                        stage = stage.name(),
                        status = %response.status(),
                        "Stage {} answered the request",
                        idx + 1
                    );
                    return response;
                }
                Err(err) => {
                    warn!(
                        stage = stage.name(),
                        status = %err.status(),
                        "Stage {} rejected the request: {}",
                        idx + 1,
                        err
                    );
                    return err.into_response();
                }
            }
        }

        next.run(ctx.request).await
    }
}

/// Middleware entry point for `axum::middleware::from_fn_with_state`
pub async fn run_pipeline(
    State(pipeline): State<Pipeline>,
    request: Request,
    next: Next,
) -> Response {
    pipeline.run(request, next).await
}
