/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use courseware_api::{app::{build_router, AppState}, config::Config, routes::RouteGroups};
/// use courseware_shared::db::users::PgUserStore;
/// use sqlx::PgPool;
/// use tower_sessions_sqlx_store::PostgresStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgUserStore::new(pool.clone())), config);
///
/// let app = build_router(state, PostgresStore::new(pool), RouteGroups::default());
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, handler::HandlerWithoutStateExt, middleware, Router};
use courseware_shared::db::users::UserStore;
use sha2::{Digest, Sha512};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tower_sessions::{
    cookie::{Key, SameSite},
    Expiry, SessionManagerLayer, SessionStore,
};
use tracing::Level;

use crate::{
    config::Config,
    middleware::errors::render_errors,
    pipeline::{run_pipeline, Pipeline},
    routes::{self, RouteGroups},
};

const SESSION_COOKIE: &str = "courseware.sid";

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, config: Config) -> Self {
        Self {
            users,
            config: Arc::new(config),
        }
    }
}

/// Derives the 64-byte cookie signing key from the configured secret
fn session_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Builds the complete application
///
/// # Middleware Stack
///
/// Outermost first:
///
/// 1. Error responder (`middleware::errors`)
/// 2. Request logging (tower-http `TraceLayer`)
/// 3. Body size limit
/// 4. Sessions (signed cookie, inactivity expiry)
/// 5. Cookie parsing
/// 6. Request pipeline (`pipeline::Pipeline::standard`)
///
/// The pipeline runs before routing, so a rewritten method is what the
/// router dispatches on and a rejected request never reaches a handler.
///
/// # Routing
///
/// The mounted route groups first, then static files from the public
/// directory, then the not-found fallback.
pub fn build_router<S>(state: AppState, session_store: S, groups: RouteGroups) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config.clone();
    let mode = config.mode;

    let static_files = ServeDir::new(&config.api.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(routes::not_found.into_service());

    let routes = groups
        .into_router()
        .fallback_service(static_files)
        .with_state(state.clone());

    let pipeline = Pipeline::standard(mode, state.users.clone(), config.api.body_limit);

    let sessions = SessionManagerLayer::new(session_store)
        .with_name(SESSION_COOKIE)
        .with_secure(mode.is_production())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session.idle_minutes,
        )))
        .with_signed(session_key(&config.session.secret));

    tracing::debug!(stages = ?pipeline.stage_names(), ?mode, "Request pipeline assembled");

    Router::new()
        .fallback_service(routes)
        .layer(middleware::from_fn_with_state(pipeline, run_pipeline))
        .layer(CookieManagerLayer::new())
        .layer(sessions)
        .layer(DefaultBodyLimit::max(config.api.body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn_with_state(mode, render_errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_stable() {
        let secret = "a-session-secret-that-is-long-enough";
        assert_eq!(session_key(secret).master(), session_key(secret).master());
        assert_ne!(
            session_key(secret).master(),
            session_key("another-session-secret-long-enough").master()
        );
    }
}
