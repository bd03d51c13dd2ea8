/// Route groups and the mount table
///
/// Every route group is mounted under a fixed path prefix and guarded by a
/// capability gate. The gate is evaluated by the pipeline's
/// `capability_gates` stage before routing, using [`MOUNTS`].
///
/// | prefix | gate |
/// |---|---|
/// | `/` | public |
/// | `/reset` | public |
/// | `/api/users` | authenticated |
/// | `/api/terms` | authenticated |
/// | `/api/courses` | authenticated |
/// | `/api/charges` | authenticated |
/// | `/api/locations` | admin |
///
/// - `index`: session status, login and logout
/// - `users`: user listing, creation and profile updates
///
/// The bodies of the remaining groups are supplied by the embedder through
/// [`RouteGroups`]; an unmounted group still has its gate applied and then
/// answers 404.

use axum::Router;
use courseware_shared::auth::gates::Capability;

use crate::{app::AppState, error::ApiError};

pub mod index;
pub mod users;

/// A route group's mount point and the gate guarding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mount {
    pub prefix: &'static str,
    pub capability: Capability,
}

const fn mount(prefix: &'static str, capability: Capability) -> Mount {
    Mount { prefix, capability }
}

/// The mount table, in dispatch priority order
pub static MOUNTS: [Mount; 7] = [
    mount("/", Capability::Public),
    mount("/reset", Capability::Public),
    mount("/api/users", Capability::Authenticated),
    mount("/api/terms", Capability::Authenticated),
    mount("/api/courses", Capability::Authenticated),
    mount("/api/charges", Capability::Authenticated),
    mount("/api/locations", Capability::Admin),
];

/// Whether `path` falls under `prefix`
///
/// The prefix must match whole segments: `/api/users` covers `/api/users`
/// and `/api/users/1`, not `/api/usersettings`.
fn covers(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path.starts_with('/');
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// The most specific mount covering `path`
pub fn mount_for<'a>(mounts: &'a [Mount], path: &str) -> Option<&'a Mount> {
    mounts
        .iter()
        .filter(|m| covers(m.prefix, path))
        .max_by_key(|m| m.prefix.len())
}

/// Route group bodies, one per mount point
pub struct RouteGroups {
    pub index: Option<Router<AppState>>,
    pub reset: Option<Router<AppState>>,
    pub users: Option<Router<AppState>>,
    pub terms: Option<Router<AppState>>,
    pub courses: Option<Router<AppState>>,
    pub charges: Option<Router<AppState>>,
    pub locations: Option<Router<AppState>>,
}

impl Default for RouteGroups {
    /// The groups implemented in this crate; the rest are unmounted
    fn default() -> Self {
        Self {
            index: Some(index::routes()),
            reset: None,
            users: Some(users::routes()),
            terms: None,
            courses: None,
            charges: None,
            locations: None,
        }
    }
}

impl RouteGroups {
    /// Assembles the mounted groups under their prefixes
    pub fn into_router(self) -> Router<AppState> {
        let mut router = Router::new();

        if let Some(index) = self.index {
            router = router.merge(index);
        }

        let nested = [
            ("/reset", self.reset),
            ("/api/users", self.users),
            ("/api/terms", self.terms),
            ("/api/courses", self.courses),
            ("/api/charges", self.charges),
            ("/api/locations", self.locations),
        ];

        for (prefix, group) in nested {
            if let Some(group) = group {
                router = router.nest(prefix, group);
            }
        }

        router
    }
}

/// Fallback for requests no route group or static file matched
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
