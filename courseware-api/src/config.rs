/// Configuration management for the API server
///
/// The operating mode is resolved once, before anything else, and decides
/// how the rest of the configuration is sourced:
///
/// - `production`: process environment only
/// - `test`: the storage URL is replaced by `TEST_DB`
/// - anything else: a local `.env` file is loaded first (if present)
///
/// # Environment Variables
///
/// - `APP_ENV` (falls back to `NODE_ENV`): operating mode
/// - `DATABASE_URL` (alias `MONGOLAB_URI`): storage connection string
/// - `TEST_DB`: storage connection string used in test mode
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `SESSION_KEY`: session signing secret, at least 32 characters (required)
/// - `SESSION_IDLE_MINUTES`: session inactivity expiry, 1 to 525600 (default: 1440)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT` (alias `PORT`): port to bind to (default: 3000)
/// - `PUBLIC_DIR`: static file directory (default: public)
/// - `BODY_LIMIT_BYTES`: maximum request body size (default: 1 MiB)
///
/// # Example
///
/// ```no_run
/// use courseware_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("{:?} mode, listening on {}", config.mode, config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::{env, fmt, path::PathBuf};

const MIN_SESSION_KEY_LEN: usize = 32;

/// Longest accepted session inactivity window, one year
const MAX_SESSION_IDLE_MINUTES: i64 = 525_600;

/// Deployment context the server runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Test,
    Production,
    /// Any other named environment (e.g. `staging`)
    Other,
}

impl Mode {
    /// Parses the raw mode value; unset means development
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("development") => Mode::Development,
            Some("test") => Mode::Test,
            Some("production") => Mode::Production,
            Some(_) => Mode::Other,
        }
    }

    /// Reads `APP_ENV`, then `NODE_ENV`, from the process environment
    pub fn from_env() -> Self {
        let raw = env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).ok();
        Self::from_value(raw.as_deref())
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    /// Whether error responses carry internal detail
    pub fn exposes_error_detail(self) -> bool {
        self == Mode::Development
    }

    /// Whether a local `.env` file is consulted
    pub fn loads_dotenv(self) -> bool {
        matches!(self, Mode::Development | Mode::Other)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mode: Mode,

    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub session: SessionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Directory served as static files (also holds `favicon.ico`)
    pub public_dir: PathBuf,

    /// Maximum accepted request body, in bytes
    pub body_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Effective connection URL (already resolved for the mode)
    pub url: String,

    pub max_connections: u32,
}

/// Session configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Signing secret for the session cookie
    pub secret: String,

    /// Sessions expire after this many minutes without activity
    pub idle_minutes: i64,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("idle_minutes", &self.idle_minutes)
            .finish()
    }
}

impl Config {
    /// Resolves the mode and loads configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        let mode = Mode::from_env();

        if mode.loads_dotenv() {
            dotenvy::dotenv().ok();
        }

        Self::from_vars(mode, |key| env::var(key).ok())
    }

    /// Builds configuration for `mode` from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or malformed.
    pub fn from_vars<F>(mode: Mode, var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .or_else(|| var("PORT"))
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()?;

        let public_dir = var("PUBLIC_DIR").unwrap_or_else(|| "public".to_string()).into();
        let body_limit = var("BODY_LIMIT_BYTES")
            .unwrap_or_else(|| (1024 * 1024).to_string())
            .parse::<usize>()?;

        let database_url = match mode {
            Mode::Test => var("TEST_DB")
                .ok_or_else(|| anyhow::anyhow!("TEST_DB environment variable is required in test mode"))?,
            _ => var("DATABASE_URL").or_else(|| var("MONGOLAB_URI")).ok_or_else(|| {
                anyhow::anyhow!("DATABASE_URL (or MONGOLAB_URI) environment variable is required")
            })?,
        };

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let secret = var("SESSION_KEY")
            .ok_or_else(|| anyhow::anyhow!("SESSION_KEY environment variable is required"))?;

        if secret.len() < MIN_SESSION_KEY_LEN {
            anyhow::bail!(
                "SESSION_KEY must be at least {} characters long",
                MIN_SESSION_KEY_LEN
            );
        }

        let idle_minutes = var("SESSION_IDLE_MINUTES")
            .unwrap_or_else(|| "1440".to_string())
            .parse::<i64>()?;

        if !(1..=MAX_SESSION_IDLE_MINUTES).contains(&idle_minutes) {
            anyhow::bail!(
                "SESSION_IDLE_MINUTES must be between 1 and {}",
                MAX_SESSION_IDLE_MINUTES
            );
        }

        Ok(Self {
            mode,
            api: ApiConfig {
                host,
                port,
                public_dir,
                body_limit,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            session: SessionConfig {
                secret,
                idle_minutes,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the shared storage connection
    pub fn pool_config(&self) -> courseware_shared::db::pool::DatabaseConfig {
        courseware_shared::db::pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "test-session-key-at-least-32-bytes-long";

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_mode_from_value() {
        assert_eq!(Mode::from_value(None), Mode::Development);
        assert_eq!(Mode::from_value(Some("development")), Mode::Development);
        assert_eq!(Mode::from_value(Some("test")), Mode::Test);
        assert_eq!(Mode::from_value(Some("production")), Mode::Production);
        assert_eq!(Mode::from_value(Some("staging")), Mode::Other);
    }

    #[test]
    fn test_mode_flags() {
        assert!(Mode::Production.is_production());
        assert!(Mode::Development.exposes_error_detail());
        assert!(!Mode::Production.exposes_error_detail());
        assert!(!Mode::Other.exposes_error_detail());
        assert!(Mode::Other.loads_dotenv());
        assert!(!Mode::Test.loads_dotenv());
        assert!(!Mode::Production.loads_dotenv());
    }

    #[test]
    fn test_test_mode_uses_test_db() {
        let config = Config::from_vars(
            Mode::Test,
            vars(&[
                ("TEST_DB", "mongodb://test"),
                ("MONGOLAB_URI", "mongodb://live"),
                ("SESSION_KEY", KEY),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.url, "mongodb://test");
    }

    #[test]
    fn test_test_mode_requires_test_db() {
        let result = Config::from_vars(
            Mode::Test,
            vars(&[("DATABASE_URL", "postgres://live"), ("SESSION_KEY", KEY)]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_storage_alias() {
        let config = Config::from_vars(
            Mode::Production,
            vars(&[("MONGOLAB_URI", "postgres://legacy"), ("SESSION_KEY", KEY)]),
        )
        .unwrap();
        assert_eq!(config.database.url, "postgres://legacy");

        let config = Config::from_vars(
            Mode::Production,
            vars(&[
                ("DATABASE_URL", "postgres://primary"),
                ("MONGOLAB_URI", "postgres://legacy"),
                ("SESSION_KEY", KEY),
            ]),
        )
        .unwrap();
        assert_eq!(config.database.url, "postgres://primary");
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(
            Mode::Development,
            vars(&[("DATABASE_URL", "postgres://localhost/db"), ("SESSION_KEY", KEY)]),
        )
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.api.public_dir, PathBuf::from("public"));
        assert_eq!(config.api.body_limit, 1024 * 1024);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.session.idle_minutes, 1440);
        assert_eq!(config.pool_config().url, "postgres://localhost/db");
    }

    #[test]
    fn test_session_key_required_and_long() {
        let missing = Config::from_vars(
            Mode::Development,
            vars(&[("DATABASE_URL", "postgres://localhost/db")]),
        );
        assert!(missing.is_err());

        let short = Config::from_vars(
            Mode::Development,
            vars(&[("DATABASE_URL", "postgres://localhost/db"), ("SESSION_KEY", "short")]),
        );
        assert!(short.is_err());
    }

    #[test]
    fn test_session_secret_redacted() {
        let config = Config::from_vars(
            Mode::Development,
            vars(&[("DATABASE_URL", "postgres://localhost/db"), ("SESSION_KEY", KEY)]),
        )
        .unwrap();

        let printed = format!("{:?}", config);
        assert!(!printed.contains(KEY));
    }

    #[test]
    fn test_session_idle_minutes_bounded() {
        let with_idle = |minutes: &str| {
            Config::from_vars(
                Mode::Development,
                vars(&[
                    ("DATABASE_URL", "postgres://localhost/db"),
                    ("SESSION_KEY", KEY),
                    ("SESSION_IDLE_MINUTES", minutes),
                ]),
            )
        };

        assert_eq!(with_idle("1").unwrap().session.idle_minutes, 1);
        assert_eq!(with_idle("525600").unwrap().session.idle_minutes, 525_600);

        for rejected in ["0", "-30", "525601", "9223372036854775807"] {
            assert!(with_idle(rejected).is_err(), "{}", rejected);
        }
    }
}
