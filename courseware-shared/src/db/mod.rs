/// Storage layer for Courseware
///
/// # Modules
///
/// - `pool`: the process-wide PostgreSQL pool, created once and passed by
///   value to everything that needs storage (user store, session store)
/// - `migrations`: embedded schema migrations
/// - `users`: the [`users::UserStore`] trait with PostgreSQL and in-memory
///   implementations
///
/// # Example
///
/// ```no_run
/// use courseware_shared::db::pool::{create_pool, DatabaseConfig};
/// use courseware_shared::db::users::PgUserStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     let users = PgUserStore::new(pool.clone());
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
pub mod users;
