/// User storage
///
/// Route handlers and the authentication stage talk to storage through the
/// [`UserStore`] trait. [`PgUserStore`] is backed by the shared PostgreSQL
/// pool; [`MemoryUserStore`] keeps records in process and is what the test
/// suites run against.
///
/// # Example
///
/// ```
/// use courseware_shared::db::users::{MemoryUserStore, UserStore};
/// use courseware_shared::models::NewUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryUserStore::new();
/// let user = store.create(NewUser::with_username("alice")).await?;
/// assert_eq!(store.find_by_id(user.id).await?, Some(user));
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::user::{NewUser, UpdateUser, User, UserError};

const USER_COLUMNS: &str = "id, username, password, is_client, is_admin, is_instructor, \
     is_student, first_name, last_name, phone, github, website, idn, client, created_at";

/// Error type for user storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record failed validation
    #[error(transparent)]
    Invalid(#[from] UserError),

    /// `client` names a user that does not exist
    #[error("Unknown client user {0}")]
    UnknownClient(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage operations on users
///
/// There is deliberately no delete operation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user, applying defaults to omitted fields
    async fn create(&self, data: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Finds the earliest-created user with this username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Lists users in creation order
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;

    /// Applies a partial update, returning `None` if the user does not exist
    async fn update(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError>;
}

/// PostgreSQL-backed user store
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_write_error(err: sqlx::Error, client: Option<Uuid>) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.constraint() == Some("users_client_fkey") {
                if let Some(client) = client {
                    return StoreError::UnknownClient(client);
                }
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, data: NewUser) -> Result<User, StoreError> {
        let user = User::from_new(Uuid::new_v4(), data)?;

        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password)
            .bind(user.is_client)
            .bind(user.is_admin)
            .bind(user.is_instructor)
            .bind(user.is_student)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(&user.github)
            .bind(&user.website)
            .bind(user.idn)
            .bind(user.client)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(e, user.client))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 \
             ORDER BY created_at, id LIMIT 1"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, User>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let next = current.apply(changes)?;

        let update = format!(
            "UPDATE users SET username = $2, password = $3, is_client = $4, is_admin = $5, \
             is_instructor = $6, is_student = $7, first_name = $8, last_name = $9, phone = $10, \
             github = $11, website = $12, idn = $13, client = $14 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&update)
            .bind(next.id)
            .bind(&next.username)
            .bind(&next.password)
            .bind(next.is_client)
            .bind(next.is_admin)
            .bind(next.is_instructor)
            .bind(next.is_student)
            .bind(&next.first_name)
            .bind(&next.last_name)
            .bind(&next.phone)
            .bind(&next.github)
            .bind(&next.website)
            .bind(next.idn)
            .bind(next.client)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Self::map_write_error(e, next.client))?;

        tx.commit().await?;

        Ok(Some(user))
    }
}

/// In-process user store
///
/// Keeps records in creation order behind a tokio `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, data: NewUser) -> Result<User, StoreError> {
        let user = User::from_new(Uuid::new_v4(), data)?;
        let mut users = self.users.write().await;

        if let Some(client) = user.client {
            if !users.iter().any(|u| u.id == client) {
                return Err(StoreError::UnknownClient(client));
            }
        }

        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(users.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        if let Some(Some(client)) = changes.client {
            if !users.iter().any(|u| u.id == client) {
                return Err(StoreError::UnknownClient(client));
            }
        }

        let Some(slot) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        let next = slot.apply(changes)?;
        *slot = next.clone();

        Ok(Some(next))
    }
}
