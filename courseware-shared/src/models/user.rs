/// User model
///
/// The only entity declared by Courseware. A user carries credentials, four
/// independent role flags, profile fields and an optional weak reference to
/// another user (`client`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     username TEXT NOT NULL,
///     password TEXT NOT NULL DEFAULT '',
///     is_client BOOLEAN NOT NULL DEFAULT FALSE,
///     is_admin BOOLEAN NOT NULL DEFAULT FALSE,
///     is_instructor BOOLEAN NOT NULL DEFAULT FALSE,
///     is_student BOOLEAN NOT NULL DEFAULT FALSE,
///     first_name TEXT NOT NULL DEFAULT '',
///     last_name TEXT NOT NULL DEFAULT '',
///     phone TEXT NOT NULL DEFAULT '',
///     github TEXT NOT NULL DEFAULT '',
///     website TEXT NOT NULL DEFAULT '',
///     idn BIGINT,
///     client UUID REFERENCES users (id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Neither `username` nor `idn` is unique. The role flags are not mutually
/// exclusive: a user may hold any combination of them, or none.
///
/// # Example
///
/// ```
/// use courseware_shared::models::user::{NewUser, User};
/// use uuid::Uuid;
///
/// let user = User::from_new(Uuid::new_v4(), NewUser::with_username("alice")).unwrap();
/// assert!(!user.is_admin);
/// assert_eq!(user.first_name, "");
/// assert!(user.client.is_none());
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError};

/// Errors raised while constructing or updating a [`User`]
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid user: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A user cannot name itself as its own client
    #[error("User {0} cannot reference itself as client")]
    SelfReference(Uuid),
}

/// Role flags a user may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
    Instructor,
    Student,
}

/// A stored user record
///
/// Records are immutable values; updates produce a new record through
/// [`User::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub username: String,

    /// Password hash, produced by `auth::password::hash_password`
    ///
    /// Never serialized.
    #[serde(skip_serializing)]
    pub password: String,

    pub is_client: bool,
    pub is_admin: bool,
    pub is_instructor: bool,
    pub is_student: bool,

    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub github: String,
    pub website: String,

    /// Numeric identifier, not unique
    pub idn: Option<i64>,

    /// Weak reference to another user (the client this user belongs to)
    pub client: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a user
///
/// Only `username` is required. Every other field falls back to its
/// declared default when omitted.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewUser {
    #[validate(length(min = 1, max = 100, message = "Username must be 1 to 100 characters"))]
    pub username: String,

    /// Password hash (NOT the plaintext password)
    pub password: String,

    pub is_client: bool,
    pub is_admin: bool,
    pub is_instructor: bool,
    pub is_student: bool,

    #[validate(length(max = 100))]
    pub first_name: String,
    #[validate(length(max = 100))]
    pub last_name: String,
    #[validate(length(max = 50))]
    pub phone: String,
    #[validate(length(max = 100))]
    pub github: String,
    #[validate(length(max = 255), custom(function = "validate_website"))]
    pub website: String,

    pub idn: Option<i64>,
    pub client: Option<Uuid>,
}

impl NewUser {
    /// Creates an input carrying only a username
    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a user
///
/// `None` leaves a field untouched. `idn` and `client` use a nested option so
/// they can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 100, message = "Username must be 1 to 100 characters"))]
    pub username: Option<String>,

    /// New password hash
    pub password: Option<String>,

    pub is_client: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_instructor: Option<bool>,
    pub is_student: Option<bool>,

    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub github: Option<String>,
    #[validate(length(max = 255), custom(function = "validate_website"))]
    pub website: Option<String>,

    #[serde(deserialize_with = "nullable")]
    pub idn: Option<Option<i64>>,
    #[serde(deserialize_with = "nullable")]
    pub client: Option<Option<Uuid>>,
}

/// Website is optional, but when present must be a URL
fn validate_website(website: &str) -> Result<(), ValidationError> {
    if website.is_empty() || website.validate_url() {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message("Website must be a URL".into()))
    }
}

/// Keeps an explicit `null` apart from an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl User {
    /// Builds a record from creation input, applying defaults
    ///
    /// # Errors
    ///
    /// Returns `UserError::Validation` if the input fails validation and
    /// `UserError::SelfReference` if `client` names `id`.
    pub fn from_new(id: Uuid, data: NewUser) -> Result<Self, UserError> {
        data.validate()?;

        if data.client == Some(id) {
            return Err(UserError::SelfReference(id));
        }

        Ok(Self {
            id,
            username: data.username,
            password: data.password,
            is_client: data.is_client,
            is_admin: data.is_admin,
            is_instructor: data.is_instructor,
            is_student: data.is_student,
            first_name: data.first_name,
            last_name: data.last_name,
            phone: data.phone,
            github: data.github,
            website: data.website,
            idn: data.idn,
            client: data.client,
            created_at: Utc::now(),
        })
    }

    /// Returns a new record with `changes` applied
    ///
    /// # Errors
    ///
    /// Same as [`User::from_new`].
    pub fn apply(&self, changes: UpdateUser) -> Result<Self, UserError> {
        changes.validate()?;

        let mut next = self.clone();

        if let Some(username) = changes.username {
            next.username = username;
        }
        if let Some(password) = changes.password {
            next.password = password;
        }
        if let Some(flag) = changes.is_client {
            next.is_client = flag;
        }
        if let Some(flag) = changes.is_admin {
            next.is_admin = flag;
        }
        if let Some(flag) = changes.is_instructor {
            next.is_instructor = flag;
        }
        if let Some(flag) = changes.is_student {
            next.is_student = flag;
        }
        if let Some(first_name) = changes.first_name {
            next.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            next.last_name = last_name;
        }
        if let Some(phone) = changes.phone {
            next.phone = phone;
        }
        if let Some(github) = changes.github {
            next.github = github;
        }
        if let Some(website) = changes.website {
            next.website = website;
        }
        if let Some(idn) = changes.idn {
            next.idn = idn;
        }
        if let Some(client) = changes.client {
            if client == Some(self.id) {
                return Err(UserError::SelfReference(self.id));
            }
            next.client = client;
        }

        Ok(next)
    }

    /// Lists the role flags this user holds
    pub fn roles(&self) -> Vec<Role> {
        [
            (self.is_client, Role::Client),
            (self.is_admin, Role::Admin),
            (self.is_instructor, Role::Instructor),
            (self.is_student, Role::Student),
        ]
        .into_iter()
        .filter_map(|(set, role)| set.then_some(role))
        .collect()
    }

    /// Full display name, falling back to the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_only_takes_defaults() {
        let user = User::from_new(Uuid::new_v4(), NewUser::with_username("alice")).unwrap();

        assert_eq!(user.username, "alice");
        assert!(!user.is_client);
        assert!(!user.is_admin);
        assert!(!user.is_instructor);
        assert!(!user.is_student);
        assert_eq!(user.first_name, "");
        assert_eq!(user.last_name, "");
        assert_eq!(user.phone, "");
        assert_eq!(user.github, "");
        assert_eq!(user.website, "");
        assert!(user.idn.is_none());
        assert!(user.client.is_none());
    }

    #[test]
    fn test_defaults_from_json() {
        let data: NewUser = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        let user = User::from_new(Uuid::new_v4(), data).unwrap();

        assert!(user.roles().is_empty());
        assert_eq!(user.website, "");
    }

    #[test]
    fn test_empty_username_rejected() {
        let result = User::from_new(Uuid::new_v4(), NewUser::default());
        assert!(matches!(result, Err(UserError::Validation(_))));
    }

    #[test]
    fn test_roles_may_combine() {
        let data = NewUser {
            is_admin: true,
            is_instructor: true,
            ..NewUser::with_username("bob")
        };
        let user = User::from_new(Uuid::new_v4(), data).unwrap();

        assert_eq!(user.roles(), vec![Role::Admin, Role::Instructor]);
    }

    #[test]
    fn test_client_self_reference_rejected() {
        let id = Uuid::new_v4();
        let data = NewUser {
            client: Some(id),
            ..NewUser::with_username("carol")
        };

        assert!(matches!(
            User::from_new(id, data),
            Err(UserError::SelfReference(_))
        ));
    }

    #[test]
    fn test_apply_partial_update() {
        let client = Uuid::new_v4();
        let user = User::from_new(Uuid::new_v4(), NewUser::with_username("dave")).unwrap();

        let updated = user
            .apply(UpdateUser {
                first_name: Some("Dave".to_string()),
                is_student: Some(true),
                client: Some(Some(client)),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.first_name, "Dave");
        assert!(updated.is_student);
        assert_eq!(updated.client, Some(client));
        assert_eq!(updated.username, "dave");
        assert_eq!(updated.id, user.id);

        let cleared = updated
            .apply(UpdateUser {
                client: Some(None),
                ..Default::default()
            })
            .unwrap();
        assert!(cleared.client.is_none());
    }

    #[test]
    fn test_website_must_be_url() {
        let data = NewUser {
            website: "not a url".to_string(),
            ..NewUser::with_username("gail")
        };
        assert!(matches!(
            User::from_new(Uuid::new_v4(), data),
            Err(UserError::Validation(_))
        ));

        let data = NewUser {
            website: "https://gail.example.com".to_string(),
            ..NewUser::with_username("gail")
        };
        assert!(User::from_new(Uuid::new_v4(), data).is_ok());
    }

    #[test]
    fn test_update_null_clears_reference() {
        let changes: UpdateUser = serde_json::from_str(r#"{"client":null}"#).unwrap();
        assert_eq!(changes.client, Some(None));

        let changes: UpdateUser = serde_json::from_str(r#"{"phone":"555-0101"}"#).unwrap();
        assert_eq!(changes.client, None);
        assert_eq!(changes.idn, None);
    }

    #[test]
    fn test_password_not_serialized() {
        let data = NewUser {
            password: "$argon2id$hash".to_string(),
            ..NewUser::with_username("erin")
        };
        let user = User::from_new(Uuid::new_v4(), data).unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "erin");
    }

    #[test]
    fn test_display_name() {
        let mut user = User::from_new(Uuid::new_v4(), NewUser::with_username("frank")).unwrap();
        assert_eq!(user.display_name(), "frank");

        user.first_name = "Frank".to_string();
        user.last_name = "Ng".to_string();
        assert_eq!(user.display_name(), "Frank Ng");
    }
}
