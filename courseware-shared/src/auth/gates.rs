/// Capability gates
///
/// A gate is evaluated before a route group's handlers. It sees only the
/// identity resolved from the session, if any.
///
/// | capability | passes when |
/// |---|---|
/// | `Public` | always |
/// | `Authenticated` | an identity is present |
/// | `Admin` | an identity is present and holds the admin flag |
///
/// `Admin` is strictly stronger than `Authenticated`.
///
/// # Example
///
/// ```
/// use courseware_shared::auth::gates::{Capability, GateError};
///
/// assert!(Capability::Public.check(None).is_ok());
/// assert_eq!(Capability::Admin.check(None), Err(GateError::Unauthenticated));
/// ```

use crate::models::user::User;

/// Capability required to enter a route group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Public,
    Authenticated,
    Admin,
}

/// Why a gate rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Administrator access required")]
    NotAdmin,
}

/// True when an identity was resolved for the request
pub fn is_authenticated(user: Option<&User>) -> bool {
    user.is_some()
}

/// True when the resolved identity holds the admin flag
pub fn is_admin(user: Option<&User>) -> bool {
    user.is_some_and(|u| u.is_admin)
}

impl Capability {
    /// Evaluates the gate against the resolved identity
    pub fn check(self, user: Option<&User>) -> Result<(), GateError> {
        match self {
            Capability::Public => Ok(()),
            Capability::Authenticated if is_authenticated(user) => Ok(()),
            Capability::Admin if is_admin(user) => Ok(()),
            _ if !is_authenticated(user) => Err(GateError::Unauthenticated),
            _ => Err(GateError::NotAdmin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use uuid::Uuid;

    fn user(is_admin: bool) -> User {
        User::from_new(
            Uuid::new_v4(),
            NewUser {
                is_admin,
                ..NewUser::with_username("gatekeeper")
            },
        )
        .unwrap()
    }

    #[test]
    fn test_public_always_passes() {
        assert!(Capability::Public.check(None).is_ok());
        assert!(Capability::Public.check(Some(&user(false))).is_ok());
    }

    #[test]
    fn test_authenticated_gate() {
        assert_eq!(
            Capability::Authenticated.check(None),
            Err(GateError::Unauthenticated)
        );
        assert!(Capability::Authenticated.check(Some(&user(false))).is_ok());
    }

    #[test]
    fn test_admin_gate() {
        assert_eq!(Capability::Admin.check(None), Err(GateError::Unauthenticated));
        assert_eq!(
            Capability::Admin.check(Some(&user(false))),
            Err(GateError::NotAdmin)
        );
        assert!(Capability::Admin.check(Some(&user(true))).is_ok());
    }

    #[test]
    fn test_admin_implies_authenticated() {
        let admin = user(true);
        assert!(is_admin(Some(&admin)));
        assert!(is_authenticated(Some(&admin)));
        assert!(!is_admin(None));
    }
}
