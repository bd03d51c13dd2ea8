/// Authentication and authorization primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`csrf`]: anti-forgery secrets and tokens
/// - [`gates`]: capability checks run before gated route groups
///
/// # Example
///
/// ```
/// use courseware_shared::auth::csrf::{create_token, generate_secret, verify_token};
///
/// let secret = generate_secret();
/// let token = create_token(&secret);
/// assert!(verify_token(&secret, &token));
/// ```

pub mod csrf;
pub mod gates;
pub mod password;
