/// Data models
///
/// Courseware declares a single entity, [`user::User`]. Related records
/// (terms, courses, charges, locations) live with their route groups and are
/// not modelled here.

pub mod user;

pub use user::{NewUser, UpdateUser, User, UserError};
