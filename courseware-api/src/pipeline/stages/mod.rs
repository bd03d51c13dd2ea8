//! Pipeline stage implementations, in standard order

mod csrf;
mod force_https;
mod gates;
mod identity;
mod method_override;

pub use csrf::{CsrfStage, CsrfToken, CSRF_COOKIE};
pub use force_https::ForceHttpsStage;
pub use gates::CapabilityGateStage;
pub use identity::RestoreIdentityStage;
pub use method_override::MethodOverrideStage;
