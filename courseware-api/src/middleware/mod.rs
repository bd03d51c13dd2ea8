/// Middleware for the API server
///
/// - `errors`: renders every error response as the error view for the
///   current operating mode
///
/// The request pipeline proper lives in `crate::pipeline`.

pub mod errors;
