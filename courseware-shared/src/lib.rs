//! # Courseware Shared Library
//!
//! Types and primitives shared by the Courseware API server.
//!
//! ## Module Organization
//!
//! - `models`: the User record and its construction/update inputs
//! - `db`: connection pool, migrations and the user store
//! - `auth`: password hashing, CSRF tokens and capability gates

pub mod auth;
pub mod db;
pub mod models;
