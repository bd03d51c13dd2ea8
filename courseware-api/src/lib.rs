//! # Courseware API Server Library
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `auth`: Session-backed identity
//! - `config`: Configuration management
//! - `error`: Error types and HTTP response mapping
//! - `extract`: JSON-or-form request bodies
//! - `flash`: One-shot session messages
//! - `middleware`: Error responder
//! - `pipeline`: Ordered request pipeline (HTTPS, method override, identity, CSRF, gates)
//! - `routes`: Mount table and route groups

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod flash;
pub mod middleware;
pub mod pipeline;
pub mod routes;
