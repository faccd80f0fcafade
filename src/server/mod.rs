//! HTTP server for huginnd.
//!
//! - [`config`] — TOML configuration and secrets loading
//! - [`routes`] — axum router over a [`Huginn`](crate::Huginn) container

pub mod config;
pub mod routes;

pub use config::{Config, Secrets};
pub use routes::router;
