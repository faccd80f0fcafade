//! Huginn - cache-aside prompt configs and streaming prompt tests
//!
//! This crate provides the data path behind an LLM prompt dashboard:
//!
//! - a read-through [`cache`] over a shared key/value store, with
//!   best-effort key-based invalidation after each mutation;
//! - the [`configs`] service that reads prompt configurations through that
//!   cache and invalidates the right keys when they change;
//! - the [`bridge`] that relays an interactive prompt test between a client
//!   websocket and the backend streaming call, recording a
//!   [`transcript`] when the run completes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use huginn::Huginn;
//! use huginn::upstream::{GrpcUpstream, JwtIssuer};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let upstream = GrpcUpstream::new("http://127.0.0.1:50051", Duration::from_secs(5))?;
//!     let huginn = Huginn::builder()
//!         .upstream(Arc::new(upstream))
//!         .credentials(Arc::new(JwtIssuer::new(b"signing-key")?))
//!         .build()?;
//!
//!     let config = huginn.configs().request_configuration("app-1", None).await;
//!     println!("{config:?}");
//!
//!     huginn.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod cache;
pub mod configs;
pub mod error;
pub mod gateway;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod transcript;
pub mod types;
pub mod upstream;
pub mod version;

// Re-export main types at crate root
pub use error::{HuginnError, Result};
pub use gateway::{Huginn, HuginnBuilder};
pub use version::{PKG_VERSION, version_string};

pub use bridge::{SessionConfig, SessionOutcome, SessionReport, StreamBridge};
pub use cache::{CacheKey, CacheStore, InvalidationPublisher, InvalidationSet, ReadThroughCache};
pub use types::{
    PromptConfig, StreamEvent, TestResultFrame, TestRunRequest, Transcript, UpstreamRequest,
};
