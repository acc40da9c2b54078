//! # lakeview
//!
//! Blocking client for the Lakeview dashboards API.
//!
//! This crate provides:
//! - The [`Backend`] trait covering create, get, update, publish, trash and
//!   folder creation
//! - [`backend::http::HttpBackend`], the `ureq`-based implementation
//! - [`MockBackend`], an in-memory implementation for tests
//! - A structured [`Error`] with an [`ErrorCategory`] for recovery decisions
//!
//! ## Example
//!
//! ```no_run
//! use lakeview::{Backend, ClientConfig, CreateDashboard, PublishRequest, EMBED_CREDENTIALS};
//! use lakeview::backend::http::HttpBackend;
//!
//! let backend = HttpBackend::new(&ClientConfig::new(
//!     "https://example.cloud.databricks.com",
//!     "dapi123",
//! ))
//! .expect("valid config");
//!
//! let created = backend
//!     .create(&CreateDashboard {
//!         display_name: "Sales".to_string(),
//!         parent_path: "/Shared/reports".to_string(),
//!         warehouse_id: Some("abc123".to_string()),
//!         serialized_dashboard: Some("{}".to_string()),
//!     })
//!     .expect("create failed");
//!
//! backend
//!     .publish(
//!         &PublishRequest::new(&created.dashboard_id)
//!             .warehouse_id("abc123")
//!             .embed_credentials(false)
//!             .force_send(EMBED_CREDENTIALS),
//!     )
//!     .expect("publish failed");
//! ```
//!
//! ## Retries
//!
//! The HTTP backend retries `get` on transient errors (see [`retry`]).
//! Mutating calls are sent exactly once.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use backend::{Backend, Call, MockBackend, Operation};
pub use config::ClientConfig;
pub use error::{Error, ErrorCategory, Result};
pub use retry::RetryConfig;
pub use types::{
    CreateDashboard, Dashboard, EMBED_CREDENTIALS, LifecycleState, PublishRequest,
    UpdateDashboard,
};
