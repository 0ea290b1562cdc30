//! Common library for the media intake service
//!
//! This crate provides the document store abstraction and its backends,
//! service account credentials, database connectivity and the error types
//! shared by the services in the workspace.
//!
//! ```rust,no_run
//! use common::store::{DocumentStore, MemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let fields = json!({ "userId": "u1" }).as_object().cloned().unwrap_or_default();
//!     let path = store.create("artifacts/app/public/data/media", fields).await?;
//!     println!("Created {}", path);
//!     Ok(())
//! }
//! ```

pub mod credentials;
pub mod database;
pub mod error;
pub mod store;
