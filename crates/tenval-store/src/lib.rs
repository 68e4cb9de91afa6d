//! # tenval-store
//!
//! Persists tensor values through a document store while suppressing replayed
//! mutations.
//!
//! - [`DocumentStore`]: the put/remove/read collaborator with a sync token
//! - [`MemoryDocumentStore`]: thread-safe in-memory implementation
//! - [`SummaryAdapter`]: applies mutations above its serial-number watermark
//!   and ignores the rest
//!
//! ```
//! use std::sync::Arc;
//! use tenval_store::{MemoryDocumentStore, SummaryAdapter};
//!
//! let mut adapter = SummaryAdapter::new(Arc::new(MemoryDocumentStore::with_sync_token(10)));
//! assert!(!adapter.put(10, 1, b"replayed").unwrap());
//! assert!(adapter.put(11, 1, b"fresh").unwrap());
//! ```

#![deny(warnings)]

pub mod adapter;
pub mod error;
pub mod store;

pub use adapter::{SummaryAdapter, HEART_BEAT_LID};
pub use error::{StoreError, StoreResult};
pub use store::{DocumentStore, Lid, MemoryDocumentStore, SerialNum};
