//! # facematch - Face Identity Matching
//!
//! facematch keeps an in-memory index of face embeddings keyed by identity
//! label. Embeddings are L2-normalized on registration and probes are matched
//! by exact dot-product search (equivalent to cosine similarity for
//! normalized vectors). The index is safe to share between threads: matches
//! run concurrently, registrations are exclusive.
//!
//! ## Example
//!
//! ```
//! use facematch::FaceDB;
//!
//! let db = FaceDB::new();
//!
//! // Register identities
//! db.register("alice", &[1.0, 0.0, 0.0]).unwrap();
//! db.register("bob", &[0.0, 1.0, 0.0]).unwrap();
//!
//! // Find the closest identity to a probe
//! let best = db.match_face(&[0.9, 0.1, 0.0]).unwrap();
//! assert_eq!(best.label, "alice");
//! ```

pub mod config;
mod db;
pub mod embedder;
pub mod error;
pub mod index;
pub mod server;
pub mod store;
pub mod vector;

// Re-export FaceDB as the primary public API
pub use db::{DbStatus, FaceDB, FaceMatch, Registration};
pub use error::{MatchError, Result};
