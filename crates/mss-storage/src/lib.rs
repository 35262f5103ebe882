//! # mss-storage
//!
//! Repository contract for the mobile security service.
//!
//! This crate defines the trait and types that all storage backends must implement.
//! It does not contain any implementations - those are provided by separate crates
//! (`mss-db-memory`, `mss-db-postgres`).
//!
//! ## Overview
//!
//! The main trait is [`InitRepository`], which defines what device-init
//! reconciliation needs from storage:
//! - App lookup with the soft-delete filter applied
//! - Version lookup and the atomic insert-or-increment launch upsert
//! - Device lookup and the atomic insert-or-update upsert
//!
//! Lookups return a [`Lookup`] so that "row absent" stays distinct from
//! "storage failed".
//!
//! ## Example
//!
//! ```ignore
//! use mss_storage::{InitRepository, Lookup, StorageError};
//!
//! async fn launches(repo: &dyn InitRepository) -> Result<i64, StorageError> {
//!     match repo.get_version("com.example.app", "1.0").await? {
//!         Lookup::Found(version) => Ok(version.num_of_app_launches),
//!         Lookup::Absent => Ok(0),
//!     }
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::InitRepository;
pub use types::Lookup;

/// Type alias for a shareable repository trait object.
pub type DynRepository = std::sync::Arc<dyn InitRepository>;

