//! Durable map from a caller-chosen lookup key to a remote thread id.
//!
//! One record per key, stored in a single SQLite table. Writes are upserts
//! (last write wins) and there is no versioning.

mod error;
mod key;
mod store;

pub use error::StoreError;
pub use key::LookupKey;
pub use store::ThreadStore;
