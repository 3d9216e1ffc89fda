//! Editor-lease registry.
//!
//! The pipeline runs against a small, pre-provisioned pool of remote
//! editor sessions. Each is a durable record `{url, status}`; a job
//! leases one for its whole lifetime and must return it on every exit
//! path. All lease/release transitions go through [`EditorRegistry`],
//! which serializes them behind one mutex; the backing store is a
//! plain full-list read / full-list write with no transactionality of
//! its own, so unserialized concurrent admissions could otherwise
//! double-lease the same editor.

mod editor;
mod error;
mod registry;
mod store;

pub use editor::{Editor, EditorStatus};
pub use error::RegistryError;
pub use registry::{EditorRegistry, LeaseGuard};
pub use store::{FileRegistryStore, MemoryRegistryStore, RegistryStore};
