//! Auth session state and its durable persistence.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use store::{RouteAccess, SessionState, SessionStore};
