//! Session persistence: the signed-in token/user pair and where it is kept.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{Session, SessionStore, SessionUser};
