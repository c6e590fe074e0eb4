//! Application layer: the session driver.

pub mod session;

pub use session::{SessionError, SyncClient, SyncHandle};
