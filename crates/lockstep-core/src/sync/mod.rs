//! Synchronization module containing the barrier state machine.

pub mod session;

pub use session::{FrameHandler, SyncSession};
