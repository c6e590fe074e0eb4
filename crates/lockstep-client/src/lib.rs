//! lockstep-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! # What does lockstep-client do? (for beginners)
//!
//! A *client* is one rendering process in a fleet — one projector of a
//! multi-display installation, say. Every client connects to a central
//! coordinator over TCP and then renders in lockstep with the rest of the
//! fleet: the coordinator tells everyone which frame to render, each client
//! reports back when it is done, and only once every client has reported
//! does the coordinator release the next frame.
//!
//! The client library:
//!
//! 1. Connects to the coordinator and keeps one task exclusively owning the
//!    socket (the framed transport with its ordered write queue).
//! 2. Splits the inbound byte stream into delimited messages and decodes
//!    them into protocol commands.
//! 3. Drives the barrier state machine and routes commands to the embedding
//!    application's `FrameHandler` callbacks, in arrival order.
//! 4. Sends the application's render-complete confirmations and opaque
//!    string broadcasts back to the coordinator.

/// Application layer: the session driver wiring transport, codec, and state
/// machine to the embedding application.
pub mod application;

/// Infrastructure layer: TCP transport and settings loading.
pub mod infrastructure;

pub use application::session::{SessionError, SyncClient, SyncHandle};
pub use infrastructure::config::{ClientSettings, ConfigError};
pub use infrastructure::network::{
    DisconnectReason, Transport, TransportEvent, TransportHandle, TransportState,
};
