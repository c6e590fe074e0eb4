//! # lockstep-core
//!
//! Shared library for Lockstep containing the wire protocol commands, the
//! line-based codec, and the frame-barrier synchronization state machine.
//!
//! This crate is used by the client application (and by any coordinator
//! implementation honoring the same wire contract). It has zero dependencies
//! on sockets, OS APIs, or a rendering environment.
//!
//! # What is a frame barrier? (for beginners)
//!
//! Lockstep keeps a fleet of independently running rendering processes — for
//! example the projectors of a multi-display installation — on the *same
//! logical frame*. Every process renders frame N; none may advance to frame
//! N+1 until a central coordinator has collected a render-complete
//! acknowledgment from all of them for frame N. That collection point is the
//! *barrier*.
//!
//! This crate defines:
//!
//! - **`protocol`** – How commands travel over the wire. Each message is one
//!   line of space-separated tokens terminated by a delimiter byte, encoded
//!   and decoded between bytes and the typed [`Command`] enum.
//!
//! - **`sync`** – The client-side state machine: it tracks the current and
//!   last-confirmed frame numbers, drives the render-wait-confirm cycle, and
//!   routes decoded commands to the embedding application's callbacks.

pub mod protocol;
pub mod sync;

// Re-export the most-used items at the crate root so callers can write
// `lockstep_core::Command` instead of `lockstep_core::protocol::command::Command`.
pub use protocol::codec::{decode_command, encode_command, ProtocolError};
pub use protocol::command::{ClientId, Command, FrameNumber, DEFAULT_DELIMITER};
pub use sync::session::{FrameHandler, SyncSession};
