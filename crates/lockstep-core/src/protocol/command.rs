//! Protocol command types shared by the client and the coordinator.
//!
//! Commands follow the line-based wire format: one command per message, the
//! message terminated by a single delimiter byte, tokens within the message
//! separated by a single space. Token shapes:
//!
//! ```text
//! ID <id>
//! FRAME <n>
//! DONE <id>
//! MSG <senderId> <payload...>
//! MSGTO <senderId> <id1,id2,...> <payload...>
//! RESET
//! ```

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Default message delimiter byte. Payloads must not contain the delimiter;
/// that is an encoding precondition, enforced by the codec.
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// Separator between tokens within a message.
pub const FIELD_SEPARATOR: char = ' ';

/// Separator between client ids in a `MSGTO` recipient list.
pub const RECIPIENT_SEPARATOR: char = ',';

// ── Identifier types ──────────────────────────────────────────────────────────

/// Identifies one client within the fleet. Assigned once by the coordinator
/// per connection and immutable for the life of the connection.
pub type ClientId = u32;

/// One logical rendering step. Monotonically non-decreasing; strictly
/// increasing across barrier advances. The "no frame yet" sentinel is
/// expressed as `Option<FrameNumber>::None`.
pub type FrameNumber = u64;

// ── Command enum ──────────────────────────────────────────────────────────────

/// All valid Lockstep protocol commands, discriminated by their leading tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `ID <id>`: the coordinator assigns this connection its client id.
    AssignClientId(ClientId),
    /// `FRAME <n>`: the coordinator releases the barrier for frame `n`.
    AdvanceFrame(FrameNumber),
    /// `DONE <id>`: a client confirms it finished rendering the current frame.
    RenderDone(ClientId),
    /// `MSG <sender> <payload>`: opaque application data for every client,
    /// the sender included.
    BroadcastString {
        sender: ClientId,
        payload: String,
    },
    /// `MSGTO <sender> <id1,id2,...> <payload>`: opaque application data for
    /// the listed recipients only.
    TargetedString {
        sender: ClientId,
        recipients: Vec<ClientId>,
        payload: String,
    },
    /// `RESET`: reinitialize frame counters; client ids are preserved.
    Reset,
}

impl Command {
    /// Returns the leading wire tag for this command.
    pub fn tag(&self) -> &'static str {
        match self {
            Command::AssignClientId(_) => "ID",
            Command::AdvanceFrame(_) => "FRAME",
            Command::RenderDone(_) => "DONE",
            Command::BroadcastString { .. } => "MSG",
            Command::TargetedString { .. } => "MSGTO",
            Command::Reset => "RESET",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
