//! Client-side barrier synchronization state machine.
//!
//! [`SyncSession`] owns the client id and the two frame counters and routes
//! decoded [`Command`]s to the embedding application through the
//! [`FrameHandler`] callbacks. It is deliberately transport-free: the caller
//! feeds it commands in arrival order and sends back whatever command it
//! returns. Callback invocation order therefore always matches command
//! arrival order.
//!
//! # The render-wait-confirm cycle
//!
//! ```text
//! Coordinator                           Client
//! ───────────                           ──────
//! FRAME n          ──────────────────▶  on_frame(n)
//!                                       … application renders …
//!                                       done_rendering()
//! collect DONE <id> ◀─────────────────  DONE <id>
//! (all clients done)
//! FRAME n+1        ──────────────────▶  on_frame(n+1)
//! ```
//!
//! The client never self-advances. The next `FRAME` from the coordinator is
//! the barrier: the coordinator issues it only after every connected client
//! has confirmed the previous frame.

use crate::protocol::command::{ClientId, Command, FrameNumber};
use tracing::{debug, trace, warn};

/// Callback contract exposed to the embedding rendering layer.
///
/// All methods are invoked exactly once per accepted command, in command
/// arrival order, never in parallel.
pub trait FrameHandler: Send {
    /// Invoked once per accepted frame advance. The collaborator must
    /// eventually signal completion through
    /// [`SyncSession::done_rendering`] to unblock the barrier.
    fn on_frame(&mut self, frame: FrameNumber);

    /// Invoked once per broadcast or targeted message for which this client
    /// is a recipient. A sending client receives its own broadcast, so all
    /// application state transitions happen uniformly here rather than at
    /// call time.
    fn on_string_data(&mut self, payload: &str, from: ClientId);

    /// Invoked once per reset command, after the frame counters are cleared.
    fn on_reset(&mut self);
}

/// Barrier state for one client connection.
///
/// Invariant: `last_confirmed_frame <= current_render_frame` at all times;
/// the two are equal exactly when the client is idle, awaiting the next
/// frame command.
#[derive(Debug, Default)]
pub struct SyncSession {
    client_id: Option<ClientId>,
    current_render_frame: Option<FrameNumber>,
    last_confirmed_frame: Option<FrameNumber>,
}

impl SyncSession {
    /// Creates a session with no client id and no frame yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id assigned by the coordinator, if it has arrived.
    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    /// The frame this client has been told to render (it may not have
    /// finished yet).
    pub fn current_render_frame(&self) -> Option<FrameNumber> {
        self.current_render_frame
    }

    /// The highest frame this client has confirmed with a `DONE`.
    pub fn last_confirmed_frame(&self) -> Option<FrameNumber> {
        self.last_confirmed_frame
    }

    /// Whether the client has confirmed the current frame and is awaiting
    /// the next frame command.
    pub fn is_idle(&self) -> bool {
        self.last_confirmed_frame == self.current_render_frame
    }

    /// Applies one decoded command, invoking handler callbacks as required.
    ///
    /// Returns a command the caller must encode and enqueue on the transport
    /// (currently only the ready acknowledgment for a first id assignment).
    /// Protocol faults — stale frames, repeated id assignment, inbound
    /// `DONE` — are logged and ignored; they never tear down the connection.
    pub fn apply(&mut self, command: Command, handler: &mut dyn FrameHandler) -> Option<Command> {
        match command {
            Command::AssignClientId(id) => {
                if let Some(existing) = self.client_id {
                    warn!(existing, rejected = id, "client id is already assigned; ignoring reassignment");
                    return None;
                }
                self.client_id = Some(id);
                debug!(id, "client id assigned; acknowledging ready");
                // The ready acknowledgment: confirms the no-frame sentinel so
                // the coordinator can include this client in the next barrier.
                Some(Command::RenderDone(id))
            }

            Command::AdvanceFrame(frame) => {
                if let Some(current) = self.current_render_frame {
                    if frame <= current {
                        warn!(frame, current, "stale frame advance ignored");
                        return None;
                    }
                }
                self.current_render_frame = Some(frame);
                trace!(frame, "advancing to frame");
                handler.on_frame(frame);
                None
            }

            Command::RenderDone(id) => {
                // DONE flows client -> coordinator; receiving one is a
                // coordinator bug, not ours.
                warn!(from = id, "unexpected inbound DONE ignored");
                None
            }

            Command::BroadcastString { sender, payload } => {
                handler.on_string_data(&payload, sender);
                None
            }

            Command::TargetedString {
                sender,
                recipients,
                payload,
            } => {
                match self.client_id {
                    Some(id) if recipients.contains(&id) => {
                        handler.on_string_data(&payload, sender);
                    }
                    _ => trace!(sender, "targeted message not addressed to this client"),
                }
                None
            }

            Command::Reset => {
                self.current_render_frame = None;
                self.last_confirmed_frame = None;
                debug!("frame counters reset");
                handler.on_reset();
                None
            }
        }
    }

    /// The collaborator's completion signal for the current frame.
    ///
    /// Confirms the current frame and returns the `DONE` command to send.
    /// Idempotent within a frame: a second call without an intervening frame
    /// advance returns `None`, so at most one `DONE` is emitted per frame.
    /// Also returns `None` before the id is assigned or before the first
    /// frame arrives.
    pub fn done_rendering(&mut self) -> Option<Command> {
        let id = self.client_id?;
        let current = self.current_render_frame?;
        if self.last_confirmed_frame == Some(current) {
            trace!(frame = current, "frame already confirmed");
            return None;
        }
        self.last_confirmed_frame = Some(current);
        Some(Command::RenderDone(id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
