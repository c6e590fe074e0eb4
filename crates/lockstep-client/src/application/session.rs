//! Session driver: wires the transport, codec, and barrier state machine to
//! the embedding application.
//!
//! [`SyncClient::run`] is the single dispatch loop. It consumes transport
//! events and application operations from one `select!`, so handler
//! callbacks fire strictly in command arrival order and never in parallel —
//! the embedding application's state transitions stay deterministic across
//! the whole fleet.
//!
//! The application talks back through a cloneable [`SyncHandle`]: the
//! render-complete signal, outbound string data, and shutdown are all
//! channel sends that never block the caller beyond queue admission.

use lockstep_core::{encode_command, ClientId, Command, FrameHandler, SyncSession};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::infrastructure::config::{ClientSettings, ConfigError};
use crate::infrastructure::network::{
    DisconnectReason, Transport, TransportEvent, TransportHandle,
};

/// Why a running session ended abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The initial connect failed.
    #[error("failed to connect to the coordinator: {0}")]
    Connect(#[source] std::io::Error),

    /// The established connection died on a read or write fault.
    #[error("connection to the coordinator lost: {0}")]
    ConnectionLost(String),
}

/// Operations the application may request from outside the dispatch loop.
#[derive(Debug)]
enum AppOp {
    DoneRendering,
    SendBroadcast {
        payload: String,
    },
    SendTargeted {
        payload: String,
        recipients: Vec<ClientId>,
    },
    Close,
}

/// Cloneable application-side handle to a running [`SyncClient`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    ops: mpsc::Sender<AppOp>,
}

impl SyncHandle {
    /// Signals that the frame delivered by the last `on_frame` callback has
    /// finished rendering. At most one `DONE` is emitted per frame, however
    /// often this is called.
    pub async fn done_rendering(&self) {
        let _ = self.ops.send(AppOp::DoneRendering).await;
    }

    /// Broadcasts opaque string data to every client in the fleet. The
    /// coordinator echoes the broadcast back to this client too, so act on
    /// the data in `on_string_data`, not at the call site.
    pub async fn send_string_data(&self, payload: impl Into<String>) {
        let _ = self
            .ops
            .send(AppOp::SendBroadcast {
                payload: payload.into(),
            })
            .await;
    }

    /// Sends opaque string data to the listed clients only.
    pub async fn send_string_data_to(
        &self,
        payload: impl Into<String>,
        recipients: Vec<ClientId>,
    ) {
        let _ = self
            .ops
            .send(AppOp::SendTargeted {
                payload: payload.into(),
                recipients,
            })
            .await;
    }

    /// Shuts the session down. Idempotent.
    pub async fn close(&self) {
        let _ = self.ops.send(AppOp::Close).await;
    }
}

/// A connected (or connecting) barrier client.
pub struct SyncClient<H: FrameHandler> {
    session: SyncSession,
    handler: H,
    transport: TransportHandle,
    events: mpsc::Receiver<TransportEvent>,
    ops: mpsc::Receiver<AppOp>,
    ops_open: bool,
    delimiter: u8,
}

impl<H: FrameHandler> SyncClient<H> {
    /// Opens the transport and builds the application's handler.
    ///
    /// The handler is constructed through `build_handler` so it can capture
    /// a [`SyncHandle`] of its own — most handlers call
    /// [`SyncHandle::done_rendering`] at the end of their draw cycle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the settings carry an invalid delimiter.
    /// Connect failures are not reported here; they surface from
    /// [`SyncClient::run`].
    pub fn open<F>(
        settings: &ClientSettings,
        build_handler: F,
    ) -> Result<(Self, SyncHandle), ConfigError>
    where
        F: FnOnce(SyncHandle) -> H,
    {
        let delimiter = settings.wire.delimiter_byte()?;
        let (transport, events) = Transport::open(
            settings.coordinator.host.clone(),
            settings.coordinator.port,
            delimiter,
        );
        let (ops_tx, ops_rx) = mpsc::channel(64);
        let handle = SyncHandle { ops: ops_tx };
        let handler = build_handler(handle.clone());

        Ok((
            Self {
                session: SyncSession::new(),
                handler,
                transport,
                events,
                ops: ops_rx,
                ops_open: true,
                delimiter,
            },
            handle,
        ))
    }

    /// Runs the dispatch loop until the connection terminates.
    ///
    /// Returns `Ok(())` on a clean shutdown (explicit close or the
    /// coordinator closing the connection) and [`SessionError`] otherwise.
    pub async fn run(mut self) -> Result<(), SessionError> {
        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(TransportEvent::Connected) => {
                            info!("session transport connected; awaiting client id");
                        }
                        Some(TransportEvent::ConnectFailed { error }) => {
                            return Err(SessionError::Connect(error));
                        }
                        Some(TransportEvent::Command(command)) => {
                            if let Some(outbound) = self.session.apply(command, &mut self.handler) {
                                self.send(outbound).await;
                            }
                        }
                        Some(TransportEvent::ProtocolFault(fault)) => {
                            warn!("malformed message dropped: {fault}");
                        }
                        Some(TransportEvent::Disconnected { reason }) => {
                            return match reason {
                                DisconnectReason::Closed | DisconnectReason::PeerClosed => {
                                    info!("session ended: {reason:?}");
                                    Ok(())
                                }
                                DisconnectReason::ReadError(e)
                                | DisconnectReason::WriteError(e) => {
                                    Err(SessionError::ConnectionLost(e))
                                }
                            };
                        }
                        None => return Ok(()),
                    }
                }

                op = self.ops.recv(), if self.ops_open => {
                    match op {
                        Some(AppOp::DoneRendering) => {
                            if let Some(outbound) = self.session.done_rendering() {
                                self.send(outbound).await;
                            }
                        }
                        Some(AppOp::SendBroadcast { payload }) => {
                            match self.session.client_id() {
                                Some(sender) => {
                                    self.send(Command::BroadcastString { sender, payload }).await;
                                }
                                None => warn!("broadcast dropped: no client id assigned yet"),
                            }
                        }
                        Some(AppOp::SendTargeted { payload, recipients }) => {
                            match self.session.client_id() {
                                Some(sender) => {
                                    self.send(Command::TargetedString {
                                        sender,
                                        recipients,
                                        payload,
                                    })
                                    .await;
                                }
                                None => warn!("targeted send dropped: no client id assigned yet"),
                            }
                        }
                        Some(AppOp::Close) => {
                            // Keep draining events until Disconnected arrives.
                            self.transport.close();
                        }
                        None => self.ops_open = false,
                    }
                }
            }
        }
    }

    /// Encodes and enqueues one outbound command.
    async fn send(&self, command: Command) {
        match encode_command(&command, self.delimiter) {
            Ok(bytes) => {
                if self.transport.enqueue(bytes).await.is_err() {
                    debug!("outbound {} dropped: transport already terminated", command.tag());
                }
            }
            // Payloads containing the delimiter violate the encoding
            // precondition; refuse the send, keep the session alive.
            Err(fault) => warn!("outbound {} not sent: {fault}", command.tag()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::FrameNumber;

    struct NullHandler;

    impl FrameHandler for NullHandler {
        fn on_frame(&mut self, _frame: FrameNumber) {}
        fn on_string_data(&mut self, _payload: &str, _from: ClientId) {}
        fn on_reset(&mut self) {}
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_delimiter() {
        let mut settings = ClientSettings::default();
        settings.wire.delimiter = "||".to_string();

        let result = SyncClient::open(&settings, |_handle| NullHandler);

        assert!(matches!(result, Err(ConfigError::InvalidDelimiter { .. })));
    }

    #[tokio::test]
    async fn test_handler_builder_receives_a_usable_handle() {
        let mut captured = None;
        let settings = ClientSettings::default();

        let (_client, handle) = SyncClient::open(&settings, |h| {
            captured = Some(h);
            NullHandler
        })
        .expect("open must succeed with default settings");

        // Both the captured and the returned handle accept operations
        // without blocking, whatever the connection state.
        captured.expect("builder must be called").done_rendering().await;
        handle.close().await;
    }

    #[test]
    fn test_sync_handle_is_send_and_clone() {
        fn assert_send_clone<T: Send + Clone>() {}
        assert_send_clone::<SyncHandle>();
    }
}
