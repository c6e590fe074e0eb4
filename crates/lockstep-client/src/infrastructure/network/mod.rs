//! Framed TCP transport to the coordinator.
//!
//! One spawned task exclusively owns the socket: it runs the connect, the
//! delimiter-framed read loop, and every write. All public entry points
//! communicate with that task over channels rather than touching the socket,
//! so no socket state is ever shared between threads and no locks are needed.
//!
//! # The single-writer queue (for beginners)
//!
//! Outbound messages travel through an `mpsc` channel into the owning task,
//! which awaits each write to completion before taking the next message.
//! The channel is the FIFO write queue and the `await` is the "at most one
//! write in flight" rule: bytes appear on the wire in enqueue order with no
//! interleaving, even when many tasks enqueue concurrently.
//!
//! States: `Disconnected -> Connecting -> Connected -> Disconnected`. The
//! terminal transition happens on explicit close, end of stream, or a fatal
//! I/O error. There is no automatic reconnect; reconnection is a policy the
//! embedding application layers on top of [`Transport::open`].

use std::sync::Arc;

use lockstep_core::{decode_command, Command, ProtocolError};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{mpsc, watch},
};
use tracing::{debug, error, info};

/// Errors surfaced by the transport's public entry points.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The owning task has already terminated; nothing more can be written.
    #[error("transport is not connected")]
    NotConnected,
}

/// Connection state as observed from outside the owning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why the connection terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Explicitly closed from this side.
    Closed,
    /// The coordinator closed the connection (end of stream).
    PeerClosed,
    /// A read failed.
    ReadError(String),
    /// A write failed.
    WriteError(String),
}

/// Events emitted by the transport task, in order of occurrence.
#[derive(Debug)]
pub enum TransportEvent {
    /// The TCP connection was established and the read loop is armed.
    Connected,
    /// The connect attempt failed; the transport is terminal.
    ConnectFailed { error: std::io::Error },
    /// One complete inbound message decoded to a command.
    Command(Command),
    /// One complete inbound message was malformed. The message is dropped;
    /// the connection stays open.
    ProtocolFault(ProtocolError),
    /// The connection terminated. No further events follow.
    Disconnected { reason: DisconnectReason },
}

/// Cloneable handle to the transport task.
#[derive(Clone)]
pub struct TransportHandle {
    writer: mpsc::Sender<Vec<u8>>,
    shutdown: Arc<watch::Sender<bool>>,
    state: watch::Receiver<TransportState>,
}

impl TransportHandle {
    /// Appends one encoded message to the write queue.
    ///
    /// Returns as soon as the message is queued; transmission happens on the
    /// transport's own task, strictly after everything queued before it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] once the transport has
    /// terminated.
    pub async fn enqueue(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.writer
            .send(bytes)
            .await
            .map_err(|_| TransportError::NotConnected)
    }

    /// Requests a graceful shutdown.
    ///
    /// Safe to call from any task; the actual socket shutdown runs on the
    /// owning task. Idempotent: a second call on an already-closed transport
    /// is a no-op, not an error.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    /// The current connection state.
    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }
}

/// Factory for the connection task.
pub struct Transport;

impl Transport {
    /// Submits a connect to `host:port` and returns immediately.
    ///
    /// The connect result and everything after it arrive as
    /// [`TransportEvent`]s on the returned receiver; a failed connect is an
    /// event, never a panic.
    pub fn open(
        host: String,
        port: u16,
        delimiter: u8,
    ) -> (TransportHandle, mpsc::Receiver<TransportEvent>) {
        let (write_tx, write_rx) = mpsc::channel(128);
        let (event_tx, event_rx) = mpsc::channel(128);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(TransportState::Connecting);

        tokio::spawn(run_connection(
            host,
            port,
            delimiter,
            write_rx,
            event_tx,
            shutdown_rx,
            state_tx,
        ));

        (
            TransportHandle {
                writer: write_tx,
                shutdown: Arc::new(shutdown_tx),
                state: state_rx,
            },
            event_rx,
        )
    }
}

// ── Connection task ───────────────────────────────────────────────────────────

async fn run_connection(
    host: String,
    port: u16,
    delimiter: u8,
    mut write_rx: mpsc::Receiver<Vec<u8>>,
    events: mpsc::Sender<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
    state: watch::Sender<TransportState>,
) {
    let stream = match TcpStream::connect((host.as_str(), port)).await {
        Ok(stream) => stream,
        Err(error) => {
            error!("could not connect to coordinator at {host}:{port}: {error}");
            state.send_replace(TransportState::Disconnected);
            let _ = events.send(TransportEvent::ConnectFailed { error }).await;
            return;
        }
    };

    // A close requested while the connect was in flight wins.
    if *shutdown.borrow() {
        state.send_replace(TransportState::Disconnected);
        let _ = events
            .send(TransportEvent::Disconnected {
                reason: DisconnectReason::Closed,
            })
            .await;
        return;
    }

    info!("connected to coordinator at {host}:{port}");
    state.send_replace(TransportState::Connected);
    if events.send(TransportEvent::Connected).await.is_err() {
        return;
    }

    let (mut reader, mut writer) = stream.into_split();
    let mut inbound: Vec<u8> = Vec::with_capacity(1024);

    let reason = 'conn: loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                match changed {
                    Ok(()) if !*shutdown.borrow() => {} // spurious wake
                    _ => break 'conn DisconnectReason::Closed,
                }
            }

            queued = write_rx.recv() => {
                match queued {
                    Some(bytes) => {
                        if let Err(e) = writer.write_all(&bytes).await {
                            error!("write to coordinator failed: {e}");
                            break 'conn DisconnectReason::WriteError(e.to_string());
                        }
                    }
                    // Every handle is gone; nobody can write or close anymore.
                    None => break 'conn DisconnectReason::Closed,
                }
            }

            read = reader.read_buf(&mut inbound) => {
                match read {
                    Ok(0) => {
                        debug!("coordinator closed the connection");
                        break 'conn DisconnectReason::PeerClosed;
                    }
                    Ok(_) => {
                        // Split off every complete message; a trailing
                        // partial message stays buffered for the next read.
                        while let Some(pos) = inbound.iter().position(|&b| b == delimiter) {
                            let line: Vec<u8> = inbound.drain(..=pos).collect();
                            let message = &line[..line.len() - 1];
                            let event = match decode_command(message) {
                                Ok(command) => TransportEvent::Command(command),
                                Err(fault) => TransportEvent::ProtocolFault(fault),
                            };
                            if events.send(event).await.is_err() {
                                break 'conn DisconnectReason::Closed;
                            }
                        }
                    }
                    Err(e) => {
                        error!("read from coordinator failed: {e}");
                        break 'conn DisconnectReason::ReadError(e.to_string());
                    }
                }
            }
        }
    };

    let _ = writer.shutdown().await;
    state.send_replace(TransportState::Disconnected);
    let _ = events.send(TransportEvent::Disconnected { reason }).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Binds and immediately drops a listener so the port is very likely to
    /// refuse the next connection.
    async fn refused_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_connect_refusal_is_an_event_not_a_crash() {
        let port = refused_port().await;
        let (handle, mut events) = Transport::open("127.0.0.1".to_string(), port, b'\n');

        match events.recv().await {
            Some(TransportEvent::ConnectFailed { .. }) => {}
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
        assert_eq!(handle.state(), TransportState::Disconnected);
    }

    #[tokio::test]
    async fn test_enqueue_after_termination_reports_not_connected() {
        let port = refused_port().await;
        let (handle, mut events) = Transport::open("127.0.0.1".to_string(), port, b'\n');

        // Wait for the task to terminate, then try to write.
        let _ = events.recv().await;
        while !handle.writer.is_closed() {
            tokio::task::yield_now().await;
        }

        let result = handle.enqueue(b"DONE 1\n".to_vec()).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_close_before_connect_completes_is_safe() {
        let port = refused_port().await;
        let (handle, mut events) = Transport::open("127.0.0.1".to_string(), port, b'\n');

        handle.close();
        handle.close(); // idempotent

        // The task ends with either ConnectFailed or Disconnected depending
        // on which raced first; both leave the transport disconnected.
        match events.recv().await {
            Some(TransportEvent::ConnectFailed { .. })
            | Some(TransportEvent::Disconnected { .. }) => {}
            other => panic!("expected a terminal event, got {other:?}"),
        }
        assert_eq!(handle.state(), TransportState::Disconnected);
    }
}
