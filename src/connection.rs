//! Connection to the generation service
//!
//! One logical duplex connection per session, run by a background task that
//! reconnects with backoff until the manager is closed. The session talks to
//! it through plain channels: outbound frames go in through [`ConnectionManager::send`],
//! lifecycle notifications and inbound frames come back as [`ConnectionEvent`]s.

mod backoff;
mod state;

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

pub use backoff::Backoff;
pub use state::{ConnectionEvent, ConnectionState};

use crate::session::FrameSink;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors opening a connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not a websocket URL: {0}")]
    InvalidUrl(String),

    #[error("connection already opened")]
    AlreadyOpen,

    #[error("connection has been closed")]
    Closed,
}

/// Owns the connection task and its channels
pub struct ConnectionManager {
    backoff: Backoff,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound_tx: Option<mpsc::UnboundedSender<String>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new(backoff: Backoff) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            backoff,
            state: Arc::new(state),
            outbound_tx: None,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe state changes, e.g. to render a working/offline indicator
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Start connecting to `url`
    ///
    /// Must be called from within a tokio runtime. Events are delivered on
    /// `events` until the manager is closed.
    pub fn open(
        &mut self,
        url: &str,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Result<(), ConnectionError> {
        if self.state() == ConnectionState::Closed {
            return Err(ConnectionError::Closed);
        }
        if self.task.is_some() {
            return Err(ConnectionError::AlreadyOpen);
        }
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConnectionError::InvalidUrl(url.to_string()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound_tx = Some(outbound_tx);
        set_state(&self.state, ConnectionState::Connecting);

        let task = ConnectionTask {
            url: url.to_string(),
            backoff: self.backoff.clone(),
            state: Arc::clone(&self.state),
            outbound_rx,
            events,
            cancel: self.cancel.clone(),
            failures: 0,
            degraded_reported: false,
        };
        log::info!("Connecting to {}", url);
        self.task = Some(tokio::spawn(task.run()));
        Ok(())
    }

    /// Queue a text frame
    ///
    /// Only accepted while the connection is open. A true return means the
    /// frame was handed to the socket task, not that it was delivered.
    pub fn send(&self, payload: String) -> bool {
        if !self.state().is_open() {
            return false;
        }
        match &self.outbound_tx {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    /// Stop the connection for good
    ///
    /// Safe to call on a manager that never opened or is already closed.
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.outbound_tx = None;
        set_state(&self.state, ConnectionState::Closed);
    }

    /// Close and wait for the connection task to finish
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl FrameSink for ConnectionManager {
    fn state(&self) -> ConnectionState {
        ConnectionManager::state(self)
    }

    fn send_frame(&mut self, frame: String) -> bool {
        self.send(frame)
    }

    fn close(&mut self) {
        ConnectionManager::close(self);
    }
}

// Closed is terminal: nothing moves the state out of it
fn set_state(state: &watch::Sender<ConnectionState>, next: ConnectionState) {
    state.send_if_modified(|current| {
        if *current == ConnectionState::Closed || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

fn emit(
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    cancel: &CancellationToken,
    event: ConnectionEvent,
) {
    // Nothing reaches the session after teardown
    if cancel.is_cancelled() {
        return;
    }
    let _ = events.send(event);
}

enum PumpExit {
    Cancelled,
    Dropped(Option<String>),
}

struct ConnectionTask {
    url: String,
    backoff: Backoff,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    cancel: CancellationToken,
    /// Consecutive attempts that failed or dropped before becoming stable
    failures: u32,
    degraded_reported: bool,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut rng = StdRng::from_entropy();

        loop {
            set_state(&self.state, ConnectionState::Connecting);
            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = connect_async(self.url.as_str()) => result,
            };

            match attempt {
                Ok((socket, _)) => {
                    set_state(&self.state, ConnectionState::Open);
                    log::info!("Connection open");
                    emit(&self.events, &self.cancel, ConnectionEvent::Opened);

                    let (exit, stable) = self.pump(socket).await;
                    match exit {
                        PumpExit::Cancelled => break,
                        PumpExit::Dropped(reason) => {
                            log::debug!("Connection dropped: {:?}", reason);
                            emit(&self.events, &self.cancel, ConnectionEvent::Closed { reason });
                        }
                    }
                    if !stable {
                        self.failures = self.failures.saturating_add(1);
                        log::debug!("Connection {} dropped before it settled", self.failures);
                    }
                }
                Err(e) => {
                    self.failures = self.failures.saturating_add(1);
                    log::debug!("Connection attempt {} failed: {}", self.failures, e);
                    emit(&self.events, &self.cancel, ConnectionEvent::Error(e.to_string()));
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            set_state(&self.state, ConnectionState::Reconnecting);
            self.discard_queued();

            if !self.degraded_reported && self.backoff.is_degraded(self.failures) {
                self.degraded_reported = true;
                log::warn!("Still unable to connect after {} attempts", self.failures);
                emit(
                    &self.events,
                    &self.cancel,
                    ConnectionEvent::Degraded {
                        attempts: self.failures,
                    },
                );
            }

            let delay = self.backoff.delay(self.failures.max(1), &mut rng);
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        set_state(&self.state, ConnectionState::Closed);
        log::debug!("Connection task finished");
    }

    /// Shuttle frames both ways until the socket drops or we're cancelled
    ///
    /// The connection becomes stable once a frame arrives or it has stayed
    /// up for the backoff's settle time. Becoming stable clears the failure
    /// count. The flag is returned next to the exit reason.
    async fn pump(&mut self, socket: Socket) -> (PumpExit, bool) {
        let (mut sink, mut stream) = socket.split();
        let settle = tokio::time::sleep(self.backoff.stable_after());
        tokio::pin!(settle);
        let mut stable = false;

        let Self {
            outbound_rx,
            events,
            cancel,
            failures,
            degraded_reported,
            ..
        } = self;

        let exit = loop {
            let mut inbound_frame = false;
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break PumpExit::Cancelled;
                }
                _ = &mut settle, if !stable => stable = true,
                outbound = outbound_rx.recv() => match outbound {
                    Some(frame) => {
                        if let Err(e) = sink.send(Message::Text(frame)).await {
                            break PumpExit::Dropped(Some(e.to_string()));
                        }
                    }
                    // The manager is gone
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        break PumpExit::Cancelled;
                    }
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        inbound_frame = true;
                        emit(events, cancel, ConnectionEvent::Message(text));
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => {
                            inbound_frame = true;
                            emit(events, cancel, ConnectionEvent::Message(text));
                        }
                        Err(_) => log::debug!("Dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break PumpExit::Dropped(frame.map(|f| f.reason.to_string()));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break PumpExit::Dropped(Some(e.to_string())),
                    None => break PumpExit::Dropped(None),
                },
            }

            if inbound_frame {
                stable = true;
            }
            if stable && *failures > 0 {
                log::debug!("Connection settled after {} failures", failures);
                *failures = 0;
            }
            if stable && *degraded_reported {
                *degraded_reported = false;
                emit(events, cancel, ConnectionEvent::Recovered);
            }
        };

        (exit, stable)
    }

    // Frames queued while the socket was down answer text that has moved on
    fn discard_queued(&mut self) {
        let mut dropped = 0;
        while self.outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!("Discarded {} frames queued during outage", dropped);
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod connection_tests;
