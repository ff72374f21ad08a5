//! Client registry
//!
//! Single owner of the set of stream subscribers. The set lives inside one
//! actor task; every subscribe, unsubscribe and broadcast is a message on its
//! command queue, processed one at a time in arrival order. Nothing outside
//! the actor ever reads or mutates the set.
//!
//! Broadcast makes exactly one non-blocking write attempt per sink. A sink
//! that refuses the frame (closed, or too far behind) is removed during the
//! same pass. Slow listeners are shed; they never push back on the stream.

use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tunecast_common::RadioEvent;
use uuid::Uuid;

use crate::error::{Error, Result};

/// One slice of raw audio, shared by reference across all sinks
pub type Frame = Bytes;

/// Registry-assigned subscriber identity
pub type ClientId = Uuid;

/// Why a sink refused a frame
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// Listener has fallen too far behind
    #[error("sink queue full")]
    Full,

    /// Listener connection is gone
    #[error("sink closed")]
    Closed,
}

/// Output end of one subscriber
///
/// Implementations must return immediately; the registry calls this from its
/// only task and a blocking sink would stall every listener.
pub trait FrameSink: Send + 'static {
    fn try_send_frame(&mut self, frame: Frame) -> std::result::Result<(), SinkError>;
}

impl FrameSink for mpsc::Sender<Frame> {
    fn try_send_frame(&mut self, frame: Frame) -> std::result::Result<(), SinkError> {
        self.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

enum RegistryCommand {
    Subscribe {
        id: ClientId,
        sink: Box<dyn FrameSink>,
    },
    Unsubscribe {
        id: ClientId,
    },
    Broadcast {
        frame: Frame,
    },
    ListenerCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the registry actor
///
/// Cheap to clone; the actor stops once every handle is dropped or the
/// shutdown token is cancelled.
#[derive(Clone)]
pub struct ClientRegistry {
    tx: mpsc::Sender<RegistryCommand>,
}

impl ClientRegistry {
    /// Spawn the registry actor
    ///
    /// # Arguments
    ///
    /// * `command_queue` - Pending commands before callers wait
    /// * `events` - Station event channel for listener count changes
    /// * `shutdown` - Stops the actor when cancelled
    pub fn spawn(
        command_queue: usize,
        events: broadcast::Sender<RadioEvent>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(command_queue.max(1));
        let actor = RegistryActor {
            clients: HashMap::new(),
            events,
        };
        let handle = tokio::spawn(actor.run(rx, shutdown));
        (Self { tx }, handle)
    }

    /// Add a sink; it receives every frame broadcast after this call returns
    pub async fn subscribe(&self, sink: impl FrameSink) -> Result<ClientId> {
        let id = Uuid::new_v4();
        self.send(RegistryCommand::Subscribe {
            id,
            sink: Box::new(sink),
        })
        .await?;
        Ok(id)
    }

    /// Remove a sink; no-op if it is already gone
    pub async fn unsubscribe(&self, id: ClientId) -> Result<()> {
        self.send(RegistryCommand::Unsubscribe { id }).await
    }

    /// Deliver a frame to every current subscriber
    pub async fn broadcast(&self, frame: Frame) -> Result<()> {
        self.send(RegistryCommand::Broadcast { frame }).await
    }

    /// Current subscriber count
    ///
    /// Answered in queue order, so every command sent before this one has
    /// already been applied.
    pub async fn listener_count(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::ListenerCount { reply }).await?;
        rx.await
            .map_err(|_| Error::Registry("registry stopped before replying".to_string()))
    }

    async fn send(&self, command: RegistryCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::Registry("registry is not running".to_string()))
    }
}

struct RegistryActor {
    clients: HashMap<ClientId, Box<dyn FrameSink>>,
    events: broadcast::Sender<RadioEvent>,
}

impl RegistryActor {
    async fn run(mut self, mut rx: mpsc::Receiver<RegistryCommand>, shutdown: CancellationToken) {
        debug!("Client registry started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
        info!("Client registry stopped with {} clients", self.clients.len());
    }

    fn handle(&mut self, command: RegistryCommand) {
        match command {
            RegistryCommand::Subscribe { id, sink } => {
                self.clients.insert(id, sink);
                info!("New client connected. Total clients: {}", self.clients.len());
                self.publish_count();
            }
            RegistryCommand::Unsubscribe { id } => {
                if self.clients.remove(&id).is_some() {
                    info!("Client disconnected. Total clients: {}", self.clients.len());
                    self.publish_count();
                }
            }
            RegistryCommand::Broadcast { frame } => self.broadcast(frame),
            RegistryCommand::ListenerCount { reply } => {
                let _ = reply.send(self.clients.len());
            }
        }
    }

    fn broadcast(&mut self, frame: Frame) {
        let before = self.clients.len();
        self.clients.retain(|id, sink| match sink.try_send_frame(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropping client {}: {}", id, e);
                false
            }
        });

        let dropped = before - self.clients.len();
        if dropped > 0 {
            info!(
                "Dropped {} client(s) on write failure. Total clients: {}",
                dropped,
                self.clients.len()
            );
            self.publish_count();
        }
    }

    fn publish_count(&self) {
        // No SSE listeners is fine
        let _ = self
            .events
            .send(RadioEvent::listeners_changed(self.clients.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_registry() -> (ClientRegistry, broadcast::Receiver<RadioEvent>) {
        let (events, events_rx) = broadcast::channel(16);
        let (registry, _handle) = ClientRegistry::spawn(16, events, CancellationToken::new());
        (registry, events_rx)
    }

    /// Sink whose connection is always gone
    struct FailingSink;

    impl FrameSink for FailingSink {
        fn try_send_frame(&mut self, _frame: Frame) -> std::result::Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let (registry, _events) = spawn_registry();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        registry.subscribe(tx_a).await.unwrap();
        registry.subscribe(tx_b).await.unwrap();

        registry.broadcast(Bytes::from_static(b"frame")).await.unwrap();
        assert_eq!(registry.listener_count().await.unwrap(), 2);

        assert_eq!(rx_a.recv().await.unwrap(), Bytes::from_static(b"frame"));
        assert_eq!(rx_b.recv().await.unwrap(), Bytes::from_static(b"frame"));
    }

    #[tokio::test]
    async fn test_unsubscribed_client_gets_nothing() {
        let (registry, _events) = spawn_registry();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let a = registry.subscribe(tx_a).await.unwrap();
        registry.subscribe(tx_b).await.unwrap();

        registry.unsubscribe(a).await.unwrap();
        // Idempotent
        registry.unsubscribe(a).await.unwrap();
        registry.broadcast(Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(registry.listener_count().await.unwrap(), 1);

        assert_eq!(rx_b.recv().await.unwrap(), Bytes::from_static(b"x"));
        // Sender was dropped with the removed sink
        assert!(rx_a.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_sink_dropped_others_unaffected() {
        let (registry, _events) = spawn_registry();
        let (tx_ok, mut rx_ok) = mpsc::channel(4);
        registry.subscribe(FailingSink).await.unwrap();
        registry.subscribe(tx_ok).await.unwrap();

        registry.broadcast(Bytes::from_static(b"1")).await.unwrap();
        assert_eq!(registry.listener_count().await.unwrap(), 1);
        registry.broadcast(Bytes::from_static(b"2")).await.unwrap();

        assert_eq!(rx_ok.recv().await.unwrap(), Bytes::from_static(b"1"));
        assert_eq!(rx_ok.recv().await.unwrap(), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn test_slow_client_shed_when_queue_full() {
        let (registry, _events) = spawn_registry();
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        registry.subscribe(slow_tx).await.unwrap();

        registry.broadcast(Bytes::from_static(b"1")).await.unwrap();
        registry.broadcast(Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(registry.listener_count().await.unwrap(), 0);

        // Only the frame that fit was delivered, then the channel closed
        assert_eq!(slow_rx.recv().await.unwrap(), Bytes::from_static(b"1"));
        assert!(slow_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_receiver_dropped() {
        let (registry, _events) = spawn_registry();
        let (tx, rx) = mpsc::channel(4);
        registry.subscribe(tx).await.unwrap();
        drop(rx);

        registry.broadcast(Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(registry.listener_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_listener_events_published() {
        let (registry, mut events) = spawn_registry();
        let (tx, _rx) = mpsc::channel(4);
        let id = registry.subscribe(tx).await.unwrap();
        registry.unsubscribe(id).await.unwrap();
        registry.listener_count().await.unwrap();

        let counts: Vec<usize> = [events.recv().await.unwrap(), events.recv().await.unwrap()]
            .into_iter()
            .map(|event| match event {
                RadioEvent::ListenersChanged { count, .. } => count,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(counts, vec![1, 0]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_actor() {
        let (events, _) = broadcast::channel(4);
        let shutdown = CancellationToken::new();
        let (registry, handle) = ClientRegistry::spawn(4, events, shutdown.clone());

        shutdown.cancel();
        handle.await.unwrap();
        assert!(matches!(registry.listener_count().await, Err(Error::Registry(_))));
    }
}
