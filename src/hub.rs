use std::collections::HashMap;

use bytes::Bytes;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::mpsc::Receiver;
use tokio::time::{interval, Duration};

use crate::config::ServerConfig;
use crate::event::{ClientId, Event};
use crate::history::History;
use crate::split::WSWriter;

const PULSE_INTERVAL: Duration = Duration::from_secs(2);

/// The chat dispatcher. Owns the history and every peer's write half, and is
/// the only task that touches either, so appends and fan-outs happen in the
/// exact order messages came off the event channel.
pub struct Hub {
    history: History,
    peers: HashMap<ClientId, WSWriter>,
}

impl Hub {
    pub fn new(history: History) -> Self {
        Self {
            history,
            peers: HashMap::new(),
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected { id, writer } => {
                info!("client {} connected, speaking {:?}", id, writer.dialect());
                self.peers.insert(id, writer);
            }
            Event::Message { id, payload } => self.dispatch(id, payload).await,
            Event::Disconnected { id } => {
                if self.peers.remove(&id).is_some() {
                    info!("client {} disconnected", id);
                }
            }
            Event::Failed { id, error } => {
                warn!("client {}: {}", id, error);
                self.peers.remove(&id);
            }
        }
    }

    /// A JSON object carrying a `cmd` key is a history request: the recent
    /// backlog goes back to the sender alone. Any other JSON payload is
    /// recorded and fanned out verbatim to every other peer. Payloads that
    /// don't parse as JSON are dropped — neither stored nor broadcast.
    async fn dispatch(&mut self, sender: ClientId, payload: Bytes) {
        let value: Value = match serde_json::from_slice(&payload) {
            Ok(value) => value,
            Err(err) => {
                debug!("client {} sent a non-JSON payload, dropping it: {}", sender, err);
                return;
            }
        };

        if value
            .as_object()
            .is_some_and(|object| object.contains_key("cmd"))
        {
            self.replay_backlog(sender).await;
        } else {
            self.history.append(payload.clone());
            self.broadcast(sender, payload).await;
        }
    }

    async fn replay_backlog(&mut self, requester: ClientId) {
        let backlog: Vec<Bytes> = self.history.new_cursor().collect();
        let Some(writer) = self.peers.get_mut(&requester) else {
            return;
        };
        // the cursor walks newest-first; the wire wants chronological order
        for payload in backlog.into_iter().rev() {
            if let Err(err) = writer.send(&payload).await {
                warn!(
                    "dropping client {} after a failed replay write: {}",
                    requester, err
                );
                self.peers.remove(&requester);
                return;
            }
        }
    }

    // A dead peer only loses its own copy; the fan-out keeps going.
    async fn broadcast(&mut self, sender: ClientId, payload: Bytes) {
        let mut dead = Vec::new();
        for (id, writer) in self.peers.iter_mut() {
            if *id == sender {
                continue;
            }
            if let Err(err) = writer.send(&payload).await {
                warn!("dropping client {} after a failed broadcast write: {}", id, err);
                dead.push(*id);
            }
        }
        for id in dead {
            self.peers.remove(&id);
        }
    }
}

/// Runs the dispatch loop until the server side closes the event channel,
/// ticking a liveness pulse roughly every two seconds.
pub async fn run(mut events: Receiver<Event>, config: ServerConfig) {
    let mut hub = Hub::new(History::new(config.history_limit, config.new_client_backlog));
    let mut pulse = interval(PULSE_INTERVAL);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => hub.handle_event(event).await,
                None => break,
            },
            _ = pulse.tick() => debug!("pulse. {} peers connected", hub.peer_count()),
        }
    }
}
