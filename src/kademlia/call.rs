// src/kademlia/call.rs
//
// Echo registry plus the call layer: generates a fresh echo per outbound
// RPC, registers a one-shot completion, sends the frame, and returns a
// future the handler resolves on the matching inbound response. The
// call layer has no intrinsic timeout — `Caller::call` layers a
// configurable one on top per §5/§9 of the design.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::{oneshot, Mutex};

use crate::error::NodeError;
use crate::kademlia::event::{Event, EventKind, EventSender};
use crate::kademlia::id::ID_LEN;
use crate::kademlia::node::Node;
use crate::network::codec::{Body, Frame, Header};
use crate::network::connection;

pub struct PendingCalls {
    inner: Mutex<HashMap<[u8; ID_LEN], oneshot::Sender<Event>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    async fn register(&self, echo: [u8; ID_LEN]) -> oneshot::Receiver<Event> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().await.insert(echo, tx);
        rx
    }

    /// Completes the pending call for `event.echo`, if one is still
    /// registered. Exactly one response is ever delivered per echo;
    /// duplicates after the entry is gone are silently dropped here.
    pub async fn complete(&self, event: Event) {
        let sender = self.inner.lock().await.remove(&event.echo);
        if let Some(sender) = sender {
            let _ = sender.send(event);
        }
    }

    /// Removes a registration without completing it — used on call
    /// timeout so the map never grows unboundedly.
    async fn cancel(&self, echo: &[u8; ID_LEN]) {
        self.inner.lock().await.remove(echo);
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

fn random_echo() -> [u8; ID_LEN] {
    let mut echo = [0u8; ID_LEN];
    rand::thread_rng().fill_bytes(&mut echo);
    echo
}

pub struct Caller {
    local: Node,
    pending: Arc<PendingCalls>,
    event_tx: EventSender,
    timeout: Duration,
}

impl Caller {
    pub fn new(local: Node, pending: Arc<PendingCalls>, event_tx: EventSender, timeout: Duration) -> Self {
        Self { local, pending, event_tx, timeout }
    }

    pub fn local(&self) -> &Node {
        &self.local
    }

    /// Sends `body` to `target`, notes the send on the bus (so the
    /// handler can addNode the target), and awaits the matching response
    /// within the configured timeout.
    pub async fn call(&self, target: &Node, body_for: impl FnOnce([u8; ID_LEN]) -> Body, send_kind: EventKind) -> Result<Frame, NodeError> {
        let echo = random_echo();
        let receiver = self.pending.register(echo).await;

        let body = body_for(echo);
        let frame = Frame {
            header: Header { echo, sender_id: self.local.id, sender_remote: self.local.remote },
            body,
        };

        if let Err(e) = connection::send_frame(&target.remote, &frame).await {
            self.pending.cancel(&echo).await;
            return Err(e);
        }

        self.event_tx
            .send(Event::outbound(send_kind, *target, echo))
            .await
            .map_err(|_| NodeError::BusClosed)?;

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(event)) => Ok(event.frame.expect("response event carries a frame")),
            Ok(Err(_)) => Err(NodeError::BusClosed),
            Err(_) => {
                self.pending.cancel(&echo).await;
                Err(NodeError::CallTimeout { echo: hex::encode(echo) })
            }
        }
    }
}
