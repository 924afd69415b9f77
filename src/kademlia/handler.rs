// src/kademlia/handler.rs
//
// The single consumer of the event bus: updates the routing table on any
// RPC traffic, dispatches inbound requests to a reply, and completes the
// pending call registered under an inbound response's echo. Processes
// events strictly in bus order — no parallel handler instances.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{instrument, warn};

use crate::kademlia::call::{Caller, PendingCalls};
use crate::kademlia::event::{Event, EventKind, EventReceiver};
use crate::kademlia::node::Node;
use crate::kademlia::routing::{AddOutcome, RoutingTable};
use crate::kademlia::storage::Storage;
use crate::network::codec::{Body, Frame, Header};
use crate::network::connection;

pub struct Handler {
    local: Node,
    routing: Arc<Mutex<RoutingTable>>,
    storage: Arc<Storage>,
    pending: Arc<PendingCalls>,
    caller: Arc<Caller>,
}

impl Handler {
    pub fn new(
        local: Node,
        routing: Arc<Mutex<RoutingTable>>,
        storage: Arc<Storage>,
        pending: Arc<PendingCalls>,
        caller: Arc<Caller>,
    ) -> Self {
        Self { local, routing, storage, pending, caller }
    }

    pub async fn run(self, mut event_rx: EventReceiver) {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::ServiceShutdown) {
                break;
            }
            self.handle_one(event).await;
        }
    }

    #[instrument(skip(self, event), fields(kind = ?event.kind))]
    async fn handle_one(&self, event: Event) {
        if event.kind.is_rpc_traffic() {
            if let Some(node) = event.remote_node {
                self.add_node(node).await;
            }
        }

        if event.kind.is_rpc_response() {
            self.pending.complete(event).await;
            return;
        }

        match event.kind {
            EventKind::HandlePing => self.reply_pong(&event).await,
            EventKind::HandleStore => self.handle_store(&event).await,
            EventKind::HandleFindNode => self.handle_find_node(&event).await,
            EventKind::HandleFindValue => self.handle_find_value(&event).await,
            _ => {}
        }
    }

    async fn add_node(&self, node: Node) {
        let outcome = self.routing.lock().await.add_node(node);
        if let AddOutcome::Full { bucket_index, oldest } = outcome {
            let routing = self.routing.clone();
            let caller = self.caller.clone();
            tokio::spawn(async move {
                match caller.call(&oldest, |_echo| Body::Ping, EventKind::SendPing).await {
                    Ok(_) => {
                        // Oldest is still alive: newcomer stays out, per
                        // the upgraded bucket-full policy.
                    }
                    Err(_) => {
                        routing.lock().await.replace_oldest(bucket_index, oldest.id, node);
                    }
                }
            });
        }
    }

    async fn reply_pong(&self, event: &Event) {
        self.reply(event, Body::Pong).await;
    }

    async fn handle_store(&self, event: &Event) {
        let Some(Frame { body: Body::Store { key, value }, .. }) = &event.frame else { return };
        self.storage.store(*key, value.clone()).await;
        self.reply(event, Body::PongStore { key: *key }).await;
    }

    async fn handle_find_node(&self, event: &Event) {
        let Some(Frame { body: Body::FindNode { target }, .. }) = &event.frame else { return };
        let nodes: Vec<Node> = self
            .routing
            .lock()
            .await
            .find_neighbors(target)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        self.reply(event, Body::PongFindNode { target: *target, nodes }).await;
    }

    async fn handle_find_value(&self, event: &Event) {
        let Some(Frame { body: Body::FindValue { key }, .. }) = &event.frame else { return };
        // Storage miss encodes as a zero-length value; see
        // network::codec and the lookup engine's treatment of it.
        let value = self.storage.get(key).await.unwrap_or_default();
        self.reply(event, Body::PongFindValue { key: *key, value }).await;
    }

    async fn reply(&self, event: &Event, body: Body) {
        let (Some(frame), Some(target)) = (&event.frame, event.remote_node) else { return };
        let reply = Frame {
            header: Header {
                echo: frame.header.echo,
                sender_id: self.local.id,
                sender_remote: self.local.remote,
            },
            body,
        };
        if let Err(e) = connection::send_frame(&target.remote, &reply).await {
            warn!(?target, error = %e, "failed to send reply");
        }
    }
}
