// src/kademlia/service.rs
//
// Wires the event bus, handler, call layer, and lookup engine into a
// single running node. This is the public API surface: `start`/`stop`
// plus `store`/`find_value`/`find_node` (spec.md §6).

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::config_loader::NodeConfig;
use crate::kademlia::call::{Caller, PendingCalls};
use crate::kademlia::event::{event_bus, DebugTap, Event, EventKind, EventReceiver, EventSender};
use crate::kademlia::handler::Handler;
use crate::kademlia::id::Id;
use crate::kademlia::lookup::Lookup;
use crate::kademlia::node::{Node, Remote};
use crate::kademlia::routing::RoutingTable;
use crate::kademlia::storage::Storage;
use crate::network::codec::Body;
use crate::network::connection;

pub struct Service {
    local: Node,
    routing: Arc<Mutex<RoutingTable>>,
    storage: Arc<Storage>,
    pending: Arc<PendingCalls>,
    caller: Arc<Caller>,
    lookup: Lookup,
    event_tx: EventSender,
    event_rx: Mutex<Option<EventReceiver>>,
    debug_tap: DebugTap,
    listener_task: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

impl Service {
    /// Builds a node from config but does not bind a listener or spawn
    /// any task yet; call `start` for that.
    pub fn new(config: &NodeConfig) -> Result<Self> {
        let local_id = match &config.node.id {
            Some(hex_id) => Id::from_hex(hex_id).context("parsing node.id")?,
            None => Id::random(),
        };
        let host: Ipv4Addr = config.server.host.parse().context("parsing server.host")?;
        let local = Node::new(local_id, Remote::new(host, config.server.port));

        let routing = Arc::new(Mutex::new(RoutingTable::new(local_id, config.kbucket.ksize)));
        let storage = Arc::new(Storage::new());
        let pending = Arc::new(PendingCalls::new());
        let (event_tx, event_rx) = event_bus(config.event.queue_capacity);
        let debug_tap = if config.debug.events {
            // The tap's receiver has no consumer wired up here; a debug
            // build that wants to drain it owns that receiver itself.
            // Dropping it here would make `tee` a silent no-op, which
            // is acceptable: §4.3 requires the tap never change
            // production semantics, only whether a copy is observable.
            let (tap, _rx) = DebugTap::enabled(config.event.queue_capacity);
            tap
        } else {
            DebugTap::disabled()
        };

        let caller = Arc::new(Caller::new(
            local,
            pending.clone(),
            event_tx.clone(),
            Duration::from_millis(config.call.timeout_ms),
        ));
        let lookup = Lookup::new(routing.clone(), caller.clone(), storage.clone(), config.query.alpha);

        Ok(Self {
            local,
            routing,
            storage,
            pending,
            caller,
            lookup,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            debug_tap,
            listener_task: Mutex::new(None),
            handler_task: Mutex::new(None),
        })
    }

    pub fn local(&self) -> &Node {
        &self.local
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub fn routing(&self) -> &Arc<Mutex<RoutingTable>> {
        &self.routing
    }

    /// Binds the listening endpoint and spawns the connection acceptor
    /// and the handler loop. Idempotent only in the sense that calling
    /// it twice binds twice; callers own the `Service` for its process
    /// lifetime.
    #[instrument(skip(self), fields(local = %self.local.id))]
    pub async fn start(&self) -> Result<()> {
        let listener = connection::bind(&self.local.remote).await?;
        let listener_handle = tokio::spawn(connection::serve(listener, self.event_tx.clone(), self.debug_tap.clone()));
        *self.listener_task.lock().await = listener_handle.into();

        let event_rx = self
            .event_rx
            .lock()
            .await
            .take()
            .context("Service::start called more than once")?;
        let handler = Handler::new(self.local, self.routing.clone(), self.storage.clone(), self.pending.clone(), self.caller.clone());
        let handler_handle = tokio::spawn(handler.run(event_rx));
        *self.handler_task.lock().await = handler_handle.into();

        info!(local = %self.local.id, remote = ?self.local.remote, "node started");
        let _ = self.event_tx.send(Event::lifecycle(EventKind::ServiceStart)).await;
        Ok(())
    }

    /// Enqueues a shutdown event (consumed once the handler drains
    /// whatever preceded it) and aborts the listener, since it has no
    /// natural exit point of its own.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let _ = self.event_tx.send(Event::lifecycle(EventKind::ServiceShutdown)).await;
        if let Some(handle) = self.listener_task.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.handler_task.lock().await.take() {
            let _ = handle.await;
        }
    }

    pub async fn store(&self, key: Id, value: Vec<u8>, cached: bool) {
        self.lookup.store(key, value, cached).await;
    }

    pub async fn find_value(&self, key: Id) -> Option<Vec<u8>> {
        self.lookup.find_value(key).await
    }

    pub async fn find_node(&self, target: Id) -> Option<Node> {
        self.lookup.find_node(target).await
    }

    /// Sends a bare `PING` and reports whether a `PONG` came back within
    /// the call timeout. Not part of spec.md's public API surface, but
    /// exercises the same wire pair the bucket-eviction liveness probe
    /// uses (`handler::add_node`).
    pub async fn ping(&self, target: &Node) -> bool {
        self.caller.call(target, |_echo| Body::Ping, EventKind::SendPing).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_loader::{KBucketConfig, NodeIdentity, QueryConfig, ServerConfig};

    fn config(port: u16) -> NodeConfig {
        NodeConfig {
            node: NodeIdentity { id: None },
            server: ServerConfig { host: "127.0.0.1".into(), port },
            kbucket: KBucketConfig { ksize: 20 },
            query: QueryConfig { alpha: 3 },
            call: Default::default(),
            event: Default::default(),
            debug: Default::default(),
        }
    }

    #[tokio::test]
    async fn new_builds_a_distinct_random_id_per_call() {
        let a = Service::new(&config(0)).unwrap();
        let b = Service::new(&config(0)).unwrap();
        assert_ne!(a.local().id, b.local().id);
    }

    #[tokio::test]
    async fn local_find_value_hits_without_network_traffic() {
        let svc = Service::new(&config(0)).unwrap();
        let key = Id::random();
        svc.storage().store(key, b"hi".to_vec()).await;
        assert_eq!(svc.find_value(key).await, Some(b"hi".to_vec()));
    }
}
