// src/kademlia/lookup.rs
//
// Iterative find_node/find_value and the parallel store fan-out.
// `find_value`'s responses carry no candidate list (see the wire codec),
// so its iteration naturally collapses to the single fan-out round the
// reference implementation performs whenever the initial neighbor seed
// doesn't hold the value — the structure mirrors find_node, the outcome
// matches the original.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::kademlia::call::Caller;
use crate::kademlia::event::EventKind;
use crate::kademlia::id::{Distance, Id};
use crate::kademlia::node::Node;
use crate::kademlia::routing::RoutingTable;
use crate::kademlia::storage::Storage;
use crate::network::codec::Body;

pub struct Lookup {
    routing: Arc<Mutex<RoutingTable>>,
    caller: Arc<Caller>,
    storage: Arc<Storage>,
    alpha: usize,
}

impl Lookup {
    pub fn new(routing: Arc<Mutex<RoutingTable>>, caller: Arc<Caller>, storage: Arc<Storage>, alpha: usize) -> Self {
        Self { routing, caller, storage, alpha }
    }

    #[instrument(skip(self))]
    pub async fn find_node(&self, target: Id) -> Option<Node> {
        let seeds = self.routing.lock().await.find_neighbors(&target);

        let mut shortlist: HashMap<Id, Node> = HashMap::new();
        let mut queried: HashSet<Id> = HashSet::new();
        let mut closest = Distance::MAX;

        for (distance, node) in seeds.into_iter().take(self.alpha) {
            if distance.is_zero() {
                return Some(node);
            }
            shortlist.insert(node.id, node);
        }

        loop {
            if shortlist.is_empty() {
                return None;
            }
            let batch: Vec<Node> = shortlist
                .keys()
                .copied()
                .take(self.alpha)
                .collect::<Vec<_>>()
                .into_iter()
                .map(|id| shortlist.remove(&id).expect("key came from this map"))
                .collect();
            for n in &batch {
                queried.insert(n.id);
            }

            let responses = join_all(batch.into_iter().map(|n| {
                let caller = self.caller.clone();
                async move {
                    let res = caller.call(&n, |_echo| Body::FindNode { target }, EventKind::SendFindNode).await;
                    (n, res)
                }
            }))
            .await;

            let mut round_min: Option<Distance> = None;
            for (_sender, res) in responses {
                let Ok(frame) = res else { continue };
                let Body::PongFindNode { nodes, .. } = frame.body else { continue };
                for candidate in nodes {
                    if candidate.id == target {
                        return Some(candidate);
                    }
                    if queried.contains(&candidate.id) {
                        continue;
                    }
                    let d = candidate.id.distance(&target);
                    if d <= closest {
                        shortlist.insert(candidate.id, candidate);
                    }
                    round_min = Some(match round_min {
                        Some(m) if m <= d => m,
                        _ => d,
                    });
                }
            }
            if let Some(m) = round_min {
                if m < closest {
                    closest = m;
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn find_value(&self, key: Id) -> Option<Vec<u8>> {
        if let Some(v) = self.storage.get(&key).await {
            return Some(v);
        }

        let neighbors = self.routing.lock().await.find_neighbors(&key);
        let mut shortlist: Vec<Node> = neighbors.into_iter().map(|(_, n)| n).collect();

        while !shortlist.is_empty() {
            let take = self.alpha.min(shortlist.len());
            let batch: Vec<Node> = shortlist.drain(..take).collect();

            let responses = join_all(batch.into_iter().map(|n| {
                let caller = self.caller.clone();
                async move {
                    caller.call(&n, |_echo| Body::FindValue { key }, EventKind::SendFindValue).await
                }
            }))
            .await;

            for res in responses {
                let Ok(frame) = res else { continue };
                if let Body::PongFindValue { value, .. } = frame.body {
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
        None
    }

    /// Fans `STORE(key, value)` out to the ksize closest neighbors,
    /// tolerating individual failures, then optionally caches locally.
    #[instrument(skip(self, value))]
    pub async fn store(&self, key: Id, value: Vec<u8>, cached: bool) {
        let neighbors = self.routing.lock().await.find_neighbors(&key);

        let sends = neighbors.into_iter().map(|(_, n)| {
            let caller = self.caller.clone();
            let value = value.clone();
            async move {
                let _ = caller.call(&n, move |_echo| Body::Store { key, value }, EventKind::SendStore).await;
            }
        });
        join_all(sends).await;

        if cached {
            self.storage.store(key, value).await;
        }
    }
}
