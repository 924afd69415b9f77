// src/kademlia/routing.rs
//
// 160 k-buckets over XOR distance from the local node. `add_node` is
// synchronous and never touches the network: on a full bucket it reports
// the oldest entry back to the caller, which may probe it (see
// `Service::maybe_evict`) and later call `replace_oldest`.

use std::collections::VecDeque;

use super::id::{Distance, Id};
use super::node::Node;

const NUM_BUCKETS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Newcomer was not present; bucket had room, inserted at the tail.
    Inserted,
    /// Newcomer was already present; moved to the tail.
    Refreshed,
    /// The local node's own id; ignored.
    Own,
    /// Bucket at `bucket_index` was full. `oldest` is its head; the
    /// caller may probe `oldest` and, if it doesn't answer, call
    /// `replace_oldest(bucket_index, oldest.id, newcomer)`.
    Full { bucket_index: usize, oldest: Node },
}

struct KBucket {
    nodes: VecDeque<Node>,
}

impl KBucket {
    fn new() -> Self {
        Self { nodes: VecDeque::new() }
    }
}

pub struct RoutingTable {
    self_id: Id,
    ksize: usize,
    buckets: Vec<KBucket>,
}

impl RoutingTable {
    pub fn new(self_id: Id, ksize: usize) -> Self {
        let mut buckets = Vec::with_capacity(NUM_BUCKETS);
        for _ in 0..NUM_BUCKETS {
            buckets.push(KBucket::new());
        }
        Self { self_id, ksize, buckets }
    }

    pub fn self_id(&self) -> Id {
        self.self_id
    }

    pub fn add_node(&mut self, node: Node) -> AddOutcome {
        if node.id == self.self_id {
            return AddOutcome::Own;
        }
        let distance = self.self_id.distance(&node.id);
        let idx = distance.bucket_index();
        let bucket = &mut self.buckets[idx];

        if let Some(pos) = bucket.nodes.iter().position(|n| n.id == node.id) {
            bucket.nodes.remove(pos);
            bucket.nodes.push_back(node);
            return AddOutcome::Refreshed;
        }

        if bucket.nodes.len() < self.ksize {
            bucket.nodes.push_back(node);
            return AddOutcome::Inserted;
        }

        let oldest = *bucket.nodes.front().expect("full bucket is non-empty");
        AddOutcome::Full { bucket_index: idx, oldest }
    }

    /// Called after a liveness probe of `oldest_id` in bucket
    /// `bucket_index` failed: evicts it and inserts `newcomer` at the
    /// tail. No-op if the bucket changed shape since `add_node` reported
    /// it full (e.g. the oldest already got refreshed or evicted).
    pub fn replace_oldest(&mut self, bucket_index: usize, oldest_id: Id, newcomer: Node) {
        let bucket = &mut self.buckets[bucket_index];
        if let Some(pos) = bucket.nodes.iter().position(|n| n.id == oldest_id) {
            bucket.nodes.remove(pos);
            bucket.nodes.push_back(newcomer);
        }
    }

    pub fn remove(&mut self, id: &Id) {
        if *id == self.self_id {
            return;
        }
        let idx = self.self_id.distance(id).bucket_index();
        let bucket = &mut self.buckets[idx];
        if let Some(pos) = bucket.nodes.iter().position(|n| n.id == *id) {
            bucket.nodes.remove(pos);
        }
    }

    /// The `ksize` nodes in the table closest to `target`, paired with
    /// their distance, ascending. Ties (impossible given id uniqueness)
    /// fall out of the id's own lexicographic ordering.
    pub fn find_neighbors(&self, target: &Id) -> Vec<(Distance, Node)> {
        let mut all: Vec<(Distance, Node)> = self
            .buckets
            .iter()
            .flat_map(|b| b.nodes.iter())
            .map(|n| (n.id.distance(target), *n))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        all.truncate(self.ksize);
        all
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.nodes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
