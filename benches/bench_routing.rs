// benches/bench_routing.rs

use criterion::{criterion_group, criterion_main, Criterion};
use kadnode::kademlia::id::Id;
use kadnode::kademlia::node::{Node, Remote};
use kadnode::kademlia::routing::RoutingTable;
use std::net::Ipv4Addr;

fn filled_table() -> RoutingTable {
    let self_id = Id::random();
    let mut table = RoutingTable::new(self_id, 20);
    for _ in 0..2000 {
        let node = Node::new(Id::random(), Remote::new(Ipv4Addr::new(127, 0, 0, 1), 9000));
        table.add_node(node);
    }
    table
}

fn bench_add_node(c: &mut Criterion) {
    let mut table = filled_table();
    c.bench_function("routing table add_node", |b| {
        b.iter(|| {
            let node = Node::new(Id::random(), Remote::new(Ipv4Addr::new(127, 0, 0, 1), 9000));
            table.add_node(node);
        })
    });
}

fn bench_find_neighbors(c: &mut Criterion) {
    let table = filled_table();
    c.bench_function("routing table find_neighbors", |b| {
        b.iter(|| {
            let target = Id::random();
            table.find_neighbors(&target)
        })
    });
}

criterion_group!(benches, bench_add_node, bench_find_neighbors);
criterion_main!(benches);
