// src/lib.rs
//
// A Kademlia DHT node over TCP: the wire codec, routing table, event
// bus/handler, call layer, and iterative lookup engine, plus a
// content-addressed commit log built on top of `store`/`find_value`.

pub mod config_loader;
pub mod error;
pub mod kademlia;
pub mod logging;
pub mod network;
