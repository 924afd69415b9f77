// src/kademlia/node.rs
//
// The addressable unit of the overlay: an id plus a reachable remote.

use std::fmt;
use std::net::Ipv4Addr;

use super::id::Id;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Remote {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Remote {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(std::net::IpAddr::V4(self.host), self.port)
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Copy)]
pub struct Node {
    pub id: Id,
    pub remote: Remote,
}

impl Node {
    pub fn new(id: Id, remote: Remote) -> Self {
        Self { id, remote }
    }

    pub fn distance(&self, target: &Id) -> super::id::Distance {
        self.id.distance(target)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:?}@{:?})", self.id, self.remote)
    }
}
