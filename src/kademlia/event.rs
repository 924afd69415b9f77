// src/kademlia/event.rs
//
// Internal events flowing from the network layer to the handler. The
// primary bus is unconditional; the debug tap is a second, optional
// queue that must never change production semantics (see
// `debug.events` in the config).

use tokio::sync::mpsc;

use crate::kademlia::id::ID_LEN;
use crate::kademlia::node::Node;
use crate::network::codec::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ServiceStart,
    ServiceShutdown,
    SendPing,
    SendPongPing,
    SendStore,
    SendPongStore,
    SendFindNode,
    SendPongFindNode,
    SendFindValue,
    SendPongFindValue,
    HandlePing,
    HandleStore,
    HandleFindNode,
    HandleFindValue,
    HandlePongPing,
    HandlePongStore,
    HandlePongFindNode,
    HandlePongFindValue,
}

impl EventKind {
    /// Every kind except the lifecycle pair triggers a routing-table
    /// insertion of the event's `remote_node`.
    pub fn is_rpc_traffic(&self) -> bool {
        !matches!(self, EventKind::ServiceStart | EventKind::ServiceShutdown)
    }

    /// Inbound responses complete the pending call registered under the
    /// event's echo.
    pub fn is_rpc_response(&self) -> bool {
        matches!(
            self,
            EventKind::HandlePongPing
                | EventKind::HandlePongStore
                | EventKind::HandlePongFindNode
                | EventKind::HandlePongFindValue
        )
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub remote_node: Option<Node>,
    pub echo: [u8; ID_LEN],
    /// Present for `Handle*` kinds, where the handler needs the decoded
    /// frame to dispatch. `Send*`/lifecycle events carry no frame detail.
    pub frame: Option<Frame>,
}

impl Event {
    pub fn lifecycle(kind: EventKind) -> Self {
        Self { kind, remote_node: None, echo: [0u8; ID_LEN], frame: None }
    }

    pub fn inbound(kind: EventKind, remote_node: Node, echo: [u8; ID_LEN], frame: Frame) -> Self {
        Self { kind, remote_node: Some(remote_node), echo, frame: Some(frame) }
    }

    pub fn outbound(kind: EventKind, remote_node: Node, echo: [u8; ID_LEN]) -> Self {
        Self { kind, remote_node: Some(remote_node), echo, frame: None }
    }
}

pub type EventSender = mpsc::Sender<Event>;
pub type EventReceiver = mpsc::Receiver<Event>;

/// Bounded FIFO; overflow blocks the producer rather than dropping.
pub fn event_bus(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}

/// The optional debug tap. A disabled tap is a no-op; enabling it never
/// changes what the primary bus carries.
#[derive(Clone)]
pub struct DebugTap {
    sender: Option<EventSender>,
}

impl DebugTap {
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn enabled(capacity: usize) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { sender: Some(tx) }, rx)
    }

    pub async fn tee(&self, event: &Event) {
        if let Some(tx) = &self.sender {
            let _ = tx.send(event.clone()).await;
        }
    }
}
