// src/network/connection.rs
//
// One listening endpoint; one short-lived outbound connection per
// outbound RPC. Each accepted connection yields exactly one event on the
// bus; a decode error drops that connection without disturbing anything
// else (see codec::decode).

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, instrument, warn};

use crate::error::NodeError;
use crate::kademlia::event::{DebugTap, Event, EventKind, EventSender};
use crate::kademlia::node::{Node, Remote};
use crate::network::codec::{self, Body, Frame};

fn classify_inbound(body: &Body) -> EventKind {
    match body {
        Body::Ping => EventKind::HandlePing,
        Body::Pong => EventKind::HandlePongPing,
        Body::Store { .. } => EventKind::HandleStore,
        Body::PongStore { .. } => EventKind::HandlePongStore,
        Body::FindNode { .. } => EventKind::HandleFindNode,
        Body::PongFindNode { .. } => EventKind::HandlePongFindNode,
        Body::FindValue { .. } => EventKind::HandleFindValue,
        Body::PongFindValue { .. } => EventKind::HandlePongFindValue,
        // REDUCE has no handler dispatch (reserved extension point); frames
        // that arrive are acknowledged at the connection layer only through
        // routing-table maintenance, which the caller still performs.
        Body::Reduce { .. } => EventKind::HandleFindNode,
        Body::PongReduce { .. } => EventKind::HandlePongFindNode,
    }
}

/// Accepts connections on `listener` forever, emitting one event per
/// connection onto `event_tx`. Returns only if the listener itself
/// errors fatally (bind loss); per-connection errors are logged and
/// swallowed.
#[instrument(skip(listener, event_tx, debug_tap))]
pub async fn serve(
    listener: TcpListener,
    event_tx: EventSender,
    debug_tap: DebugTap,
) -> std::io::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let event_tx = event_tx.clone();
        let debug_tap = debug_tap.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, event_tx, debug_tap).await {
                debug!(%peer_addr, error = %e, "dropping connection on decode error");
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    event_tx: EventSender,
    debug_tap: DebugTap,
) -> Result<(), NodeError> {
    let frame = codec::decode(&mut stream).await?;
    let remote_node = Node::new(frame.header.sender_id, frame.header.sender_remote);
    let kind = classify_inbound(&frame.body);
    let echo = frame.header.echo;
    let event = Event::inbound(kind, remote_node, echo, frame);
    debug_tap.tee(&event).await;
    event_tx.send(event).await.map_err(|_| NodeError::BusClosed)?;
    let _ = peer_addr;
    Ok(())
}

/// Opens a short-lived outbound connection, writes one request frame,
/// and closes. The response (if any) arrives later as its own inbound
/// connection from the peer, which `serve` turns into a `Handle*` event.
pub async fn send_frame(remote: &Remote, frame: &Frame) -> Result<(), NodeError> {
    let addr = remote.socket_addr();
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|source| NodeError::Connect { addr: addr.to_string(), source })?;
    codec::write_frame(&mut stream, frame)
        .await
        .map_err(|source| NodeError::Connect { addr: addr.to_string(), source })?;
    Ok(())
}

pub async fn bind(remote: &Remote) -> Result<TcpListener, NodeError> {
    let addr = remote.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| NodeError::Bind { addr: addr.to_string(), source })?;
    if remote.host.is_loopback() {
        warn!(?remote, "listening only on loopback; remote peers won't reach this node");
    }
    Ok(listener)
}
