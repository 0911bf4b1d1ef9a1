//! Message and event payload types exchanged between nodes.
//!
//! Every message carries a [`MessageId`] unique to its originating node,
//! assigned at send time by [`crate::node::PushSumNode::next_message_id`].
//! `Ack` messages are the one exception: they echo the id of the message
//! they acknowledge rather than minting a fresh one.

use std::fmt;

use crate::node_id::NodeId;

/// `"[node,seq]"` identifier, unique within the originating node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId {
    pub origin: NodeId,
    pub seq: u64,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.origin.0, self.seq)
    }
}

/// Distinguishes a gossip request (pushing a pair outward) from its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GossipKind {
    Request,
    Response,
}

/// The payload carried by a message, tagged by the core taxonomy
/// `{GOSSIP, ACK, RETRANSMISSION}`.
#[derive(Debug, Clone)]
pub enum MessageBody {
    Gossip {
        kind: GossipKind,
        round: u32,
        sum: f64,
        weight: f64,
    },
    /// Acknowledges delivery of another message; carries no payload.
    Ack,
    /// A self-addressed reminder to re-send `message` if it has not been
    /// acknowledged by the time this fires.
    Retransmission(Box<OutgoingMessage>),
}

/// A tagged record `(kind, id, payload)`.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub body: MessageBody,
}

impl Message {
    pub fn gossip(id: MessageId, kind: GossipKind, round: u32, sum: f64, weight: f64) -> Self {
        Message {
            id,
            body: MessageBody::Gossip { kind, round, sum, weight },
        }
    }

    pub fn ack(id: MessageId) -> Self {
        Message { id, body: MessageBody::Ack }
    }

    pub fn retransmission(id: MessageId, original: OutgoingMessage) -> Self {
        Message {
            id,
            body: MessageBody::Retransmission(Box::new(original)),
        }
    }
}

/// One outgoing `(dst, msg, delay)` tuple as produced by a node's `handle`.
///
/// `delay` is a node-local processing delay added on top of the link
/// distance the simulator charges when it turns this into a scheduled
/// event.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub dst: NodeId,
    pub msg: Message,
    pub delay: u64,
}
