//! Faulty discrete-event simulator (C5): drives any [`Node`] implementation
//! over a [`Topology`] under synthetic message loss, per spec.md §4.5.
//!
//! Single-threaded and synchronous: one event is popped, validated, possibly
//! dropped, and (if delivered) its node's response is re-enqueued, all before
//! the next event is considered. There is no shared mutable state beyond
//! `self`, so nothing here needs locking.

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::HashMap;

use crate::message::{MessageBody, MessageId};
use crate::node::Node;
use crate::node_id::NodeId;
use crate::scheduler::{Event, EventScheduler};
use crate::topology::Topology;

/// Coarse message taxonomy label, cheap to derive without consuming the
/// message, kept alongside each recorded event for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    GossipRequest,
    GossipResponse,
    Ack,
    Retransmission,
}

fn message_kind(body: &MessageBody) -> MessageKind {
    match body {
        MessageBody::Gossip { kind: crate::message::GossipKind::Request, .. } => MessageKind::GossipRequest,
        MessageBody::Gossip { kind: crate::message::GossipKind::Response, .. } => MessageKind::GossipResponse,
        MessageBody::Ack => MessageKind::Ack,
        MessageBody::Retransmission(_) => MessageKind::Retransmission,
    }
}

/// What became of a popped event, for the audit trail and for error-kind
/// reporting (spec.md §7: loss, invalid event, horizon-reached, numerical
/// division-guard — the last of those is handled inside the node itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Delivered to its destination node; the node's response, if any, was
    /// re-enqueued.
    Delivered,
    /// Dropped by the fault model. Only possible for a non-self,
    /// non-seed event (REDESIGN FLAG: seed and self-addressed events are
    /// exempt from loss).
    Lost,
    /// Neither a seed nor a self-addressed event, and no edge exists
    /// between `src` and `dst` in the topology.
    Invalid,
}

/// A processed event together with its outcome, forming the run's audit
/// trail.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub instant: u64,
    pub src: Option<NodeId>,
    pub dst: NodeId,
    pub message_id: MessageId,
    pub kind: MessageKind,
    pub outcome: EventOutcome,
}

/// Drives a population of `N: Node` through the event scheduler, charging
/// topology distance plus node-declared processing delay on every
/// re-enqueued message.
pub struct Simulator<N: Node> {
    nodes: HashMap<NodeId, N>,
    topology: Topology,
    fault_chance: f64,
    horizon: u64,
    current_instant: u64,
    pending: EventScheduler,
    history: Vec<RecordedEvent>,
    rng: StdRng,
}

impl<N: Node> Simulator<N> {
    pub fn new(nodes: HashMap<NodeId, N>, topology: Topology, fault_chance: f64, horizon: u64, seed: u64) -> Self {
        Simulator {
            nodes,
            topology,
            fault_chance,
            horizon,
            current_instant: 0,
            pending: EventScheduler::new(),
            history: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn current_instant(&self) -> u64 {
        self.current_instant
    }

    /// Whether the scheduler has no more events to process.
    pub fn is_quiescent(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether the last call to [`Self::proceed`] or [`Self::start`] ran the
    /// clock past the configured horizon without draining the queue.
    pub fn horizon_reached(&self) -> bool {
        self.current_instant > self.horizon && !self.pending.is_empty()
    }

    pub fn history(&self) -> &[RecordedEvent] {
        &self.history
    }

    pub fn nodes(&self) -> &HashMap<NodeId, N> {
        &self.nodes
    }

    /// Seed the run with a bootstrap event (`src: None`) and drive it to
    /// quiescence or horizon.
    pub fn start(&mut self, seed_node: NodeId, msg: crate::message::Message) -> &[RecordedEvent] {
        self.pending.push(Event { instant: 0, src: None, dst: seed_node, msg });
        self.run()
    }

    /// Extend the horizon by `extra_ms` and keep draining the queue. Useful
    /// for a CLI harness that wants to give a run more time after an initial
    /// pass stalls on the horizon.
    pub fn proceed(&mut self, extra_ms: u64) -> &[RecordedEvent] {
        self.horizon += extra_ms;
        self.run()
    }

    // Mirrors sim/faulty.py's loop exactly: the horizon check at the top of
    // each iteration uses the instant set by the *previous* iteration, so
    // the event that first carries the clock past the horizon is still
    // fully processed before the next check ends the loop.
    fn run(&mut self) -> &[RecordedEvent] {
        while self.current_instant <= self.horizon {
            let Some(event) = self.pending.pop_min() else {
                break;
            };
            self.current_instant = event.instant;
            self.process(event);
        }
        &self.history
    }

    fn process(&mut self, event: Event) {
        let Event { instant, src, dst, msg } = event;
        let message_id = msg.id;
        let kind = message_kind(&msg.body);

        // §4.5 orders the loss filter before the validity filter (sim/faulty.py
        // checks fault_chance first); keep that order even though it only
        // affects the RNG draw sequence for ill-formed events.
        if self.is_lost(src, dst) {
            trace!("lost {} -> {} ({}) at t={}", fmt_src(src), dst, message_id, instant);
            self.history.push(RecordedEvent { instant, src, dst, message_id, kind, outcome: EventOutcome::Lost });
            return;
        }

        if !self.is_valid(src, dst) {
            warn!("dropping invalid event {} -> {} at t={}", fmt_src(src), dst, instant);
            self.history.push(RecordedEvent { instant, src, dst, message_id, kind, outcome: EventOutcome::Invalid });
            return;
        }

        let outgoing = match self.nodes.get_mut(&dst) {
            Some(node) => node.handle(src, msg, instant),
            None => {
                warn!("event addressed to unknown node {}", dst);
                Vec::new()
            }
        };

        for out in outgoing {
            let delay = self.link_distance(dst, out.dst) + out.delay;
            debug!("{} -> {} ({}) scheduled for t={}", dst, out.dst, out.msg.id, instant + delay);
            self.pending.push(Event {
                instant: instant + delay,
                src: Some(dst),
                dst: out.dst,
                msg: out.msg,
            });
        }

        self.history.push(RecordedEvent { instant, src, dst, message_id, kind, outcome: EventOutcome::Delivered });
    }

    /// A seed event (`src: None`) or a self-addressed one (a node's own
    /// retransmission timer) is always valid. Otherwise an edge must exist
    /// between `src` and `dst` in either direction.
    fn is_valid(&self, src: Option<NodeId>, dst: NodeId) -> bool {
        match src {
            None => true,
            Some(src) if src == dst => true,
            Some(src) => self.topology.has_edge(src, dst),
        }
    }

    /// Seed and self-addressed events are exempt from loss (REDESIGN FLAG);
    /// everything else is dropped independently with probability
    /// `fault_chance`.
    fn is_lost(&mut self, src: Option<NodeId>, dst: NodeId) -> bool {
        match src {
            None => false,
            Some(src) if src == dst => false,
            Some(_) => self.rng.gen::<f64>() < self.fault_chance,
        }
    }

    fn link_distance(&self, a: NodeId, b: NodeId) -> u64 {
        if a == b {
            return 0;
        }
        self.topology.symmetric_distance(a, b).unwrap_or(0)
    }
}

fn fmt_src(src: Option<NodeId>) -> String {
    match src {
        Some(id) => id.to_string(),
        None => "(seed)".to_string(),
    }
}
