//! Push-Sum gossip node (C3): local aggregation state machine.
//!
//! Exposes one operation, [`Node::handle`], matching spec.md §4.3. A node is
//! agnostic to the simulator driving it — [`crate::simulator::Simulator`] is
//! generic over [`Node`] so an alternative implementation (e.g. the hybrid
//! eager/lazy push variant mentioned in spec.md §9, not implemented here)
//! could be substituted without touching the scheduler or the fault model.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::message::{GossipKind, Message, MessageBody, MessageId, OutgoingMessage};
use crate::node_id::NodeId;
use crate::reliability::ReliabilityController;
use crate::window::BoundedWindow;

pub const MIN_RTO: f64 = 20.0;
pub const MAX_RTO: f64 = 1000.0;

/// A node that can handle an incoming (or bootstrap) message and produce
/// zero or more outgoing messages for the simulator to schedule.
pub trait Node {
    fn handle(&mut self, src: Option<NodeId>, msg: Message, instant: u64) -> Vec<OutgoingMessage>;
}

/// Push-Sum aggregation state machine with reliable delivery.
///
/// Field names mirror spec.md §3's data model directly: `sum`/`weight` are
/// the aggregation pair, `round` tracks local progress, `responded`/
/// `requested` track per-round neighbor participation, and `no_news` is the
/// bounded window used for local termination detection.
pub struct PushSumNode {
    id: NodeId,
    sum: f64,
    weight: f64,
    aggregate: f64,
    round: u32,
    responded: HashMap<u32, HashSet<NodeId>>,
    requested: HashMap<u32, HashSet<NodeId>>,
    neighbors: Vec<NodeId>,
    fanout: usize,
    reliability: ReliabilityController,
    no_news: BoundedWindow<f64>,
    next_seq: u64,
    rng: StdRng,
}

impl PushSumNode {
    pub fn new(id: NodeId, neighbors: Vec<NodeId>, initial_value: f64, fanout: usize, no_news_window: usize, seed: u64) -> Self {
        let fanout = fanout.min(neighbors.len());
        let reliability = ReliabilityController::new(&neighbors, MIN_RTO, MAX_RTO);
        PushSumNode {
            id,
            sum: initial_value,
            weight: 0.0,
            aggregate: initial_value,
            round: 0,
            responded: HashMap::new(),
            requested: HashMap::new(),
            neighbors,
            fanout,
            reliability,
            no_news: BoundedWindow::new(no_news_window),
            next_seq: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn aggregate(&self) -> f64 {
        self.aggregate
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }

    /// Current RTO estimate for the link to `peer`, for introspection and
    /// reporting.
    pub fn rto_for(&self, peer: NodeId) -> f64 {
        self.reliability.rto_for(peer)
    }

    /// True once the no-news window has saturated on the current aggregate;
    /// the node still answers incoming REQUESTs but stops initiating rounds.
    pub fn is_locally_terminated(&self) -> bool {
        self.no_news.all_equal(&self.aggregate)
    }

    /// Drop `responded`/`requested` entries for rounds older than
    /// `current_round - window`. Optional per spec.md §9; not called
    /// automatically, since local termination already bounds the common case.
    pub fn gc(&mut self, window: u32) {
        let threshold = self.round.saturating_sub(window);
        self.responded.retain(|&round, _| round >= threshold);
        self.requested.retain(|&round, _| round >= threshold);
    }

    fn next_message_id(&mut self) -> MessageId {
        let seq = self.next_seq;
        self.next_seq += 1;
        MessageId { origin: self.id, seq }
    }

    fn make_ack(&self, dst: NodeId, id: MessageId) -> OutgoingMessage {
        OutgoingMessage { dst, msg: Message::ack(id), delay: 0 }
    }

    /// Install a retransmission timer and schedule the self-addressed
    /// RETRANSMISSION event per spec.md §4.2.
    fn safe_send(&mut self, out: OutgoingMessage, instant: u64) -> Vec<OutgoingMessage> {
        self.reliability.record_send(out.msg.id, instant);
        let rto = self.reliability.rto_for(out.dst);

        let retransmission_id = self.next_message_id();
        let retransmission = OutgoingMessage {
            dst: self.id,
            msg: Message::retransmission(retransmission_id, out.clone()),
            delay: rto as u64,
        };

        vec![out, retransmission]
    }

    /// Halve `(sum, weight)` and send half back to `dst` for `round`.
    fn respond(&mut self, dst: NodeId, round: u32, instant: u64) -> Vec<OutgoingMessage> {
        self.sum /= 2.0;
        self.weight /= 2.0;
        let id = self.next_message_id();
        let msg = Message::gossip(id, GossipKind::Response, round, self.sum, self.weight);
        self.safe_send(OutgoingMessage { dst, msg, delay: 0 }, instant)
    }

    /// Multicast a fresh round's REQUEST to `fanout` randomly chosen
    /// neighbors, retaining one share for this node.
    fn multi_request(&mut self, instant: u64) -> Vec<OutgoingMessage> {
        let denom = (self.fanout + 1) as f64;
        self.sum /= denom;
        self.weight /= denom;

        self.neighbors.shuffle(&mut self.rng);

        let mut out = Vec::with_capacity(self.fanout * 2);
        for &neighbor in self.neighbors.iter().take(self.fanout) {
            let id = self.next_message_id();
            let msg = Message::gossip(id, GossipKind::Request, self.round, self.sum, self.weight);
            out.extend(self.safe_send(OutgoingMessage { dst: neighbor, msg, delay: 0 }, instant));
        }
        out
    }

    /// Recompute the aggregate and, if the round is complete and the node
    /// hasn't converged, advance to the next round (spec.md §4.3, "Round
    /// advancement").
    fn advance_round(&mut self, instant: u64) -> Vec<OutgoingMessage> {
        if self.weight != 0.0 {
            self.aggregate = round_to(self.sum / self.weight, 3);
        }

        let round_complete = match self.responded.get(&self.round) {
            None => true,
            Some(set) => set.len() == self.fanout,
        };
        let converged = self.no_news.all_equal(&self.aggregate);

        let mut out = Vec::new();
        if round_complete && !converged {
            self.round += 1;
            self.responded.insert(self.round, HashSet::new());
            out = self.multi_request(instant);
        }

        self.no_news.add(self.aggregate);
        out
    }

    fn handle_gossip(&mut self, src: Option<NodeId>, id: MessageId, kind: GossipKind, round: u32, delta_sum: f64, delta_weight: f64, instant: u64) -> Vec<OutgoingMessage> {
        let mut out = Vec::new();

        match src {
            None => {
                // Seed event: this is the anchor node that injects the "1".
                self.weight = 1.0;
            }
            Some(src) => match kind {
                GossipKind::Request => {
                    let duplicate = self.requested.get(&round).is_some_and(|set| set.contains(&src));
                    if duplicate {
                        return vec![self.make_ack(src, id)];
                    }
                    self.requested.entry(round).or_default().insert(src);
                    // Halve-and-respond happens before crediting the incoming
                    // payload, so the responder mixes its pre-merge half back.
                    out.extend(self.respond(src, round, instant));
                    self.sum += delta_sum;
                    self.weight += delta_weight;
                    out.push(self.make_ack(src, id));
                }
                GossipKind::Response => {
                    let duplicate = self.responded.get(&round).is_some_and(|set| set.contains(&src));
                    if duplicate {
                        return vec![self.make_ack(src, id)];
                    }
                    self.responded.entry(round).or_default().insert(src);
                    self.sum += delta_sum;
                    self.weight += delta_weight;
                    out.push(self.make_ack(src, id));
                }
            },
        }

        out.extend(self.advance_round(instant));
        out
    }

    fn handle_ack(&mut self, src: Option<NodeId>, id: MessageId, instant: u64) {
        if let Some(src) = src {
            self.reliability.on_ack(src, id, instant);
        }
    }

    fn handle_retransmission(&mut self, original: OutgoingMessage, instant: u64) -> Vec<OutgoingMessage> {
        if !self.reliability.has_timer(&original.msg.id) {
            // The ACK arrived in the meantime; suppress this retransmission.
            return Vec::new();
        }

        self.reliability.backoff(original.dst);

        let new_id = self.next_message_id();
        let mut renewed = original;
        renewed.msg.id = new_id;
        self.safe_send(renewed, instant)
    }
}

impl Node for PushSumNode {
    fn handle(&mut self, src: Option<NodeId>, msg: Message, instant: u64) -> Vec<OutgoingMessage> {
        match msg.body {
            MessageBody::Gossip { kind, round, sum, weight } => self.handle_gossip(src, msg.id, kind, round, sum, weight, instant),
            MessageBody::Ack => {
                self.handle_ack(src, msg.id, instant);
                Vec::new()
            }
            MessageBody::Retransmission(original) => self.handle_retransmission(*original, instant),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
