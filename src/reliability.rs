//! Per-link reliability controller (C2): RTO/SRTT/RTTVAR tracking and the
//! in-flight timer table, embedded in every [`crate::node::PushSumNode`].
//!
//! Implements the Jacobson-style adaptive estimator from spec.md §4.2. The
//! simulator cannot distinguish loss from delay, so retransmission timeouts
//! are derived from observed round-trip times rather than assumed fixed.

use std::collections::HashMap;

use crate::message::MessageId;
use crate::node_id::NodeId;

const INITIAL_RTO: f64 = 60.0;

/// Per-neighbor RTO estimator state.
#[derive(Debug, Clone, Copy)]
struct RtoEntry {
    srtt: Option<f64>,
    rttvar: f64,
    rto: f64,
}

impl RtoEntry {
    fn new() -> Self {
        RtoEntry { srtt: None, rttvar: -1.0, rto: INITIAL_RTO }
    }
}

#[derive(Debug, Clone)]
pub struct ReliabilityController {
    entries: HashMap<NodeId, RtoEntry>,
    timers: HashMap<MessageId, u64>,
    min_rto: f64,
    max_rto: f64,
}

impl ReliabilityController {
    pub fn new(neighbors: &[NodeId], min_rto: f64, max_rto: f64) -> Self {
        let entries = neighbors.iter().map(|&n| (n, RtoEntry::new())).collect();
        ReliabilityController {
            entries,
            timers: HashMap::new(),
            min_rto,
            max_rto,
        }
    }

    fn entry(&mut self, node: NodeId) -> &mut RtoEntry {
        self.entries.entry(node).or_insert_with(RtoEntry::new)
    }

    /// Current RTO estimate for `node`, defaulting a never-before-seen
    /// neighbor to the initial value.
    pub fn rto_for(&self, node: NodeId) -> f64 {
        self.entries.get(&node).map(|e| e.rto).unwrap_or(INITIAL_RTO)
    }

    pub fn min_rto(&self) -> f64 {
        self.min_rto
    }

    pub fn max_rto(&self) -> f64 {
        self.max_rto
    }

    /// Record that `id` was sent at `now`, awaiting an ACK.
    pub fn record_send(&mut self, id: MessageId, now: u64) {
        self.timers.insert(id, now);
    }

    pub fn has_timer(&self, id: &MessageId) -> bool {
        self.timers.contains_key(id)
    }

    /// Handle an ACK for `id` from `src`, updating SRTT/RTTVAR/RTO.
    /// No-op (stale ACK) if the timer is absent.
    pub fn on_ack(&mut self, src: NodeId, id: MessageId, now: u64) {
        let Some(sent_at) = self.timers.remove(&id) else {
            return;
        };
        let rtt = (now.saturating_sub(sent_at)) as f64;
        let min_rto = self.min_rto;
        let entry = self.entry(src);
        match entry.srtt {
            None => {
                entry.srtt = Some(rtt);
                entry.rttvar = rtt * 0.5;
            }
            Some(srtt) => {
                entry.rttvar = 0.75 * entry.rttvar + 0.25 * (srtt - rtt).abs();
                entry.srtt = Some(0.875 * srtt + 0.125 * rtt);
            }
        }
        entry.rto = entry.srtt.unwrap() + f64::max(min_rto, 4.0 * entry.rttvar);
    }

    /// Exponential backoff on retransmission: doubles the RTO, capped at
    /// `max_rto`. Returns the new value.
    pub fn backoff(&mut self, node: NodeId) -> f64 {
        let max_rto = self.max_rto;
        let entry = self.entry(node);
        entry.rto = f64::min(entry.rto * 2.0, max_rto);
        entry.rto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(n: u32) -> NodeId {
        NodeId::new(n)
    }

    #[test]
    fn first_ack_seeds_srtt_and_rttvar_from_rtt() {
        let mut c = ReliabilityController::new(&[node(1)], 20.0, 1000.0);
        let id = MessageId { origin: node(0), seq: 0 };
        c.record_send(id, 0);
        c.on_ack(node(1), id, 40);
        assert_eq!(c.rto_for(node(1)), 40.0 + f64::max(20.0, 4.0 * 20.0));
    }

    #[test]
    fn stale_ack_is_ignored() {
        let mut c = ReliabilityController::new(&[node(1)], 20.0, 1000.0);
        let id = MessageId { origin: node(0), seq: 0 };
        // No send recorded for this id.
        c.on_ack(node(1), id, 40);
        assert!(!c.has_timer(&id));
        assert_eq!(c.rto_for(node(1)), INITIAL_RTO);
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let mut c = ReliabilityController::new(&[node(1)], 20.0, 1000.0);
        assert_eq!(c.backoff(node(1)), 120.0);
        assert_eq!(c.backoff(node(1)), 240.0);
        assert_eq!(c.backoff(node(1)), 480.0);
        assert_eq!(c.backoff(node(1)), 960.0);
        assert_eq!(c.backoff(node(1)), 1000.0);
        assert_eq!(c.backoff(node(1)), 1000.0);
    }

    #[test]
    fn rto_never_leaves_configured_bounds() {
        let mut c = ReliabilityController::new(&[node(1)], 20.0, 1000.0);
        for _ in 0..10 {
            c.backoff(node(1));
            assert!(c.rto_for(node(1)) >= c.min_rto());
            assert!(c.rto_for(node(1)) <= c.max_rto());
        }
    }
}
