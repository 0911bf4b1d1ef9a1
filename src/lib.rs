//! Push-Sum gossip aggregation simulated over a synthetic faulty overlay.
//!
//! Two halves, per the design: a transport-agnostic discrete-event
//! simulator ([`scheduler`], [`simulator`]) and a Push-Sum node state
//! machine with reliable per-link delivery ([`window`], [`reliability`],
//! [`node`]). [`topology`] and [`graphgen`] build the overlay the simulator
//! runs on; [`config`] and the `pushsum-sim` binary wire it all together for
//! the command line.

pub mod config;
pub mod graphgen;
pub mod message;
pub mod node;
pub mod node_id;
pub mod reliability;
pub mod scheduler;
pub mod simulator;
pub mod topology;
pub mod window;
