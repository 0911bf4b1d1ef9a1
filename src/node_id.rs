//! Opaque node identifiers.

use std::fmt;

/// Identifies a node within a single simulation run.
///
/// The original protocol treats identifiers as opaque strings of the form
/// `"(0)"`; we keep the textual rendering for logs and reports but store the
/// value as a `u32` internally so it stays `Copy` and hashes cheaply on the
/// simulator's hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_parenthesized_number() {
        assert_eq!(NodeId::new(7).to_string(), "(7)");
    }
}
