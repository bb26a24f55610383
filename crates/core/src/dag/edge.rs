//! Edges address their target vertex by identifier, never by pointer —
//! there is no shared or weak ownership between vertices in this DAG.

use crate::id::Identifier;

use super::vertex::DagVertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStatus {
    Initialized,
    Traversed,
    NonTraversable,
}

/// An outgoing connection from one vertex to another, named by the
/// target's identifier.
///
/// `PartialEq` compares only `id` and `status`, never the vertex the
/// edge currently targets — comparing through to the target's own
/// edges would recurse back into vertex equality. `Dag`'s own equality
/// walks vertices and their edge lists directly instead of relying on
/// this impl to do it transitively.
#[derive(Debug, Clone)]
pub struct DagEdge {
    id: Identifier,
    status: EdgeStatus,
    target: Option<Identifier>,
}

impl DagEdge {
    pub fn new() -> Self {
        Self {
            id: Identifier::new(),
            status: EdgeStatus::Initialized,
            target: None,
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn status(&self) -> EdgeStatus {
        self.status
    }

    pub fn target(&self) -> Option<Identifier> {
        self.target
    }

    /// True iff this edge currently targets `vertex`.
    pub fn is_a_connection_to(&self, vertex: &DagVertex) -> bool {
        self.target == Some(vertex.id())
    }

    /// Points this edge at `target`, decrementing `previous`'s incoming
    /// count first if this edge already pointed somewhere. Returns
    /// true only when there was no prior connection.
    pub fn connect_to(&mut self, target: &DagVertex, previous: Option<&DagVertex>) -> bool {
        let was_unconnected = self.target.is_none();
        if let Some(previous) = previous {
            previous.decrement_incoming();
        }
        self.target = Some(target.id());
        self.status = EdgeStatus::Initialized;
        target.increment_incoming();
        was_unconnected
    }

    /// Clears the connection, decrementing `target`'s incoming count.
    /// `target` must be the vertex this edge currently points at.
    pub fn disconnect(&mut self, target: &DagVertex) {
        debug_assert_eq!(self.target, Some(target.id()));
        target.decrement_incoming();
        self.target = None;
        self.status = EdgeStatus::NonTraversable;
    }

    pub fn mark_traversed(&mut self) {
        self.status = EdgeStatus::Traversed;
    }
}

impl Default for DagEdge {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DagEdge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.status == other.status
    }
}

impl std::fmt::Display for DagEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target {
            Some(target) => write!(f, "Edge(id={}, status={:?}, target={})", self.id, self.status, target),
            None => write!(f, "Edge(id={}, status={:?}, target=none)", self.id, self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_a_connection_to_checks_the_current_target() {
        let a = DagVertex::new("a");
        let b = DagVertex::new("b");
        let mut edge = DagEdge::new();
        edge.connect_to(&a, None);
        assert!(edge.is_a_connection_to(&a));
        assert!(!edge.is_a_connection_to(&b));
    }

    #[test]
    fn disconnect_marks_non_traversable_and_clears_target() {
        let a = DagVertex::new("a");
        let mut edge = DagEdge::new();
        edge.connect_to(&a, None);
        edge.mark_traversed();
        assert_eq!(edge.status(), EdgeStatus::Traversed);

        edge.disconnect(&a);
        assert_eq!(edge.status(), EdgeStatus::NonTraversable);
        assert_eq!(edge.target(), None);
        assert_eq!(a.incoming_count(), 0);
    }
}
