use std::sync::atomic::{AtomicUsize, Ordering};

use crate::id::Identifier;
use crate::task::Task;

use super::edge::DagEdge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexStatus {
    Initialized,
    Scheduled,
    Running,
    Passed,
    Failed,
    Invalid,
}

/// A node in the DAG, optionally carrying the task it represents.
///
/// Owns its outgoing edges directly; incoming-edge bookkeeping is an
/// atomic counter rather than a reverse edge list, since nothing needs
/// to walk backwards over who points here, only how many do.
pub struct DagVertex {
    id: Identifier,
    label: String,
    status: VertexStatus,
    outgoing: Vec<DagEdge>,
    incoming_count: AtomicUsize,
    task: Option<Task>,
}

impl DagVertex {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_id(Identifier::new(), label)
    }

    /// Builds a vertex with a caller-supplied identifier, used by the
    /// workflow loader where the document's `UUID` field names the
    /// vertex rather than letting one be generated.
    pub fn with_id(id: Identifier, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            status: VertexStatus::Initialized,
            outgoing: Vec::new(),
            incoming_count: AtomicUsize::new(0),
            task: None,
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.task = Some(task);
        self
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&self) -> VertexStatus {
        self.status
    }

    pub fn set_status(&mut self, status: VertexStatus) {
        self.status = status;
    }

    pub fn outgoing_edges(&self) -> &[DagEdge] {
        &self.outgoing
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn task_mut(&mut self) -> Option<&mut Task> {
        self.task.as_mut()
    }

    pub fn take_task(&mut self) -> Option<Task> {
        self.task.take()
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    pub fn incoming_count(&self) -> usize {
        self.incoming_count.load(Ordering::Acquire)
    }

    pub(crate) fn increment_incoming(&self) {
        self.incoming_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn decrement_incoming(&self) {
        self.incoming_count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            Some(count.saturating_sub(1))
        }).expect("saturating_sub update never fails");
    }

    /// True iff one of this vertex's outgoing edges targets `vertex`.
    pub fn contains_connection_to(&self, vertex: &DagVertex) -> bool {
        self.outgoing.iter().any(|edge| edge.is_a_connection_to(vertex))
    }

    /// Adds a fresh outgoing edge to `target`, rejecting a duplicate
    /// connection to the same vertex. Returns whether the edge was
    /// added.
    pub fn connect(&mut self, target: &DagVertex) -> bool {
        if self.contains_connection_to(target) {
            return false;
        }
        let mut edge = DagEdge::new();
        edge.connect_to(target, None);
        self.outgoing.push(edge);
        true
    }

    /// Snapshot of this vertex's outgoing edges paired with their
    /// current targets, used by `Dag::clone` to reconnect the cloned
    /// vertex set in a second pass.
    pub fn clone_all_connections(&self) -> Vec<(DagEdge, Identifier)> {
        self.outgoing
            .iter()
            .filter_map(|edge| edge.target().map(|target| (edge.clone(), target)))
            .collect()
    }

    pub(crate) fn outgoing_mut(&mut self) -> &mut Vec<DagEdge> {
        &mut self.outgoing
    }

    /// Copies identity, label, status, and the task (deep), but resets
    /// the incoming count to zero and drops outgoing edges. Named
    /// distinctly from `Clone` so callers can't reach for this
    /// expecting a full copy of the vertex's connections — recovering
    /// those requires the owning `Dag`, which alone can resolve edge
    /// targets back to sibling vertices.
    pub fn clone_vertex(&self) -> DagVertex {
        DagVertex {
            id: self.id,
            label: self.label.clone(),
            status: self.status,
            outgoing: Vec::new(),
            incoming_count: AtomicUsize::new(0),
            task: self.task.as_ref().map(Task::clone_task),
        }
    }
}

impl std::fmt::Display for DagVertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Vertex(id={}, label={}, status={:?}, incoming={}, outgoing={})",
            self.id,
            self.label,
            self.status,
            self.incoming_count(),
            self.outgoing.len()
        )
    }
}
