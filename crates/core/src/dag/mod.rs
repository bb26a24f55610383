//! The DAG container: the sole mutator of vertices and edges.
//!
//! Vertices live in an insertion-ordered `Vec`; everything that needs
//! to reach two vertices at once (connecting an edge, for instance)
//! goes through the container rather than through pointers the
//! vertices hold on each other.

pub mod algorithms;
mod edge;
mod vertex;

pub use edge::{DagEdge, EdgeStatus};
pub use vertex::{DagVertex, VertexStatus};

use crate::document::Document;
use crate::error::DagError;
use crate::id::Identifier;

pub struct Dag {
    title: String,
    vertices: Vec<DagVertex>,
    config: Document,
}

impl Dag {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            vertices: Vec::new(),
            config: Document::empty(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_config(mut self, config: Document) -> Self {
        self.config = config;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn config(&self) -> &Document {
        &self.config
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.vertices.iter().map(|v| v.outgoing_edges().len()).sum()
    }

    pub fn vertices(&self) -> &[DagVertex] {
        &self.vertices
    }

    pub fn add_vertex(&mut self, vertex: DagVertex) -> Result<(), DagError> {
        if self.contains_vertex_by_uuid(&vertex.id()) {
            return Err(DagError::DuplicateVertex(vertex.id()));
        }
        self.vertices.push(vertex);
        Ok(())
    }

    pub fn find_vertex(&self, id: Identifier) -> Option<&DagVertex> {
        self.vertices.iter().find(|v| v.id() == id)
    }

    pub fn find_vertex_mut(&mut self, id: Identifier) -> Option<&mut DagVertex> {
        self.vertices.iter_mut().find(|v| v.id() == id)
    }

    pub fn find_vertex_by_uuid(&self, id: &Identifier) -> Option<&DagVertex> {
        self.find_vertex(*id)
    }

    pub fn find_all_vertices_with_label(&self, label: &str) -> Vec<&DagVertex> {
        self.vertices.iter().filter(|v| v.label() == label).collect()
    }

    pub fn contains_vertex(&self, vertex: &DagVertex) -> bool {
        self.contains_vertex_by_uuid(&vertex.id())
    }

    pub fn contains_vertex_by_uuid(&self, id: &Identifier) -> bool {
        self.vertices.iter().any(|v| v.id() == *id)
    }

    fn index_of(&self, id: Identifier) -> Option<usize> {
        self.vertices.iter().position(|v| v.id() == id)
    }

    /// Connects `from` to `to`, rejecting the edge if it would create
    /// a cycle. Mutates `from`'s outgoing edges while bumping `to`'s
    /// atomic incoming count, which needs two simultaneous mutable
    /// borrows into the same `Vec` — resolved with `split_at_mut`
    /// rather than indexing twice.
    pub fn connect(&mut self, from: Identifier, to: Identifier) -> Result<bool, DagError> {
        let from_idx = self.index_of(from).ok_or(DagError::VertexNotFound(from))?;
        let to_idx = self.index_of(to).ok_or(DagError::VertexNotFound(to))?;

        if self.connection_would_make_cyclic(from, to) {
            return Err(DagError::WouldCreateCycle { from, to });
        }

        Ok(self.connect_unchecked(from_idx, to_idx))
    }

    pub fn connect_by_uuid(&mut self, from: &Identifier, to: &Identifier) -> Result<bool, DagError> {
        self.connect(*from, *to)
    }

    /// Connects every vertex labeled `from_label` to every vertex
    /// labeled `to_label`. Returns the number of edges actually added.
    pub fn connect_all_by_label(&mut self, from_label: &str, to_label: &str) -> Result<usize, DagError> {
        let froms: Vec<Identifier> = self.find_all_vertices_with_label(from_label).iter().map(|v| v.id()).collect();
        let tos: Vec<Identifier> = self.find_all_vertices_with_label(to_label).iter().map(|v| v.id()).collect();
        let mut added = 0;
        for from in &froms {
            for to in &tos {
                if self.connect(*from, *to)? {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    pub fn add_and_connect(&mut self, from: Identifier, vertex: DagVertex) -> Result<Identifier, DagError> {
        let to = vertex.id();
        self.add_vertex(vertex)?;
        self.connect(from, to)?;
        Ok(to)
    }

    pub fn are_connected(&self, from: Identifier, to: Identifier) -> bool {
        match (self.find_vertex(from), self.find_vertex(to)) {
            (Some(from_vertex), Some(to_vertex)) => from_vertex.contains_connection_to(to_vertex),
            _ => false,
        }
    }

    /// Performs the edge connect without running the cycle check.
    /// Used internally by `connection_would_make_cyclic`'s clone-and-
    /// force probe, and by `connect` itself once the check passes.
    fn connect_unchecked(&mut self, from_idx: usize, to_idx: usize) -> bool {
        debug_assert_ne!(from_idx, to_idx, "self-loops are rejected by the cycle check");
        let (lower, upper) = if from_idx < to_idx {
            (from_idx, to_idx)
        } else {
            (to_idx, from_idx)
        };
        let (left, right) = self.vertices.split_at_mut(upper);
        let (from_vertex, to_vertex) = if from_idx < to_idx {
            (&mut left[lower], &right[0])
        } else {
            (&mut right[0], &left[lower])
        };
        from_vertex.connect(to_vertex)
    }

    pub fn connection_would_make_cyclic(&self, from: Identifier, to: Identifier) -> bool {
        if from == to {
            return true;
        }
        let mut probe = self.clone();
        let (Some(from_idx), Some(to_idx)) = (probe.index_of(from), probe.index_of(to)) else {
            return false;
        };
        probe.connect_unchecked(from_idx, to_idx);
        let vertex_count = probe.vertex_count();
        let (order, _) = algorithms::destructive_topological_sort(probe);
        order.len() != vertex_count
    }

    /// Visits every vertex in insertion order, invoking `visitor` on
    /// each. A plain linear (non-topological) walk, useful for logging
    /// and inspection.
    pub fn linear_traversal(&self, mut visitor: impl FnMut(&DagVertex)) {
        for vertex in &self.vertices {
            visitor(vertex);
        }
    }

    pub fn remove_vertex(&mut self, vertex: &DagVertex) -> bool {
        self.remove_vertex_by_uuid(&vertex.id())
    }

    /// Removes the vertex with identifier `id`, disconnecting every
    /// outgoing edge it held first (marking each traversed, then
    /// severed, via `DagEdge::disconnect`) so target vertices'
    /// incoming counts stay accurate.
    pub fn remove_vertex_by_uuid(&mut self, id: &Identifier) -> bool {
        let Some(idx) = self.index_of(*id) else {
            return false;
        };

        let targets: Vec<Identifier> = self.vertices[idx]
            .outgoing_edges()
            .iter()
            .filter_map(DagEdge::target)
            .collect();

        for target_id in targets {
            let Some(target_idx) = self.index_of(target_id) else {
                continue;
            };
            let (lower, upper) = if idx < target_idx { (idx, target_idx) } else { (target_idx, idx) };
            let (left, right) = self.vertices.split_at_mut(upper);
            let (from_vertex, to_vertex) = if idx < target_idx {
                (&mut left[lower], &right[0])
            } else {
                (&mut right[0], &left[lower])
            };
            for edge in from_vertex.outgoing_mut() {
                if edge.target() == Some(target_id) {
                    edge.mark_traversed();
                    edge.disconnect(to_vertex);
                }
            }
        }

        self.vertices.remove(idx);
        true
    }

    pub fn remove_all_vertex_with_label(&mut self, label: &str) -> usize {
        let ids: Vec<Identifier> = self.find_all_vertices_with_label(label).iter().map(|v| v.id()).collect();
        let mut removed = 0;
        for id in ids {
            if self.remove_vertex_by_uuid(&id) {
                removed += 1;
            }
        }
        removed
    }

    /// Drops all vertices. Title and configuration are left untouched.
    pub fn reset(&mut self) {
        self.vertices.clear();
    }

    /// Replaces the task owned by `vertex_id` with one carrying
    /// `inputs` as its initial inputs. Fails if the vertex doesn't
    /// exist or doesn't own a task.
    pub fn override_initial_input_for_vertex_task(
        &mut self,
        vertex_id: Identifier,
        inputs: Document,
    ) -> Result<(), DagError> {
        let vertex = self
            .find_vertex_mut(vertex_id)
            .ok_or(DagError::VertexNotFound(vertex_id))?;
        let task = vertex
            .task_mut()
            .ok_or(DagError::VertexHasNoTask(vertex_id))?;
        task.set_initial_inputs(inputs);
        Ok(())
    }
}

impl Default for Dag {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Dag {
    /// Two passes: clone every vertex first (dropping edges and
    /// resetting incoming counts), then walk the *original* vertices'
    /// outgoing edges and reconnect the matching clones by identifier
    /// lookup. A vertex clone alone cannot recover this — it doesn't
    /// own the vertices its edges used to point to.
    fn clone(&self) -> Self {
        let mut cloned_vertices: Vec<DagVertex> = self.vertices.iter().map(DagVertex::clone_vertex).collect();

        for original in &self.vertices {
            for (_, target_id) in original.clone_all_connections() {
                let from_idx = cloned_vertices.iter().position(|v| v.id() == original.id());
                let to_idx = cloned_vertices.iter().position(|v| v.id() == target_id);
                if let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) {
                    let (lower, upper) = if from_idx < to_idx {
                        (from_idx, to_idx)
                    } else {
                        (to_idx, from_idx)
                    };
                    let (left, right) = cloned_vertices.split_at_mut(upper);
                    let (from_vertex, to_vertex) = if from_idx < to_idx {
                        (&mut left[lower], &right[0])
                    } else {
                        (&mut right[0], &left[lower])
                    };
                    from_vertex.connect(to_vertex);
                }
            }
        }

        Self {
            title: self.title.clone(),
            vertices: cloned_vertices,
            config: self.config.clone(),
        }
    }
}

/// The set of vertex identifiers a vertex's outgoing edges currently
/// point at. Used by `Dag`'s equality instead of comparing
/// `DagEdge`s directly — `DagEdge::eq` compares edge *identity*
/// (id + status), which a freshly cloned `Dag` never shares with its
/// source (`Dag::clone` rebuilds every edge via `DagVertex::connect`,
/// minting a new `DagEdge::new()` each time). Two DAGs are equal when
/// their vertices point at the same *targets*, not when they hold the
/// same edge objects.
fn edge_targets(vertex: &DagVertex) -> std::collections::BTreeSet<Identifier> {
    vertex.outgoing_edges().iter().filter_map(DagEdge::target).collect()
}

impl PartialEq for Dag {
    fn eq(&self, other: &Self) -> bool {
        if self.vertex_count() != other.vertex_count() || self.edge_count() != other.edge_count() {
            return false;
        }
        if self.config != other.config {
            return false;
        }
        let mut ours: Vec<&DagVertex> = self.vertices.iter().collect();
        let mut theirs: Vec<&DagVertex> = other.vertices.iter().collect();
        ours.sort_by(|a, b| a.label().cmp(b.label()));
        theirs.sort_by(|a, b| a.label().cmp(b.label()));
        ours.iter()
            .zip(theirs.iter())
            .all(|(a, b)| a.id() == b.id() && a.label() == b.label() && edge_targets(a) == edge_targets(b))
    }
}

impl std::fmt::Display for Dag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Dag(title=\"{}\", vertices={}, edges={})",
            self.title,
            self.vertex_count(),
            self.edge_count()
        )?;
        for vertex in &self.vertices {
            writeln!(f, "  {vertex}")?;
        }
        Ok(())
    }
}
