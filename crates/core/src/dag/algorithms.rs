//! Kahn's-algorithm-style traversal, used both to detect cycles and to
//! carve a DAG into dependency-ordered batches.

use crate::error::DagError;
use crate::id::Identifier;

use super::Dag;

/// Vertices with no incoming edges, in insertion order.
pub fn roots(dag: &Dag) -> Vec<Identifier> {
    dag.vertices()
        .iter()
        .filter(|v| v.incoming_count() == 0)
        .map(|v| v.id())
        .collect()
}

/// Consumes `dag` by value, repeatedly peeling off zero-incoming
/// vertices and disconnecting their outgoing edges. The returned order
/// covers every vertex iff the graph was acyclic; a strict subset
/// means whatever remains forms a cycle.
pub fn destructive_topological_sort(mut dag: Dag) -> (Vec<Identifier>, bool) {
    let total = dag.vertex_count();
    let mut order = Vec::with_capacity(total);

    loop {
        let batch = roots(&dag);
        if batch.is_empty() {
            break;
        }
        for id in batch {
            dag.remove_vertex_by_uuid(&id);
            order.push(id);
        }
    }

    let is_acyclic = order.len() == total;
    (order, is_acyclic)
}

/// Layers a DAG into dependency-ordered batches, queuing each
/// vertex's task (if any) onto `scheduler` as its layer is peeled off.
///
/// Operates on clones throughout; the caller's original `dag` is left
/// untouched.
pub fn process_dag<S>(dag: &Dag, scheduler: &S) -> Result<Vec<Vec<Identifier>>, DagError>
where
    S: TaskSink,
{
    let probe = dag.clone();
    let vertex_count = probe.vertex_count();
    let (_, is_acyclic) = destructive_topological_sort(probe);
    if !is_acyclic {
        return Err(DagError::Cyclic);
    }
    debug_assert!(vertex_count == dag.vertex_count());

    let mut remaining = dag.clone();
    let mut batches = Vec::new();

    loop {
        let batch = roots(&remaining);
        if batch.is_empty() {
            break;
        }
        for id in &batch {
            if let Some(vertex) = dag.find_vertex(*id) {
                if let Some(task) = vertex.task() {
                    scheduler.queue_task(task.clone_task());
                }
            }
            remaining.remove_vertex_by_uuid(id);
        }
        batches.push(batch);
    }

    Ok(batches)
}

/// The subset of `dagflow-runtime::Scheduler`'s API this algorithm
/// needs, kept as a trait so `dagflow-core` doesn't depend on the
/// runtime crate.
pub trait TaskSink {
    fn queue_task(&self, task: crate::task::Task);
}
