use crate::id::Identifier;

#[derive(Debug, thiserror::Error)]
pub enum DagError {
    #[error("vertex not found: {0}")]
    VertexNotFound(Identifier),

    #[error("a vertex with identifier {0} already exists")]
    DuplicateVertex(Identifier),

    #[error("connecting {from} to {to} would create a cycle")]
    WouldCreateCycle { from: Identifier, to: Identifier },

    #[error("vertex {0} does not own a task")]
    VertexHasNoTask(Identifier),

    #[error("dag contains a cycle")]
    Cyclic,
}
