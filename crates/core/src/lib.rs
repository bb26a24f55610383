//! Identifier/document primitives, the stage/task execution model, and
//! the DAG data structure and algorithms that sit underneath
//! `dagflow-runtime`'s scheduler.

pub mod dag;
pub mod document;
pub mod error;
pub mod id;
pub mod stage;
pub mod task;

pub use dag::{Dag, DagEdge, DagVertex, EdgeStatus, VertexStatus};
pub use document::{Document, DocumentError};
pub use error::DagError;
pub use id::{Identifier, IdentifierError};
pub use stage::{stage_eq, FnStage, TaskStage};
pub use task::{Callback, Task, TaskCallbackPlugin};
