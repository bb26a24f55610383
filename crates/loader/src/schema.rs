//! The sample-schema text ladder embedded in every parse error.
//!
//! Each level's sample is the previous level's sample nested one indent
//! deeper, so an error raised deep in the document (say, a malformed
//! stage) still shows the caller the whole shape from `Stage` up
//! through `DAG`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaLevel {
    Empty,
    Dag,
    Vertices,
    Vertex,
    Task,
    Stages,
    Stage,
    Connections,
}

const STAGE: &str = "            - Name: <optional string>\n              LibraryName: <string>\n              SymbolName: <string>\n          ...\n    ...\n";

const STAGES: &str = "        Stages:\n          ...\n";

const TASK: &str = "      Task:\n        Name: <optional string>\n        InitialInputs: <optional YAML>\n          <valid YAML>\n        Configuration: <optional YAML>\n          <valid YAML>\n        Callback: <optional>\n            LibraryName: <string>\n            SymbolName: <string>\n            Type: <enum {Plugin, Function}>\n        ...\n";

const VERTEX: &str = "    - Vertex:\n      Name: <optional string>\n      UUID: <valid uuid4 string>\n        ...\n";

const VERTICES: &str = "  Vertices:\n    ...\n";

const DAG: &str = "DAG:\n  Title: <optional string>\n  Configuration: <optional YAML>\n    <valid YAML>\n  ...\n";

const CONNECTIONS: &str = "  Connections:\n    - Connection:\n      From: <valid uuid4 string from vertex>\n      To: <valid uuid4 string from vertex>\n    ...\n";

impl SchemaLevel {
    /// The nested sample text for this level.
    pub fn sample(self) -> String {
        match self {
            SchemaLevel::Stage => STAGE.to_string(),
            SchemaLevel::Stages => STAGES.to_string(),
            SchemaLevel::Task => TASK.to_string(),
            SchemaLevel::Vertex => VERTEX.to_string(),
            SchemaLevel::Vertices => VERTICES.to_string(),
            SchemaLevel::Dag | SchemaLevel::Empty => DAG.to_string(),
            SchemaLevel::Connections => CONNECTIONS.to_string(),
        }
    }

    /// The full sample, from a bare stage entry down through
    /// connections — shown on `--help` and in the top-level schema
    /// error.
    pub fn full_sample() -> String {
        format!("{DAG}{VERTICES}{VERTEX}{TASK}{STAGES}{STAGE}{CONNECTIONS}")
    }
}

impl fmt::Display for SchemaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sample_contains_every_level() {
        let sample = SchemaLevel::full_sample();
        assert!(sample.contains("DAG:"));
        assert!(sample.contains("Vertices:"));
        assert!(sample.contains("Connection:"));
    }
}
