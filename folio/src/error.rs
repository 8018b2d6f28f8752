use crate::document::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Ruleset error: {0}")]
    Schema(String),

    #[error("Element type '{child}' is not allowed as a child of '{parent}'")]
    TypeNotAllowedAsChild { parent: String, child: String },

    #[error("Field type '{field}' is not allowed for element type '{element}'")]
    FieldTypeNotAllowed { field: String, element: String },

    #[error("Field group type '{group}' is not allowed for element type '{element}'")]
    GroupTypeNotAllowed { group: String, element: String },

    #[error("Element {node} has no type")]
    NodeHasNoType { node: String },

    #[error("Unknown {kind} type '{name}'")]
    UnknownType { kind: &'static str, name: String },

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Node {node} cannot become a descendant of itself")]
    CyclicStructure { node: NodeId },

    #[error("Incomplete person: {0}")]
    IncompletePerson(String),

    #[error("Aggregation configuration error: {0}")]
    AggregationConfig(String),

    #[error("Asset '{location}' is not referenced by element '{element}'")]
    DanglingAssetReference { location: String, element: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FolioError {
    /// Whether this error belongs to the schema-violation family (a type the
    /// node's element type does not permit).
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            FolioError::TypeNotAllowedAsChild { .. }
                | FolioError::FieldTypeNotAllowed { .. }
                | FolioError::GroupTypeNotAllowed { .. }
        )
    }

    /// Whether this error reports a missing type, either on a node or in the ruleset.
    pub fn is_missing_type(&self) -> bool {
        matches!(
            self,
            FolioError::NodeHasNoType { .. } | FolioError::UnknownType { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
