pub mod schema;
pub mod field;
pub mod asset;
pub mod document;
pub mod copy;
pub mod equality;
pub mod validation;
pub mod snapshot;
pub mod error;

pub use asset::{Asset, AssetId, AssetLocator};
pub use copy::ChildCopy;
pub use document::{Document, Edge, ElementNode, NodeId};
pub use error::{FolioError, Result};
pub use field::{Authority, Field, FieldGroup, PersonName};
pub use schema::{Cardinality, ElementType, Registry};
pub use snapshot::DocumentSnapshot;
pub use validation::{validate_document, validate_node, ValidationResult};
