pub mod parser;
pub mod registry;
pub mod types;

pub use parser::{
    parse_ruleset, parse_ruleset_str, ElementTypeDefinition, FieldTypeDefinition,
    GroupTypeDefinition, RulesetDefinition, TypeReference,
};
pub use registry::{LocalFieldType, LocalGroupType, Registry, BUILTIN_HIDDEN_FIELDS};
pub use types::{
    is_hidden, Cardinality, ElementType, FieldRule, FieldType, GroupType, TypeSlot,
    HIDDEN_PREFIX,
};
