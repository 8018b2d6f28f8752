use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Ruleset definition parsed from a ruleset YAML file. Lists keep the
/// declaration order, which is also the schema order used for sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesetDefinition {
    #[serde(default)]
    pub fields: Vec<FieldTypeDefinition>,
    #[serde(default)]
    pub groups: Vec<GroupTypeDefinition>,
    #[serde(default)]
    pub elements: Vec<ElementTypeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTypeDefinition {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub person: bool,
    #[serde(default)]
    pub identifier: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTypeDefinition {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementTypeDefinition {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub fields: Vec<TypeReference>,
    #[serde(default)]
    pub groups: Vec<TypeReference>,
    #[serde(default)]
    pub topmost: bool,
    #[serde(default = "default_true")]
    pub file_set: bool,
}

/// Reference from an element type to a field or group type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    /// Cardinality code (`1m`, `1o`, `+`, `*`)
    #[serde(default)]
    pub num: Option<String>,
    #[serde(default)]
    pub default_display: bool,
    #[serde(default)]
    pub invisible: bool,
}

fn default_true() -> bool {
    true
}

/// Parse a ruleset YAML file into a RulesetDefinition
pub fn parse_ruleset(path: &Path) -> Result<RulesetDefinition> {
    let content = std::fs::read_to_string(path)?;
    parse_ruleset_str(&content)
}

/// Parse a ruleset YAML string into a RulesetDefinition
pub fn parse_ruleset_str(content: &str) -> Result<RulesetDefinition> {
    let ruleset: RulesetDefinition = serde_yaml::from_str(content)?;
    Ok(ruleset)
}
