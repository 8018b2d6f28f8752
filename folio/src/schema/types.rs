use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix marking internal bookkeeping field types. Such fields bypass
/// schema checks and may occur any number of times.
pub const HIDDEN_PREFIX: &str = "_";

/// Whether a field or group type name is reserved for internal use.
pub fn is_hidden(type_name: &str) -> bool {
    type_name.starts_with(HIDDEN_PREFIX)
}

/// How many instances of a field or group type an element may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// `1m`: exactly one, mandatory
    #[serde(rename = "1m")]
    ExactlyOne,
    /// `1o`: at most one, optional
    #[serde(rename = "1o")]
    AtMostOne,
    /// `+`: one or more
    #[serde(rename = "+")]
    OneOrMore,
    /// `*`: zero or more
    #[serde(rename = "*")]
    Any,
}

impl Cardinality {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "1m" => Some(Cardinality::ExactlyOne),
            "1o" => Some(Cardinality::AtMostOne),
            "+" => Some(Cardinality::OneOrMore),
            "*" => Some(Cardinality::Any),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Cardinality::ExactlyOne => "1m",
            Cardinality::AtMostOne => "1o",
            Cardinality::OneOrMore => "+",
            Cardinality::Any => "*",
        }
    }

    /// Whether at most one instance may be attached.
    pub fn is_capped(&self) -> bool {
        matches!(self, Cardinality::ExactlyOne | Cardinality::AtMostOne)
    }

    /// Whether at least one instance must remain attached.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Cardinality::ExactlyOne | Cardinality::OneOrMore)
    }

    /// Whether one more instance fits next to `existing` ones.
    pub fn admits(&self, existing: usize) -> bool {
        !self.is_capped() || existing < 1
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Global descriptor of a field type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldType {
    pub name: String,
    /// Display names keyed by language code
    pub labels: BTreeMap<String, String>,
    pub is_person: bool,
    /// Marks fields usable as natural keys
    pub is_identifier: bool,
}

impl FieldType {
    pub fn new(name: impl Into<String>) -> Self {
        FieldType {
            name: name.into(),
            labels: BTreeMap::new(),
            is_person: false,
            is_identifier: false,
        }
    }

    pub fn label(&self, lang: &str) -> Option<&str> {
        self.labels.get(lang).map(String::as_str)
    }

    pub fn is_hidden(&self) -> bool {
        is_hidden(&self.name)
    }
}

/// Global descriptor of a field group type: an ordered bundle of member field types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupType {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub members: Vec<String>,
}

impl GroupType {
    pub fn label(&self, lang: &str) -> Option<&str> {
        self.labels.get(lang).map(String::as_str)
    }

    pub fn has_member(&self, field_type: &str) -> bool {
        self.members.iter().any(|m| m == field_type)
    }
}

/// Per-element-type annotation of a field or group type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldRule {
    pub cardinality: Cardinality,
    /// Shown in forms even when no value exists
    pub default_display: bool,
    pub invisible: bool,
}

/// A field or group type name together with the rule an element type applies to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSlot {
    pub type_name: String,
    pub rule: FieldRule,
}

/// Schema descriptor of an element node's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementType {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Set only for virtual aggregation levels stored in their own record
    pub anchor_class: Option<String>,
    pub allowed_children: Vec<String>,
    /// Field types in declaration order
    pub fields: Vec<TypeSlot>,
    /// Group types in declaration order
    pub groups: Vec<TypeSlot>,
    pub topmost: bool,
    pub has_file_set: bool,
}

impl ElementType {
    pub fn label(&self, lang: &str) -> Option<&str> {
        self.labels.get(lang).map(String::as_str)
    }

    pub fn allows_child(&self, type_name: &str) -> bool {
        self.allowed_children.iter().any(|c| c == type_name)
    }

    /// The local annotation of a field type, if this element type declares it.
    pub fn field_rule(&self, field_type: &str) -> Option<&FieldRule> {
        self.fields
            .iter()
            .find(|slot| slot.type_name == field_type)
            .map(|slot| &slot.rule)
    }

    pub fn group_rule(&self, group_type: &str) -> Option<&FieldRule> {
        self.groups
            .iter()
            .find(|slot| slot.type_name == group_type)
            .map(|slot| &slot.rule)
    }

    /// Position of a field type in the declaration order.
    pub fn field_position(&self, field_type: &str) -> Option<usize> {
        self.fields.iter().position(|slot| slot.type_name == field_type)
    }

    pub fn default_display_fields(&self) -> impl Iterator<Item = &TypeSlot> {
        self.fields.iter().filter(|slot| slot.rule.default_display)
    }

    pub fn default_display_groups(&self) -> impl Iterator<Item = &TypeSlot> {
        self.groups.iter().filter(|slot| slot.rule.default_display)
    }
}
