use crate::schema::{GroupType, Registry};
use serde::{Deserialize, Serialize};

/// Link of a value to an entry in an external authority file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Authority {
    pub fn new(
        id: impl Into<String>,
        uri: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Authority {
            id: Some(id.into()),
            uri: Some(uri.into()),
            value: Some(value.into()),
        }
    }

    /// Only complete records survive a copy.
    pub fn is_complete(&self) -> bool {
        self.id.is_some() && self.uri.is_some() && self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueQualifier {
    pub value: String,
    pub kind: String,
}

/// Structured name carried by person fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_type: Option<String>,
    #[serde(default)]
    pub is_corporation: bool,
}

impl PersonName {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        PersonName {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            ..PersonName::default()
        }
    }

    pub fn corporation(institution: impl Into<String>) -> Self {
        PersonName {
            institution: Some(institution.into()),
            is_corporation: true,
            ..PersonName::default()
        }
    }

    /// Whether any of first name, last name or institution is filled in.
    pub fn has_identity(&self) -> bool {
        [&self.first_name, &self.last_name, &self.institution]
            .iter()
            .any(|part| part.as_deref().is_some_and(|s| !s.is_empty()))
    }

    /// `Last, First` for natural persons, the institution for corporations.
    pub fn formatted(&self) -> String {
        if let Some(display) = &self.display_name {
            return display.clone();
        }
        if self.is_corporation {
            return self.institution.clone().unwrap_or_default();
        }
        match (&self.last_name, &self.first_name) {
            (Some(last), Some(first)) => format!("{last}, {first}"),
            (Some(last), None) => last.clone(),
            (None, Some(first)) => first.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    Simple {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qualifier: Option<ValueQualifier>,
    },
    Person(PersonName),
}

/// A typed descriptive value attached to an element node or a field group.
///
/// Equality is value equality: simple fields compare type, value and
/// qualifier; person fields compare type, every name part and the
/// authority record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub type_name: String,
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<Authority>,
}

impl Field {
    pub fn simple(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Field {
            type_name: type_name.into(),
            value: FieldValue::Simple {
                value: Some(value.into()),
                qualifier: None,
            },
            authority: None,
        }
    }

    /// A simple field with no value yet.
    pub fn empty(type_name: impl Into<String>) -> Self {
        Field {
            type_name: type_name.into(),
            value: FieldValue::Simple {
                value: None,
                qualifier: None,
            },
            authority: None,
        }
    }

    pub fn person(type_name: impl Into<String>, name: PersonName) -> Self {
        Field {
            type_name: type_name.into(),
            value: FieldValue::Person(name),
            authority: None,
        }
    }

    pub fn with_qualifier(mut self, value: impl Into<String>, kind: impl Into<String>) -> Self {
        if let FieldValue::Simple { qualifier, .. } = &mut self.value {
            *qualifier = Some(ValueQualifier {
                value: value.into(),
                kind: kind.into(),
            });
        }
        self
    }

    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn is_person(&self) -> bool {
        matches!(self.value, FieldValue::Person(_))
    }

    /// The plain value of a simple field.
    pub fn value(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Simple { value, .. } => value.as_deref(),
            FieldValue::Person(_) => None,
        }
    }

    pub fn set_value(&mut self, new_value: impl Into<String>) {
        match &mut self.value {
            FieldValue::Simple { value, .. } => *value = Some(new_value.into()),
            FieldValue::Person(name) => name.display_name = Some(new_value.into()),
        }
    }

    pub fn qualifier(&self) -> Option<&ValueQualifier> {
        match &self.value {
            FieldValue::Simple { qualifier, .. } => qualifier.as_ref(),
            FieldValue::Person(_) => None,
        }
    }

    pub fn person_name(&self) -> Option<&PersonName> {
        match &self.value {
            FieldValue::Person(name) => Some(name),
            FieldValue::Simple { .. } => None,
        }
    }

    /// Whether the field carries content worth keeping.
    pub fn has_value(&self) -> bool {
        match &self.value {
            FieldValue::Simple { value, .. } => value.as_deref().is_some_and(|v| !v.is_empty()),
            FieldValue::Person(name) => name.has_identity(),
        }
    }

    /// Copy of this field for attaching elsewhere. Incomplete authority
    /// records are not carried over.
    pub fn duplicate(&self) -> Field {
        Field {
            type_name: self.type_name.clone(),
            value: self.value.clone(),
            authority: self.authority.clone().filter(Authority::is_complete),
        }
    }

    /// Copy carrying only the value, without qualifier or authority.
    pub fn value_only(&self) -> Field {
        match &self.value {
            FieldValue::Simple { value, .. } => Field {
                type_name: self.type_name.clone(),
                value: FieldValue::Simple {
                    value: value.clone(),
                    qualifier: None,
                },
                authority: None,
            },
            FieldValue::Person(_) => self.duplicate(),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        if self.type_name != other.type_name {
            return false;
        }
        match (&self.value, &other.value) {
            (
                FieldValue::Simple { value: a, qualifier: qa },
                FieldValue::Simple { value: b, qualifier: qb },
            ) => a == b && qa == qb,
            (FieldValue::Person(a), FieldValue::Person(b)) => {
                a == b && self.authority == other.authority
            }
            _ => false,
        }
    }
}

impl Eq for Field {}

/// An ordered bundle of fields and persons sharing one group type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub type_name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub persons: Vec<Field>,
}

impl FieldGroup {
    pub fn new(type_name: impl Into<String>) -> Self {
        FieldGroup {
            type_name: type_name.into(),
            fields: Vec::new(),
            persons: Vec::new(),
        }
    }

    /// A group with one empty member per member type of `group_type`.
    pub fn for_type(group_type: &GroupType, registry: &Registry) -> Self {
        let mut group = FieldGroup::new(group_type.name.clone());
        for member in &group_type.members {
            let is_person = registry
                .field_type_by_name(member)
                .map(|t| t.is_person)
                .unwrap_or(false);
            if is_person {
                group.persons.push(Field::person(member.clone(), PersonName::default()));
            } else {
                group.fields.push(Field::empty(member.clone()));
            }
        }
        group
    }

    pub fn add(&mut self, field: Field) {
        if field.is_person() {
            self.persons.push(field);
        } else {
            self.fields.push(field);
        }
    }

    /// Member fields and persons of one type.
    pub fn members_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Field> {
        self.fields
            .iter()
            .chain(self.persons.iter())
            .filter(move |f| f.type_name == type_name)
    }

    pub fn has_any_value(&self) -> bool {
        self.fields.iter().chain(self.persons.iter()).any(Field::has_value)
    }

    pub fn duplicate(&self) -> FieldGroup {
        FieldGroup {
            type_name: self.type_name.clone(),
            fields: self.fields.iter().map(Field::duplicate).collect(),
            persons: self.persons.iter().map(Field::duplicate).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_ruleset_str;

    #[test]
    fn test_simple_field_equality_ignores_authority() {
        let a = Field::simple("TitleDocMain", "Faust");
        let b = Field::simple("TitleDocMain", "Faust").with_authority(Authority::new(
            "1",
            "http://d-nb.info/gnd/",
            "Faust",
        ));
        assert_eq!(a, b);
        assert_ne!(a, Field::simple("TitleDocMain", "Faust II"));
        assert_ne!(a, Field::simple("TitleDocMainShort", "Faust"));
        assert_ne!(a, a.clone().with_qualifier("de", "lang"));
    }

    #[test]
    fn test_person_equality_includes_authority() {
        let a = Field::person("Author", PersonName::new("Johann", "Goethe"));
        let b = a.clone().with_authority(Authority::new("118540238", "gnd", "Goethe"));
        assert_ne!(a, b);
        assert_eq!(b, b.clone());
        assert_ne!(a, Field::simple("Author", "Goethe"));
    }

    #[test]
    fn test_duplicate_drops_incomplete_authority() {
        let partial = Authority {
            id: Some("1".into()),
            uri: None,
            value: Some("x".into()),
        };
        let field = Field::simple("Subject", "x").with_authority(partial);
        assert!(field.duplicate().authority.is_none());

        let field = Field::simple("Subject", "x").with_authority(Authority::new("1", "u", "x"));
        assert!(field.duplicate().authority.is_some());
    }

    #[test]
    fn test_has_value() {
        assert!(!Field::empty("a").has_value());
        assert!(!Field::simple("a", "").has_value());
        assert!(Field::simple("a", "b").has_value());
        assert!(!Field::person("Author", PersonName::default()).has_value());
        assert!(Field::person("Author", PersonName::corporation("Acme")).has_value());
    }

    #[test]
    fn test_person_formatting() {
        assert_eq!(PersonName::new("Johann", "Goethe").formatted(), "Goethe, Johann");
        assert_eq!(PersonName::corporation("Acme").formatted(), "Acme");
    }

    #[test]
    fn test_group_for_type_creates_empty_members() {
        let def = parse_ruleset_str(
            "fields:\n  - { name: Topic }\n  - { name: Author, person: true }\ngroups:\n  - { name: Subject, members: [Topic, Author] }\n",
        )
        .unwrap();
        let registry = Registry::from_definition(&def).unwrap();
        let group_type = registry.group_type_by_name("Subject").unwrap();

        let group = FieldGroup::for_type(group_type, &registry);
        assert_eq!(group.fields.len(), 1);
        assert_eq!(group.persons.len(), 1);
        assert!(!group.has_any_value());
        assert_eq!(group.members_of_type("Topic").count(), 1);
    }
}
