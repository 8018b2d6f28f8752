use super::parser::{parse_ruleset, RulesetDefinition, TypeReference};
use super::types::{
    is_hidden, Cardinality, ElementType, FieldRule, FieldType, GroupType, TypeSlot,
    HIDDEN_PREFIX,
};
use crate::error::{FolioError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Internal bookkeeping field types that exist in every registry.
pub const BUILTIN_HIDDEN_FIELDS: [&str; 4] =
    ["pagephysstart", "overlapping", "pagephysend", "PaginationNo"];

/// The loaded collection of all element, field and group type descriptors.
/// Immutable after construction; share it as `Arc<Registry>`.
#[derive(Debug, Clone)]
pub struct Registry {
    element_types: Vec<ElementType>,
    element_index: HashMap<String, usize>,
    field_types: Vec<FieldType>,
    field_index: HashMap<String, usize>,
    group_types: Vec<GroupType>,
    group_index: HashMap<String, usize>,
}

/// A field type as seen through one element type: the global descriptor plus
/// the element type's cardinality annotation for it.
#[derive(Debug, Clone, Copy)]
pub struct LocalFieldType<'a> {
    pub field_type: &'a FieldType,
    pub rule: FieldRule,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalGroupType<'a> {
    pub group_type: &'a GroupType,
    pub rule: FieldRule,
}

impl Registry {
    /// Load and build a registry from a ruleset YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let definition = parse_ruleset(path)?;
        Registry::from_definition(&definition)
    }

    /// Build a registry from a parsed ruleset. Every field, group and child
    /// type referenced by an element type must resolve.
    pub fn from_definition(definition: &RulesetDefinition) -> Result<Self> {
        let mut registry = Registry {
            element_types: Vec::new(),
            element_index: HashMap::new(),
            field_types: Vec::new(),
            field_index: HashMap::new(),
            group_types: Vec::new(),
            group_index: HashMap::new(),
        };

        for def in &definition.fields {
            if registry.field_index.contains_key(&def.name) {
                return Err(FolioError::Schema(format!(
                    "Field type '{}' is defined twice",
                    def.name
                )));
            }
            registry.push_field_type(FieldType {
                name: def.name.clone(),
                labels: def.labels.clone(),
                is_person: def.person,
                is_identifier: def.identifier,
            });
        }

        for name in BUILTIN_HIDDEN_FIELDS {
            let name = format!("{HIDDEN_PREFIX}{name}");
            if !registry.field_index.contains_key(&name) {
                registry.push_field_type(FieldType::new(name));
            }
        }

        for def in &definition.groups {
            if registry.group_index.contains_key(&def.name) {
                return Err(FolioError::Schema(format!(
                    "Field group type '{}' is defined twice",
                    def.name
                )));
            }
            for member in &def.members {
                if !registry.field_index.contains_key(member) {
                    log::error!(
                        "Field group type '{}' references unknown field type '{}'",
                        def.name,
                        member
                    );
                    return Err(FolioError::UnknownType {
                        kind: "field",
                        name: member.clone(),
                    });
                }
            }
            registry.group_index.insert(def.name.clone(), registry.group_types.len());
            registry.group_types.push(GroupType {
                name: def.name.clone(),
                labels: def.labels.clone(),
                members: def.members.clone(),
            });
        }

        for def in &definition.elements {
            if registry.element_index.contains_key(&def.name) {
                return Err(FolioError::Schema(format!(
                    "Element type '{}' is defined twice",
                    def.name
                )));
            }

            let mut fields = Vec::new();
            for reference in &def.fields {
                if !registry.field_index.contains_key(&reference.name) {
                    log::error!(
                        "Element type '{}' references unknown field type '{}'",
                        def.name,
                        reference.name
                    );
                    return Err(FolioError::UnknownType {
                        kind: "field",
                        name: reference.name.clone(),
                    });
                }
                fields.push(resolve_slot(&def.name, reference)?);
            }

            let mut groups = Vec::new();
            for reference in &def.groups {
                if !registry.group_index.contains_key(&reference.name) {
                    log::error!(
                        "Element type '{}' references unknown field group type '{}'",
                        def.name,
                        reference.name
                    );
                    return Err(FolioError::UnknownType {
                        kind: "field group",
                        name: reference.name.clone(),
                    });
                }
                groups.push(resolve_slot(&def.name, reference)?);
            }

            registry.element_index.insert(def.name.clone(), registry.element_types.len());
            registry.element_types.push(ElementType {
                name: def.name.clone(),
                labels: def.labels.clone(),
                anchor_class: def.anchor.clone().filter(|a| !a.is_empty()),
                allowed_children: def.children.clone(),
                fields,
                groups,
                topmost: def.topmost,
                has_file_set: def.file_set,
            });
        }

        // Child types may be declared after their parents, so resolve them last.
        for element in &registry.element_types {
            for child in &element.allowed_children {
                if !registry.element_index.contains_key(child) {
                    log::error!(
                        "Element type '{}' allows unknown child type '{}'",
                        element.name,
                        child
                    );
                    return Err(FolioError::UnknownType {
                        kind: "element",
                        name: child.clone(),
                    });
                }
            }
        }

        Ok(registry)
    }

    fn push_field_type(&mut self, field_type: FieldType) {
        self.field_index.insert(field_type.name.clone(), self.field_types.len());
        self.field_types.push(field_type);
    }

    pub fn type_by_name(&self, name: &str) -> Option<&ElementType> {
        self.element_index.get(name).map(|&i| &self.element_types[i])
    }

    pub fn field_type_by_name(&self, name: &str) -> Option<&FieldType> {
        self.field_index.get(name).map(|&i| &self.field_types[i])
    }

    pub fn group_type_by_name(&self, name: &str) -> Option<&GroupType> {
        self.group_index.get(name).map(|&i| &self.group_types[i])
    }

    /// Element types in declaration order.
    pub fn element_types(&self) -> &[ElementType] {
        &self.element_types
    }

    pub fn field_types(&self) -> &[FieldType] {
        &self.field_types
    }

    pub fn group_types(&self) -> &[GroupType] {
        &self.group_types
    }

    /// Element types that represent a virtual aggregation level.
    pub fn anchor_element_types(&self) -> Vec<&ElementType> {
        self.element_types
            .iter()
            .filter(|t| t.anchor_class.is_some())
            .collect()
    }

    pub fn person_field_types(&self) -> Vec<&FieldType> {
        self.field_types.iter().filter(|t| t.is_person).collect()
    }

    /// Reverse lookup of a non-hidden field type by its translated label.
    pub fn field_type_by_label(&self, label: &str, lang: &str) -> Option<&FieldType> {
        self.field_types
            .iter()
            .filter(|t| !t.is_hidden())
            .find(|t| t.label(lang) == Some(label))
    }

    /// The field type `field_name` as annotated by `element_name`, if the
    /// element type declares it.
    pub fn local_field_type(
        &self,
        element_name: &str,
        field_name: &str,
    ) -> Option<LocalFieldType<'_>> {
        let element = self.type_by_name(element_name)?;
        let rule = element.field_rule(field_name)?;
        let field_type = self.field_type_by_name(field_name)?;
        Some(LocalFieldType {
            field_type,
            rule: *rule,
        })
    }

    pub fn local_group_type(
        &self,
        element_name: &str,
        group_name: &str,
    ) -> Option<LocalGroupType<'_>> {
        let element = self.type_by_name(element_name)?;
        let rule = element.group_rule(group_name)?;
        let group_type = self.group_type_by_name(group_name)?;
        Some(LocalGroupType {
            group_type,
            rule: *rule,
        })
    }

    /// Whether a field type is usable as a natural key.
    pub fn is_identifier(&self, field_name: &str) -> bool {
        self.field_type_by_name(field_name)
            .map(|t| t.is_identifier)
            .unwrap_or(false)
    }

    pub fn is_hidden_field(&self, field_name: &str) -> bool {
        is_hidden(field_name)
    }
}

fn resolve_slot(element: &str, reference: &TypeReference) -> Result<TypeSlot> {
    let cardinality = match &reference.num {
        None => {
            log::warn!(
                "No cardinality given for '{}' on element type '{}', assuming 1o",
                reference.name,
                element
            );
            Cardinality::AtMostOne
        }
        Some(code) => Cardinality::parse(code).ok_or_else(|| {
            FolioError::Schema(format!(
                "Invalid cardinality '{code}' for '{}' on element type '{element}'",
                reference.name
            ))
        })?,
    };

    Ok(TypeSlot {
        type_name: reference.name.clone(),
        rule: FieldRule {
            cardinality,
            default_display: reference.default_display,
            invisible: reference.invisible,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_ruleset_str;

    fn test_registry() -> Registry {
        let def = parse_ruleset_str(
            r#"
fields:
  - { name: TitleDocMain, labels: { en: Main title, de: Haupttitel } }
  - { name: CatalogIDDigital, identifier: true }
  - { name: Author, person: true }
groups:
  - { name: Subject, members: [TitleDocMain, Author] }
elements:
  - name: Periodical
    anchor: periodical
    children: [PeriodicalVolume]
    fields:
      - { name: TitleDocMain, num: 1m }
      - { name: CatalogIDDigital, num: 1o }
  - name: PeriodicalVolume
    anchor: volume
    fields:
      - { name: TitleDocMain, num: "*" }
      - { name: Author }
    groups:
      - { name: Subject, num: "+" }
"#,
        )
        .unwrap();
        Registry::from_definition(&def).unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = test_registry();
        let periodical = registry.type_by_name("Periodical").unwrap();
        assert_eq!(periodical.anchor_class.as_deref(), Some("periodical"));
        assert!(periodical.allows_child("PeriodicalVolume"));
        assert!(registry.field_type_by_name("Author").unwrap().is_person);
        assert_eq!(registry.group_type_by_name("Subject").unwrap().members.len(), 2);
        assert!(registry.type_by_name("Monograph").is_none());
    }

    #[test]
    fn test_hidden_types_always_present() {
        let registry = Registry::from_definition(&RulesetDefinition::default()).unwrap();
        for name in ["_pagephysstart", "_overlapping", "_pagephysend", "_PaginationNo"] {
            assert!(registry.field_type_by_name(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn test_local_field_type_annotations() {
        let registry = test_registry();
        let local = registry.local_field_type("Periodical", "TitleDocMain").unwrap();
        assert_eq!(local.rule.cardinality, Cardinality::ExactlyOne);
        let local = registry.local_field_type("PeriodicalVolume", "TitleDocMain").unwrap();
        assert_eq!(local.rule.cardinality, Cardinality::Any);
        // Missing num defaults to at most one
        let local = registry.local_field_type("PeriodicalVolume", "Author").unwrap();
        assert_eq!(local.rule.cardinality, Cardinality::AtMostOne);
        assert!(registry.local_field_type("Periodical", "Author").is_none());
        assert!(registry.local_group_type("PeriodicalVolume", "Subject").is_some());
    }

    #[test]
    fn test_unknown_field_reference_is_hard_error() {
        let def = parse_ruleset_str(
            "elements:\n  - name: page\n    fields:\n      - { name: pageNumber, num: 1m }\n",
        )
        .unwrap();
        let err = Registry::from_definition(&def).unwrap_err();
        assert!(matches!(err, FolioError::UnknownType { kind: "field", .. }));
    }

    #[test]
    fn test_unknown_child_reference_is_hard_error() {
        let def = parse_ruleset_str("elements:\n  - name: book\n    children: [page]\n").unwrap();
        let err = Registry::from_definition(&def).unwrap_err();
        assert!(err.is_missing_type());
    }

    #[test]
    fn test_unknown_group_member_is_hard_error() {
        let def = parse_ruleset_str("groups:\n  - { name: Subject, members: [Topic] }\n").unwrap();
        assert!(Registry::from_definition(&def).is_err());
    }

    #[test]
    fn test_invalid_cardinality_rejected() {
        let def = parse_ruleset_str(
            "fields:\n  - { name: a }\nelements:\n  - name: page\n    fields:\n      - { name: a, num: \"2\" }\n",
        )
        .unwrap();
        let err = Registry::from_definition(&def).unwrap_err();
        assert!(matches!(err, FolioError::Schema(_)));
    }

    #[test]
    fn test_duplicate_definitions_rejected() {
        let def = parse_ruleset_str("fields:\n  - { name: a }\n  - { name: a }\n").unwrap();
        assert!(Registry::from_definition(&def).is_err());
    }

    #[test]
    fn test_queries() {
        let registry = test_registry();
        assert_eq!(registry.anchor_element_types().len(), 2);
        assert_eq!(registry.person_field_types().len(), 1);
        assert!(registry.is_identifier("CatalogIDDigital"));
        assert!(!registry.is_identifier("TitleDocMain"));
        assert_eq!(
            registry.field_type_by_label("Haupttitel", "de").unwrap().name,
            "TitleDocMain"
        );
        assert!(registry.field_type_by_label("Haupttitel", "en").is_none());
    }
}
