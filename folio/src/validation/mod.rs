use crate::document::{Document, NodeId};
use crate::error::Result;
use crate::schema::is_hidden;
use std::collections::HashSet;

/// Result of validating a document or a single node
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validate every node of the logical and physical trees. A node that sits
/// in both trees is reported once.
pub fn validate_document(doc: &Document) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();
    let mut seen = HashSet::new();
    for root in [doc.logical_root(), doc.physical_root()].into_iter().flatten() {
        for id in doc.subtree(root)? {
            if seen.insert(id) {
                result.merge(validate_node(doc, id)?);
            }
        }
    }
    Ok(result)
}

/// Check one node against its element type.
///
/// Attach operations already enforce the rules, so problems here come from
/// re-typed nodes and from content built up before a type was assigned.
pub fn validate_node(doc: &Document, id: NodeId) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();
    let node = doc.node(id)?;
    let label = doc.display(id).to_string();

    let Some(element) = doc.element_type(id)? else {
        result.errors.push(format!("Node {label} has no element type"));
        return Ok(result);
    };

    for slot in &element.fields {
        if slot.rule.cardinality.is_mandatory() && node.count_of_type(&slot.type_name) == 0 {
            result.errors.push(format!(
                "Node {label} is missing mandatory field '{}' ({})",
                slot.type_name,
                slot.rule.cardinality.code()
            ));
        }
    }
    for slot in &element.groups {
        if slot.rule.cardinality.is_mandatory() && node.count_of_type(&slot.type_name) == 0 {
            result.errors.push(format!(
                "Node {label} is missing mandatory field group '{}' ({})",
                slot.type_name,
                slot.rule.cardinality.code()
            ));
        }
    }

    for &child in node.children() {
        match doc.node(child)?.type_name() {
            Some(child_type) if !element.allows_child(child_type) => {
                result.errors.push(format!(
                    "Child {} of type '{child_type}' is not allowed under '{}'",
                    doc.display(child),
                    element.name
                ));
            }
            _ => {}
        }
    }

    if !element.has_file_set && !node.asset_refs().is_empty() {
        result.warnings.push(format!(
            "Node {label} references {} asset(s), but element type '{}' has no file set",
            node.asset_refs().len(),
            element.name
        ));
    }

    let mut undeclared: Vec<&str> = Vec::new();
    for name in node.fields().iter().chain(node.persons()).map(|f| f.type_name.as_str()) {
        if !is_hidden(name) && element.field_rule(name).is_none() && !undeclared.contains(&name) {
            undeclared.push(name);
        }
    }
    for name in node.groups().iter().map(|g| g.type_name.as_str()) {
        if element.group_rule(name).is_none() && !undeclared.contains(&name) {
            undeclared.push(name);
        }
    }
    for name in undeclared {
        result.warnings.push(format!(
            "Node {label} carries '{name}', which element type '{}' does not declare",
            element.name
        ));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::test_document;
    use crate::asset::Asset;
    use crate::field::{Field, PersonName};
    use crate::schema::{parse_ruleset_str, Registry};
    use std::sync::Arc;

    #[test]
    fn test_valid_document() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        doc.add_field_value(book, "TitleDocMain", "Title").unwrap();
        doc.add_field_value(book, "Subject", "History").unwrap();
        let chapter = doc.create_child(book, "Chapter").unwrap();
        doc.add_person(chapter, Field::person("Author", PersonName::new("a", "b")))
            .unwrap();
        doc.set_logical_root(book).unwrap();

        let result = validate_document(&doc).unwrap();
        assert!(result.is_ok(), "{:?}", result.errors);
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_missing_mandatory_types() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        doc.create_child(book, "Chapter").unwrap();
        doc.set_logical_root(book).unwrap();

        let result = validate_document(&doc).unwrap();
        // TitleDocMain and Subject on the book, Author on the chapter
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.iter().any(|e| e.contains("'TitleDocMain' (1m)")));
        assert!(result.errors.iter().any(|e| e.contains("'Subject' (+)")));
        assert!(result.errors.iter().any(|e| e.contains("'Author' (+)")));
    }

    #[test]
    fn test_untyped_node() {
        let mut doc = test_document();
        let node = doc.create_untyped_node();
        let result = validate_node(&doc, node).unwrap();
        assert!(!result.is_ok());
        assert!(result.errors[0].contains("has no element type"));
    }

    #[test]
    fn test_retyping_reveals_problems() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        doc.add_field_value(book, "TitleDocMain", "Title").unwrap();
        doc.add_field_value(book, "Subject", "History").unwrap();
        doc.add_field_value(book, "_overlapping", "1").unwrap();
        let chapter = doc.create_child(book, "Chapter").unwrap();
        doc.add_person(chapter, Field::person("Author", PersonName::new("a", "b")))
            .unwrap();

        doc.set_type(book, "BoundBook").unwrap();
        let result = validate_node(&doc, book).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("not allowed under 'BoundBook'"));
        // hidden fields are never reported
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("'TitleDocMain'")));
        assert!(result.warnings.iter().any(|w| w.contains("'Subject'")));
    }

    #[test]
    fn test_assets_on_type_without_file_set() {
        let definition = parse_ruleset_str(
            r#"
elements:
  - name: Volume
    children: [Issue]
  - name: Issue
    file_set: false
"#,
        )
        .unwrap();
        let registry = Arc::new(Registry::from_definition(&definition).unwrap());
        let mut doc = Document::new(registry);
        let volume = doc.create_node("Volume").unwrap();
        let issue = doc.create_child(volume, "Issue").unwrap();
        doc.add_asset(volume, Asset::new("images/00000001.tif")).unwrap();
        doc.set_logical_root(volume).unwrap();
        assert!(!validate_document(&doc).unwrap().has_warnings());

        doc.add_asset(issue, Asset::new("images/00000002.tif")).unwrap();
        let result = validate_document(&doc).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("element type 'Issue' has no file set"));
    }
}
