use crate::asset::AssetRef;
use crate::field::{Field, FieldGroup};
use std::fmt;

/// Stable handle of an element node (index into the document arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable handle of a cross-reference edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

/// A typed link between two element nodes outside the parent/child
/// hierarchy. Recorded in the outbound list of `source` and the inbound
/// list of `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: String,
}

/// A node in the structural tree.
#[derive(Debug, Clone, Default)]
pub struct ElementNode {
    pub(crate) type_name: Option<String>,
    pub(crate) fields: Vec<Field>,
    pub(crate) persons: Vec<Field>,
    pub(crate) groups: Vec<FieldGroup>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) assets: Vec<AssetRef>,
    pub(crate) outbound: Vec<EdgeId>,
    pub(crate) inbound: Vec<EdgeId>,
    pub(crate) logical: bool,
    pub(crate) physical: bool,
    pub(crate) anchor_pointer: Option<String>,
}

impl ElementNode {
    pub(crate) fn new(type_name: Option<String>) -> Self {
        ElementNode {
            type_name,
            ..ElementNode::default()
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields whose type is not hidden.
    pub fn visible_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| !crate::schema::is_hidden(&f.type_name))
    }

    pub fn persons(&self) -> &[Field] {
        &self.persons
    }

    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn asset_refs(&self) -> &[AssetRef] {
        &self.assets
    }

    pub fn outbound(&self) -> &[EdgeId] {
        &self.outbound
    }

    pub fn inbound(&self) -> &[EdgeId] {
        &self.inbound
    }

    pub fn is_logical(&self) -> bool {
        self.logical
    }

    pub fn is_physical(&self) -> bool {
        self.physical
    }

    /// Identifier of the external record holding this node's ancestor aggregate.
    pub fn anchor_pointer(&self) -> Option<&str> {
        self.anchor_pointer.as_deref()
    }

    /// Number of fields, persons and groups sharing a type name.
    pub fn count_of_type(&self, type_name: &str) -> usize {
        self.fields.iter().filter(|f| f.type_name == type_name).count()
            + self.persons.iter().filter(|p| p.type_name == type_name).count()
            + self.groups.iter().filter(|g| g.type_name == type_name).count()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::PersonName;

    #[test]
    fn test_count_of_type_spans_fields_persons_groups() {
        let mut node = ElementNode::new(Some("Monograph".into()));
        node.fields.push(Field::simple("Creator", "a"));
        node.persons.push(Field::person("Creator", PersonName::new("b", "c")));
        node.groups.push(FieldGroup::new("Creator"));
        node.fields.push(Field::simple("TitleDocMain", "t"));

        assert_eq!(node.count_of_type("Creator"), 3);
        assert_eq!(node.count_of_type("TitleDocMain"), 1);
        assert_eq!(node.count_of_type("Other"), 0);
    }

    #[test]
    fn test_visible_fields_skip_hidden() {
        let mut node = ElementNode::new(None);
        node.fields.push(Field::simple("_overlapping", "1"));
        node.fields.push(Field::simple("TitleDocMain", "t"));
        assert_eq!(node.visible_fields().count(), 1);
        assert_eq!(NodeId(3).to_string(), "#3");
    }
}
