pub mod assets;
pub mod edges;
pub mod fields;
pub mod node;
pub mod sort;
pub mod structure;

pub use node::{Edge, EdgeId, ElementNode, NodeId};

use crate::asset::AssetSet;
use crate::error::{FolioError, Result};
use crate::field::Field;
use crate::schema::{ElementType, Registry};
use std::fmt;
use std::sync::Arc;

/// Field types consulted, in order, for a node's short display value.
pub const DISPLAY_FIELD_TYPES: [&str; 4] = [
    "TitleDocMain",
    "CatalogIDDigital",
    "TitleDocMainShort",
    "MetsPointerURL",
];

const DISPLAY_MAX_CHARS: usize = 12;

/// Arena of element nodes forming a logical and a physical tree, linked by
/// edges and referencing a shared asset set. Mutations go through methods so
/// both sides of a parent/child or edge relation change together.
#[derive(Debug, Clone)]
pub struct Document {
    registry: Arc<Registry>,
    nodes: Vec<Option<ElementNode>>,
    edges: Vec<Option<Edge>>,
    logical_root: Option<NodeId>,
    physical_root: Option<NodeId>,
    assets: AssetSet,
    identifier: Option<Field>,
}

impl Document {
    pub fn new(registry: Arc<Registry>) -> Self {
        Document {
            registry,
            nodes: Vec::new(),
            edges: Vec::new(),
            logical_root: None,
            physical_root: None,
            assets: AssetSet::new(),
            identifier: None,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Create an unattached node of a registered element type.
    pub fn create_node(&mut self, type_name: &str) -> Result<NodeId> {
        if self.registry.type_by_name(type_name).is_none() {
            log::error!("Cannot create node of unknown element type '{type_name}'");
            return Err(FolioError::UnknownType {
                kind: "element",
                name: type_name.to_string(),
            });
        }
        Ok(self.alloc(ElementNode::new(Some(type_name.to_string()))))
    }

    /// Create an unattached node without an element type.
    pub fn create_untyped_node(&mut self) -> NodeId {
        self.alloc(ElementNode::new(None))
    }

    pub(crate) fn alloc(&mut self, node: ElementNode) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> Result<&ElementNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(FolioError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut ElementNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(FolioError::UnknownNode(id))
    }

    /// All live nodes, in allocation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeId(i))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0).and_then(Option::as_ref)
    }

    /// The element type of a node, or `None` for untyped nodes.
    pub fn element_type(&self, id: NodeId) -> Result<Option<&ElementType>> {
        let node = self.node(id)?;
        Ok(node
            .type_name
            .as_deref()
            .and_then(|name| self.registry.type_by_name(name)))
    }

    /// Like [`Document::element_type`], but a missing type is an error.
    pub fn required_type(&self, id: NodeId) -> Result<&ElementType> {
        self.element_type(id)?.ok_or_else(|| {
            log::error!("Node {id} has no element type");
            FolioError::NodeHasNoType {
                node: id.to_string(),
            }
        })
    }

    /// Re-type a node. Existing content is not re-validated.
    pub fn set_type(&mut self, id: NodeId, type_name: &str) -> Result<()> {
        if self.registry.type_by_name(type_name).is_none() {
            return Err(FolioError::UnknownType {
                kind: "element",
                name: type_name.to_string(),
            });
        }
        self.node_mut(id)?.type_name = Some(type_name.to_string());
        Ok(())
    }

    /// Anchor class of a node's element type.
    pub fn anchor_class_of(&self, id: NodeId) -> Result<Option<&str>> {
        Ok(self
            .element_type(id)?
            .and_then(|t| t.anchor_class.as_deref()))
    }

    pub fn set_anchor_pointer(&mut self, id: NodeId, pointer: Option<String>) -> Result<()> {
        self.node_mut(id)?.anchor_pointer = pointer;
        Ok(())
    }

    pub fn logical_root(&self) -> Option<NodeId> {
        self.logical_root
    }

    pub fn physical_root(&self) -> Option<NodeId> {
        self.physical_root
    }

    /// Install the logical tree root and mark its whole subtree as logical.
    pub fn set_logical_root(&mut self, id: NodeId) -> Result<()> {
        self.set_logical(id, true)?;
        self.logical_root = Some(id);
        Ok(())
    }

    /// Install the physical tree root and mark its whole subtree as physical.
    pub fn set_physical_root(&mut self, id: NodeId) -> Result<()> {
        self.set_physical(id, true)?;
        self.physical_root = Some(id);
        Ok(())
    }

    /// Anchor class of the logical root, if the document is part of an aggregate.
    pub fn anchor_class(&self) -> Option<&str> {
        self.logical_root
            .and_then(|root| self.anchor_class_of(root).ok().flatten())
    }

    pub fn assets(&self) -> &AssetSet {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetSet {
        &mut self.assets
    }

    pub fn identifier(&self) -> Option<&Field> {
        self.identifier.as_ref()
    }

    pub fn set_identifier(&mut self, identifier: Option<Field>) {
        self.identifier = identifier;
    }

    /// The node and all its descendants, depth-first, parents before children.
    pub fn subtree(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Nodes of an element type in the physical tree, then the logical tree.
    pub fn nodes_by_type(&self, type_name: &str) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        for root in [self.physical_root, self.logical_root].into_iter().flatten() {
            for id in self.subtree(root)? {
                if self.node(id)?.type_name() == Some(type_name) {
                    out.push(id);
                }
            }
        }
        Ok(out)
    }

    /// Remove a subtree from the document. The subtree is detached from its
    /// parent, every edge touching one of its nodes is removed from both
    /// endpoints, and asset references are dropped. Assets themselves stay
    /// in the asset set.
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        let doomed = self.subtree(id)?;
        if let Some(parent) = self.node(id)?.parent {
            self.remove_child(parent, id)?;
        }

        for &node_id in &doomed {
            let node = self.node(node_id)?;
            let touching: Vec<EdgeId> = node.outbound.iter().chain(node.inbound.iter()).copied().collect();
            for edge_id in touching {
                self.detach_edge(edge_id);
            }
        }

        for &node_id in &doomed {
            self.nodes[node_id.0] = None;
        }
        if self.logical_root.is_some_and(|r| doomed.contains(&r)) {
            self.logical_root = None;
        }
        if self.physical_root.is_some_and(|r| doomed.contains(&r)) {
            self.physical_root = None;
        }
        log::debug!("Deleted {} node(s) rooted at {id}", doomed.len());
        Ok(())
    }

    /// Display adapter printing the node type, its first identifying value and
    /// its children.
    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { doc: self, id }
    }
}

pub struct NodeDisplay<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(node) = self.doc.node(self.id) else {
            return write!(f, "{} (deleted)", self.id);
        };
        match node.type_name() {
            Some(name) => write!(f, "{name} (")?,
            None => write!(f, "{}(", self.id)?,
        }

        let value = DISPLAY_FIELD_TYPES.iter().find_map(|type_name| {
            node.fields
                .iter()
                .filter(|m| m.type_name == *type_name)
                .find_map(|m| m.value())
        });
        match value {
            Some(v) if v.chars().count() > DISPLAY_MAX_CHARS => {
                let short: String = v.chars().take(DISPLAY_MAX_CHARS - 1).collect();
                write!(f, "{short}\u{2026}")?;
            }
            Some(v) => f.write_str(v)?,
            None => write!(f, "\u{2026} {} \u{2026}", node.fields.len())?,
        }
        f.write_str(")[")?;

        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", self.doc.display(*child))?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::parse_ruleset_str;

    /// A small book/periodical ruleset shared by the document module tests.
    pub(crate) const TEST_RULESET: &str = r#"
fields:
  - { name: TitleDocMain }
  - { name: TitleDocMainShort }
  - { name: CatalogIDDigital, identifier: true }
  - { name: MetsPointerURL }
  - { name: pageNumber }
  - { name: physPageNumber }
  - { name: Subject }
  - { name: Note }
  - { name: Author, person: true }
  - { name: Editor, person: true }
groups:
  - { name: Publication, members: [Note, Editor] }
elements:
  - name: Periodical
    anchor: periodical
    children: [PeriodicalVolume]
    fields:
      - { name: TitleDocMain, num: 1m }
      - { name: CatalogIDDigital, num: 1o }
      - { name: MetsPointerURL, num: "*" }
  - name: PeriodicalVolume
    children: [Chapter]
    fields:
      - { name: TitleDocMain, num: 1o }
      - { name: CatalogIDDigital, num: 1o }
      - { name: MetsPointerURL, num: "*" }
  - name: Monograph
    children: [Chapter, Monograph]
    fields:
      - { name: TitleDocMain, num: 1m, default_display: true }
      - { name: CatalogIDDigital, num: 1o }
      - { name: Subject, num: "+" }
      - { name: Note, num: "*", default_display: true }
      - { name: Author, num: "*" }
      - { name: Editor, num: 1o }
    groups:
      - { name: Publication, num: 1o, default_display: true }
  - name: Chapter
    children: [Chapter]
    fields:
      - { name: TitleDocMain, num: 1o }
      - { name: Author, num: "+" }
  - name: BoundBook
    children: [page]
    fields:
      - { name: physPageNumber, num: 1o }
  - name: page
    fields:
      - { name: pageNumber, num: 1m }
      - { name: physPageNumber, num: 1m }
"#;

    pub(crate) fn test_registry() -> Arc<Registry> {
        let def = parse_ruleset_str(TEST_RULESET).unwrap();
        Arc::new(Registry::from_definition(&def).unwrap())
    }

    pub(crate) fn test_document() -> Document {
        Document::new(test_registry())
    }

    #[test]
    fn test_create_node_requires_registered_type() {
        let mut doc = test_document();
        let id = doc.create_node("Monograph").unwrap();
        assert_eq!(doc.node(id).unwrap().type_name(), Some("Monograph"));
        assert!(doc.node(id).unwrap().parent().is_none());

        let err = doc.create_node("Newspaper").unwrap_err();
        assert!(err.is_missing_type());
    }

    #[test]
    fn test_required_type_on_untyped_node() {
        let mut doc = test_document();
        let id = doc.create_untyped_node();
        assert!(doc.element_type(id).unwrap().is_none());
        assert!(matches!(
            doc.required_type(id),
            Err(FolioError::NodeHasNoType { .. })
        ));
    }

    #[test]
    fn test_set_roots_mark_trees() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let chapter = doc.create_child(book, "Chapter").unwrap();
        doc.set_logical_root(book).unwrap();

        assert!(doc.node(book).unwrap().is_logical());
        assert!(doc.node(chapter).unwrap().is_logical());
        assert!(!doc.node(chapter).unwrap().is_physical());
        assert_eq!(doc.logical_root(), Some(book));
    }

    #[test]
    fn test_anchor_class_from_logical_root() {
        let mut doc = test_document();
        assert!(doc.anchor_class().is_none());
        let periodical = doc.create_node("Periodical").unwrap();
        doc.set_logical_root(periodical).unwrap();
        assert_eq!(doc.anchor_class(), Some("periodical"));
    }

    #[test]
    fn test_nodes_by_type_walks_physical_then_logical() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let ch1 = doc.create_child(book, "Chapter").unwrap();
        let ch2 = doc.create_child(ch1, "Chapter").unwrap();
        let bound = doc.create_node("BoundBook").unwrap();
        let page = doc.create_child(bound, "page").unwrap();
        doc.set_logical_root(book).unwrap();
        doc.set_physical_root(bound).unwrap();

        assert_eq!(doc.nodes_by_type("Chapter").unwrap(), vec![ch1, ch2]);
        assert_eq!(doc.nodes_by_type("page").unwrap(), vec![page]);
        assert!(doc.nodes_by_type("Periodical").unwrap().is_empty());
    }

    #[test]
    fn test_delete_node_detaches_edges_on_far_side() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let chapter = doc.create_child(book, "Chapter").unwrap();
        let bound = doc.create_node("BoundBook").unwrap();
        let page = doc.create_child(bound, "page").unwrap();
        doc.add_reference_to(chapter, page, "logical_physical").unwrap();
        doc.add_reference_to(page, book, "back").unwrap();

        doc.delete_node(chapter).unwrap();

        assert!(!doc.contains(chapter));
        assert!(doc.node(book).unwrap().children().is_empty());
        assert!(doc.node(page).unwrap().inbound().is_empty());
        assert_eq!(doc.node(page).unwrap().outbound().len(), 1);

        doc.delete_node(bound).unwrap();
        assert!(doc.node(book).unwrap().inbound().is_empty());
        assert!(matches!(doc.node(page), Err(FolioError::UnknownNode(_))));
    }

    #[test]
    fn test_display_uses_first_identifying_value() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        doc.add_field(book, Field::simple("CatalogIDDigital", "PPN123"))
            .unwrap();
        doc.add_field(book, Field::simple("TitleDocMain", "A rather long title"))
            .unwrap();
        let chapter = doc.create_child(book, "Chapter").unwrap();

        assert_eq!(
            doc.display(book).to_string(),
            "Monograph (A rather lo\u{2026})[Chapter (\u{2026} 0 \u{2026})[]]"
        );
        doc.delete_node(chapter).unwrap();
        assert_eq!(doc.display(chapter).to_string(), format!("{chapter} (deleted)"));
    }
}
