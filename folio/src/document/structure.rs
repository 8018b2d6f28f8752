use super::{Document, NodeId};
use crate::error::{FolioError, Result};

/// Wildcard accepted by [`Document::children_by_type_and_field`].
pub const WILDCARD: &str = "*";

impl Document {
    /// Create a node of `type_name` and append it to `parent`'s children.
    pub fn create_child(&mut self, parent: NodeId, type_name: &str) -> Result<NodeId> {
        let parent_type = self.required_type(parent)?;
        if !parent_type.allows_child(type_name) {
            log::error!(
                "Element type '{}' not allowed as child of type '{}'",
                type_name,
                parent_type.name
            );
            return Err(FolioError::TypeNotAllowedAsChild {
                parent: parent_type.name.clone(),
                child: type_name.to_string(),
            });
        }
        let child = self.create_node(type_name)?;
        self.add_child(parent, child, None)?;
        Ok(child)
    }

    /// Insert `child` under `parent` at `position` (default: end; clamped to
    /// the number of children). The child is first evicted from any prior
    /// parent, and inherits the parent's logical/physical flags.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) -> Result<()> {
        let parent_type = self.required_type(parent)?;
        let child_type = self.required_type(child)?;
        if !parent_type.allows_child(&child_type.name) {
            log::error!(
                "Element type '{}' not allowed as child of type '{}'",
                child_type.name,
                parent_type.name
            );
            return Err(FolioError::TypeNotAllowedAsChild {
                parent: parent_type.name.clone(),
                child: child_type.name.clone(),
            });
        }
        if child == parent || self.is_ancestor(child, parent)? {
            return Err(FolioError::CyclicStructure { node: child });
        }

        if let Some(previous) = self.node(child)?.parent {
            self.remove_child(previous, child)?;
        }

        let (logical, physical) = {
            let node = self.node(parent)?;
            (node.logical, node.physical)
        };
        if logical {
            self.set_logical(child, true)?;
        }
        if physical {
            self.set_physical(child, true)?;
        }

        let parent_node = self.node_mut(parent)?;
        let index = position
            .unwrap_or(parent_node.children.len())
            .min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent`. Tree flags the child had through this
    /// parent are cleared on the whole subtree. Returns false if `child` is
    /// not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        let parent_node = self.node_mut(parent)?;
        let Some(index) = parent_node.children.iter().position(|&c| c == child) else {
            log::warn!("Node {child} is not a child of {parent}");
            return Ok(false);
        };
        parent_node.children.remove(index);
        let (logical, physical) = (parent_node.logical, parent_node.physical);

        self.node_mut(child)?.parent = None;
        if logical {
            self.set_logical(child, false)?;
        }
        if physical {
            self.set_physical(child, false)?;
        }
        Ok(true)
    }

    /// Move `child` to `position` among its siblings. The position is
    /// counted after the child has been taken out and is clamped.
    pub fn move_child(&mut self, parent: NodeId, child: NodeId, position: usize) -> Result<bool> {
        let parent_node = self.node_mut(parent)?;
        let Some(index) = parent_node.children.iter().position(|&c| c == child) else {
            return Ok(false);
        };
        parent_node.children.remove(index);
        let position = position.min(parent_node.children.len());
        parent_node.children.insert(position, child);
        Ok(true)
    }

    /// Move `child` right behind its sibling `anchor`.
    pub fn move_child_after(&mut self, parent: NodeId, child: NodeId, anchor: NodeId) -> Result<bool> {
        self.move_relative(parent, child, anchor, 1)
    }

    /// Move `child` right in front of its sibling `anchor`.
    pub fn move_child_before(&mut self, parent: NodeId, child: NodeId, anchor: NodeId) -> Result<bool> {
        self.move_relative(parent, child, anchor, 0)
    }

    fn move_relative(&mut self, parent: NodeId, child: NodeId, anchor: NodeId, offset: usize) -> Result<bool> {
        if child == anchor {
            return Ok(false);
        }
        let parent_node = self.node_mut(parent)?;
        if !parent_node.children.contains(&anchor) {
            return Ok(false);
        }
        let Some(index) = parent_node.children.iter().position(|&c| c == child) else {
            return Ok(false);
        };
        parent_node.children.remove(index);
        // anchor is still present after the removal
        let anchor_index = parent_node
            .children
            .iter()
            .position(|&c| c == anchor)
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(anchor_index + offset, child);
        Ok(true)
    }

    /// Set the logical flag on a node and all its descendants.
    pub fn set_logical(&mut self, id: NodeId, logical: bool) -> Result<()> {
        for node in self.subtree(id)? {
            self.node_mut(node)?.logical = logical;
        }
        Ok(())
    }

    /// Set the physical flag on a node and all its descendants.
    pub fn set_physical(&mut self, id: NodeId, physical: bool) -> Result<()> {
        for node in self.subtree(id)? {
            self.node_mut(node)?.physical = physical;
        }
        Ok(())
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Whether `ancestor` lies on the parent chain of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        let mut current = self.node(node)?.parent;
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// The root of the tree `id` belongs to.
    pub fn top_node(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    pub fn position_of_child(&self, parent: NodeId, child: NodeId) -> Result<Option<usize>> {
        Ok(self.node(parent)?.children.iter().position(|&c| c == child))
    }

    pub fn next_child(&self, parent: NodeId, child: NodeId) -> Result<Option<NodeId>> {
        let children = &self.node(parent)?.children;
        Ok(children
            .iter()
            .position(|&c| c == child)
            .and_then(|i| children.get(i + 1).copied()))
    }

    pub fn previous_child(&self, parent: NodeId, child: NodeId) -> Result<Option<NodeId>> {
        let children = &self.node(parent)?.children;
        Ok(children
            .iter()
            .position(|&c| c == child)
            .filter(|&i| i > 0)
            .map(|i| children[i - 1]))
    }

    /// Whether an element of `type_name` may be added below `parent`.
    pub fn is_type_allowed_as_child(&self, parent: NodeId, type_name: &str) -> Result<bool> {
        Ok(self.required_type(parent)?.allows_child(type_name))
    }

    /// Comma-separated child indices leading from `ancestor` down to `node`,
    /// e.g. `"0,2,1"`. `None` if `node` is not below `ancestor`.
    pub fn index_of(&self, ancestor: NodeId, node: NodeId) -> Result<Option<String>> {
        let mut steps = Vec::new();
        let mut current = node;
        while current != ancestor {
            let Some(parent) = self.node(current)?.parent else {
                return Ok(None);
            };
            let Some(index) = self.position_of_child(parent, current)? else {
                return Ok(None);
            };
            steps.push(index.to_string());
            current = parent;
        }
        if steps.is_empty() {
            return Ok(None);
        }
        steps.reverse();
        Ok(Some(steps.join(",")))
    }

    /// Resolve a path produced by [`Document::index_of`].
    pub fn child_at(&self, ancestor: NodeId, path: &str) -> Result<Option<NodeId>> {
        let Some(indices) = parse_path(path) else {
            return Ok(None);
        };
        let mut current = ancestor;
        for index in indices {
            match self.node(current)?.children.get(index) {
                Some(&child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Insert `child` at a path below `ancestor`: all but the last index
    /// address the new parent, the last index is the insertion point.
    /// Returns false if the path does not resolve.
    pub fn add_child_at(&mut self, ancestor: NodeId, path: &str, child: NodeId) -> Result<bool> {
        let Some(mut indices) = parse_path(path) else {
            return Ok(false);
        };
        let Some(position) = indices.pop() else {
            return Ok(false);
        };
        let mut parent = ancestor;
        for index in indices {
            match self.node(parent)?.children.get(index) {
                Some(&next) => parent = next,
                None => return Ok(false),
            }
        }
        self.add_child(parent, child, Some(position))?;
        Ok(true)
    }

    /// Children matching an element type and carrying at least one field of
    /// a field type. Either may be [`WILDCARD`].
    pub fn children_by_type_and_field(
        &self,
        parent: NodeId,
        type_name: &str,
        field_type: &str,
    ) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        for &child in &self.node(parent)?.children {
            let node = self.node(child)?;
            let type_matches = type_name == WILDCARD || node.type_name() == Some(type_name);
            let field_matches =
                field_type == WILDCARD || node.fields.iter().any(|f| f.type_name == field_type);
            if type_matches && field_matches {
                out.push(child);
            }
        }
        Ok(out)
    }

    /// First child of `type_name` whose `field_type` field has value `value`.
    pub fn child_by_identifier(
        &self,
        parent: NodeId,
        type_name: &str,
        field_type: &str,
        value: &str,
    ) -> Result<Option<NodeId>> {
        for child in self.children_by_type_and_field(parent, type_name, field_type)? {
            let node = self.node(child)?;
            if node
                .fields
                .iter()
                .any(|f| f.type_name == field_type && f.value() == Some(value))
            {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }
}

fn parse_path(path: &str) -> Option<Vec<usize>> {
    path.split(',')
        .map(|part| part.trim().parse::<usize>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::test_document;
    use crate::field::Field;

    #[test]
    fn test_create_child_checks_allowed_types() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let chapter = doc.create_child(book, "Chapter").unwrap();
        assert_eq!(doc.parent(chapter).unwrap(), Some(book));
        assert_eq!(doc.children(book).unwrap(), &[chapter]);

        let err = doc.create_child(book, "page").unwrap_err();
        assert!(err.is_schema_violation());
        // nothing was attached
        assert_eq!(doc.children(book).unwrap().len(), 1);
    }

    #[test]
    fn test_add_child_requires_types() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let untyped = doc.create_untyped_node();
        assert!(matches!(
            doc.add_child(book, untyped, None),
            Err(FolioError::NodeHasNoType { .. })
        ));
        assert!(matches!(
            doc.add_child(untyped, book, None),
            Err(FolioError::NodeHasNoType { .. })
        ));
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut doc = test_document();
        let outer = doc.create_node("Chapter").unwrap();
        let inner = doc.create_child(outer, "Chapter").unwrap();
        assert!(matches!(
            doc.add_child(inner, outer, None),
            Err(FolioError::CyclicStructure { .. })
        ));
        assert!(matches!(
            doc.add_child(outer, outer, None),
            Err(FolioError::CyclicStructure { .. })
        ));
    }

    #[test]
    fn test_add_child_reparents_and_positions() {
        let mut doc = test_document();
        let a = doc.create_node("Monograph").unwrap();
        let b = doc.create_node("Monograph").unwrap();
        let c1 = doc.create_child(a, "Chapter").unwrap();
        let c2 = doc.create_child(a, "Chapter").unwrap();
        let c3 = doc.create_node("Chapter").unwrap();

        doc.add_child(a, c3, Some(0)).unwrap();
        assert_eq!(doc.children(a).unwrap(), &[c3, c1, c2]);

        doc.add_child(a, b, Some(99)).unwrap();
        assert_eq!(doc.children(a).unwrap(), &[c3, c1, c2, b]);

        doc.add_child(b, c1, None).unwrap();
        assert_eq!(doc.children(a).unwrap(), &[c3, c2, b]);
        assert_eq!(doc.children(b).unwrap(), &[c1]);
        assert_eq!(doc.parent(c1).unwrap(), Some(b));
    }

    #[test]
    fn test_flags_inherited_and_cleared() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        doc.set_logical_root(book).unwrap();
        let chapter = doc.create_node("Chapter").unwrap();
        let section = doc.create_child(chapter, "Chapter").unwrap();
        assert!(!doc.node(section).unwrap().is_logical());

        doc.add_child(book, chapter, None).unwrap();
        assert!(doc.node(chapter).unwrap().is_logical());
        assert!(doc.node(section).unwrap().is_logical());

        // children created below a logical node inherit at creation
        let late = doc.create_child(section, "Chapter").unwrap();
        assert!(doc.node(late).unwrap().is_logical());

        assert!(doc.remove_child(book, chapter).unwrap());
        assert!(doc.parent(chapter).unwrap().is_none());
        assert!(!doc.node(chapter).unwrap().is_logical());
        assert!(!doc.node(late).unwrap().is_logical());
    }

    #[test]
    fn test_remove_child_not_a_child() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let stray = doc.create_node("Chapter").unwrap();
        assert!(!doc.remove_child(book, stray).unwrap());
    }

    #[test]
    fn test_move_child() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let a = doc.create_child(book, "Chapter").unwrap();
        let b = doc.create_child(book, "Chapter").unwrap();
        let c = doc.create_child(book, "Chapter").unwrap();
        let stray = doc.create_node("Chapter").unwrap();

        assert!(doc.move_child(book, a, 2).unwrap());
        assert_eq!(doc.children(book).unwrap(), &[b, c, a]);
        assert!(doc.move_child(book, a, 50).unwrap());
        assert_eq!(doc.children(book).unwrap(), &[b, c, a]);
        assert!(!doc.move_child(book, stray, 0).unwrap());

        assert!(doc.move_child_after(book, b, c).unwrap());
        assert_eq!(doc.children(book).unwrap(), &[c, b, a]);
        assert!(doc.move_child_before(book, a, c).unwrap());
        assert_eq!(doc.children(book).unwrap(), &[a, c, b]);
        assert!(doc.move_child_after(book, a, b).unwrap());
        assert_eq!(doc.children(book).unwrap(), &[c, b, a]);

        assert!(!doc.move_child_after(book, stray, a).unwrap());
        assert!(!doc.move_child_before(book, a, stray).unwrap());
        assert!(!doc.move_child_before(book, a, a).unwrap());
    }

    #[test]
    fn test_navigation() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let a = doc.create_child(book, "Chapter").unwrap();
        let b = doc.create_child(book, "Chapter").unwrap();
        let deep = doc.create_child(b, "Chapter").unwrap();

        assert_eq!(doc.position_of_child(book, b).unwrap(), Some(1));
        assert_eq!(doc.next_child(book, a).unwrap(), Some(b));
        assert_eq!(doc.next_child(book, b).unwrap(), None);
        assert_eq!(doc.previous_child(book, b).unwrap(), Some(a));
        assert_eq!(doc.previous_child(book, a).unwrap(), None);
        assert_eq!(doc.top_node(deep).unwrap(), book);
        assert!(doc.is_ancestor(book, deep).unwrap());
        assert!(!doc.is_ancestor(a, deep).unwrap());
        assert!(doc.is_type_allowed_as_child(book, "Chapter").unwrap());
        assert!(!doc.is_type_allowed_as_child(book, "page").unwrap());
    }

    #[test]
    fn test_path_addressing() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let _a = doc.create_child(book, "Chapter").unwrap();
        let b = doc.create_child(book, "Chapter").unwrap();
        let b0 = doc.create_child(b, "Chapter").unwrap();
        let b1 = doc.create_child(b, "Chapter").unwrap();

        assert_eq!(doc.index_of(book, b1).unwrap().as_deref(), Some("1,1"));
        assert_eq!(doc.child_at(book, "1,1").unwrap(), Some(b1));
        assert_eq!(doc.child_at(book, "1,7").unwrap(), None);
        assert_eq!(doc.child_at(book, "x").unwrap(), None);
        assert_eq!(doc.index_of(b0, book).unwrap(), None);

        let inserted = doc.create_node("Chapter").unwrap();
        assert!(doc.add_child_at(book, "1,0", inserted).unwrap());
        assert_eq!(doc.children(b).unwrap(), &[inserted, b0, b1]);
        assert!(!doc.add_child_at(book, "5,0", inserted).unwrap());
    }

    #[test]
    fn test_children_by_type_and_field() {
        let mut doc = test_document();
        let book = doc.create_node("Monograph").unwrap();
        let a = doc.create_child(book, "Chapter").unwrap();
        let b = doc.create_child(book, "Chapter").unwrap();
        let nested = doc.create_child(book, "Monograph").unwrap();
        doc.add_field(a, Field::simple("TitleDocMain", "Intro")).unwrap();
        doc.add_field(b, Field::simple("TitleDocMain", "Outro")).unwrap();

        assert_eq!(
            doc.children_by_type_and_field(book, "Chapter", "*").unwrap(),
            vec![a, b]
        );
        assert_eq!(
            doc.children_by_type_and_field(book, "*", "*").unwrap(),
            vec![a, b, nested]
        );
        assert_eq!(
            doc.children_by_type_and_field(book, "*", "TitleDocMain").unwrap(),
            vec![a, b]
        );
        assert_eq!(
            doc.child_by_identifier(book, "Chapter", "TitleDocMain", "Outro").unwrap(),
            Some(b)
        );
        assert_eq!(
            doc.child_by_identifier(book, "Chapter", "TitleDocMain", "Preface").unwrap(),
            None
        );
    }
}
