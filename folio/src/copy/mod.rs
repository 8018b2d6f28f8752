//! Full and anchor-bounded copies of element subtrees, and the anchor chain
//! helpers used when an aggregate is split across several linked records.
//!
//! An *anchor class* groups a contiguous run of element levels that are
//! stored in one external record (e.g. a periodical and its years). A
//! truncated copy extracts the part of a tree that belongs to one such
//! record: full content at the matching levels, and just enough linking
//! fields on the neighbouring levels to locate the other records.

use crate::document::{Document, ElementNode, NodeId};
use crate::error::{FolioError, Result};
use crate::field::Field;

/// Field type carrying the generated link to another record.
pub const POINTER_FIELD_TYPE: &str = "MetsPointerURL";

/// Field types copied onto nodes that belong to a neighbouring record.
pub const FOREIGN_CHILD_FIELD_TYPES: [&str; 3] =
    [POINTER_FIELD_TYPE, "TitleDocMain", "TitleDocMainShort"];

/// Which children a [`Document::copy`] takes along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildCopy {
    /// The whole subtree.
    All,
    /// Only children of the same anchor class as their parent, recursively.
    /// Nothing below a node without an anchor class.
    SameAnchor,
    /// No children.
    None,
}

impl Document {
    /// Copy a node of the same type. With `copy_fields`, fields, persons and
    /// groups are duplicated (authority records only when complete). The copy
    /// carries the source's parent pointer, tree flags and anchor pointer, but
    /// is not inserted into the parent's children.
    pub fn copy(&mut self, id: NodeId, copy_fields: bool, children: ChildCopy) -> Result<NodeId> {
        let (copy, source_children) = {
            let source = self.node(id)?;
            let mut copy = ElementNode::new(source.type_name.clone());
            copy.parent = source.parent;
            copy.logical = source.logical;
            copy.physical = source.physical;
            copy.anchor_pointer = source.anchor_pointer.clone();
            if copy_fields {
                copy.fields = source.fields.iter().map(Field::duplicate).collect();
                copy.persons = source.persons.iter().map(Field::duplicate).collect();
                copy.groups = source.groups.iter().map(|g| g.duplicate()).collect();
            }
            (copy, source.children.clone())
        };
        let own_anchor = self.anchor_class_of(id)?.map(str::to_string);
        let copy_id = self.alloc(copy);

        for child in source_children {
            let include = match children {
                ChildCopy::All => true,
                ChildCopy::SameAnchor => {
                    own_anchor.is_some() && self.anchor_class_of(child)? == own_anchor.as_deref()
                }
                ChildCopy::None => false,
            };
            if include {
                let copied = self.copy(child, copy_fields, children)?;
                self.attach_copy(copy_id, copied)?;
            }
        }
        Ok(copy_id)
    }

    /// Partial copy holding what the record of `anchor_class` stores: the
    /// content of nodes of that class, the linking fields of the levels
    /// directly around it, and the structure leading to it from the root.
    pub fn copy_truncated(&mut self, id: NodeId, anchor_class: &str) -> Result<NodeId> {
        let parent = self.node(id)?.parent;
        self.truncated(id, parent, anchor_class)
    }

    fn truncated(&mut self, id: NodeId, parent: Option<NodeId>, anchor_class: &str) -> Result<NodeId> {
        let own_matches = self.anchor_class_of(id)? == Some(anchor_class);
        let parent_matches = match parent {
            Some(p) => self.anchor_class_of(p)? == Some(anchor_class),
            None => false,
        };
        let mut child_has_class = false;
        for &child in self.node(id)?.children() {
            if self.anchor_class_of(child)? == Some(anchor_class) {
                child_has_class = true;
                break;
            }
        }

        let (copy, source_children) = {
            let source = self.node(id)?;
            let mut copy = ElementNode::new(source.type_name.clone());
            copy.parent = parent;
            copy.logical = source.logical;
            copy.physical = source.physical;
            if own_matches {
                copy.fields = source
                    .fields
                    .iter()
                    .filter(|f| f.type_name != POINTER_FIELD_TYPE)
                    .map(Field::duplicate)
                    .collect();
                copy.groups = source.groups.iter().map(|g| g.duplicate()).collect();
                copy.persons = source.persons.iter().map(Field::duplicate).collect();
            } else if parent_matches || child_has_class {
                copy.fields = source
                    .fields
                    .iter()
                    .filter(|f| FOREIGN_CHILD_FIELD_TYPES.contains(&f.type_name.as_str()))
                    .map(Field::value_only)
                    .collect();
            }
            (copy, source.children.clone())
        };
        let copy_id = self.alloc(copy);

        if own_matches || parent.is_none() || !parent_matches {
            for child in source_children {
                if own_matches || !self.is_pointer_only(child)? {
                    let copied = self.truncated(child, Some(id), anchor_class)?;
                    self.attach_copy(copy_id, copied)?;
                }
            }
        }
        Ok(copy_id)
    }

    fn attach_copy(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Whether a node is nothing but a link to another record: it carries a
    /// pointer field itself, or all of its (at least one) children are
    /// pointer-only.
    pub fn is_pointer_only(&self, id: NodeId) -> Result<bool> {
        let node = self.node(id)?;
        if node.fields.iter().any(|f| f.type_name == POINTER_FIELD_TYPE) {
            return Ok(true);
        }
        if node.children.is_empty() {
            return Ok(false);
        }
        for &child in &node.children {
            if !self.is_pointer_only(child)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Descendants that start a new anchor class below this node, looking
    /// through children of the node's own class and skipping children that
    /// carry a pointer field.
    pub fn all_real_successors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let own = self.anchor_class_of(id)?;
        let mut out = Vec::new();
        for &child in self.node(id)?.children() {
            if self.anchor_class_of(child)? == own {
                out.extend(self.all_real_successors(child)?);
            } else if !self
                .node(child)?
                .fields
                .iter()
                .any(|f| f.type_name == POINTER_FIELD_TYPE)
            {
                out.push(child);
            }
        }
        Ok(out)
    }

    /// The anchor classes of the tree below `id`, outermost first. Empty if
    /// `id` has no anchor class.
    ///
    /// Fails with [`FolioError::AggregationConfig`] if the real successors on
    /// one level belong to different anchor classes, or if an anchor class
    /// reappears below a different one.
    pub fn all_anchor_classes(&self, id: NodeId) -> Result<Vec<String>> {
        let mut result: Vec<String> = Vec::new();
        let Some(first) = self.anchor_class_of(id)? else {
            return Ok(result);
        };
        result.push(first.to_string());

        let mut level = self.all_real_successors(id)?;
        while !level.is_empty() {
            let mut level_class: Option<&str> = None;
            let mut next_level = Vec::new();
            for &node in &level {
                let Some(class) = self.anchor_class_of(node)? else {
                    continue;
                };
                match level_class {
                    None => level_class = Some(class),
                    Some(seen) if seen != class => {
                        let parent_type = self
                            .node(node)?
                            .parent
                            .and_then(|p| self.node(p).ok())
                            .and_then(|p| p.type_name())
                            .unwrap_or("?");
                        log::error!(
                            "Children of '{parent_type}' belong to anchor classes '{seen}' and '{class}'"
                        );
                        return Err(FolioError::AggregationConfig(format!(
                            "children of '{parent_type}' belong to different anchor classes \
                             '{seen}' and '{class}'"
                        )));
                    }
                    Some(_) => {}
                }
                next_level.extend(self.all_real_successors(node)?);
            }
            if let Some(class) = level_class {
                if result.iter().any(|c| c == class) {
                    let last = result.last().map(String::as_str).unwrap_or_default();
                    log::error!("Anchor class '{class}' is interrupted by '{last}'");
                    return Err(FolioError::AggregationConfig(format!(
                        "levels stored in anchor '{class}' are interrupted by levels stored in '{last}'"
                    )));
                }
                result.push(class.to_string());
            }
            level = next_level;
        }
        Ok(result)
    }

    /// Whether, when writing the record of `file_class`, this node must be
    /// written as a link down into its own record: its parent belongs to
    /// `file_class` and it does not.
    pub fn must_write_downwards_pointer(&self, id: NodeId, file_class: Option<&str>) -> Result<bool> {
        let (Some(file_class), Some(parent)) = (file_class, self.node(id)?.parent) else {
            return Ok(false);
        };
        Ok(self.anchor_class_of(parent)? == Some(file_class)
            && self.anchor_class_of(id)? != Some(file_class))
    }

    /// Whether, when writing the record of `file_class`, this node must carry
    /// a link up to the record holding its parent: the record of
    /// `file_class` lies below the parent's anchor class in the tree's
    /// anchor chain. `None` stands for the record of nodes without a class.
    pub fn must_write_upwards_pointer(&self, id: NodeId, file_class: Option<&str>) -> Result<bool> {
        let own = self.anchor_class_of(id)?;
        if own == file_class {
            return Ok(false);
        }
        let Some(parent) = self.node(id)?.parent else {
            return Ok(own.is_some());
        };
        let parent_class = self.anchor_class_of(parent)?;
        if parent_class.is_none() || parent_class == own {
            return Ok(false);
        }

        let top = self.top_node(id)?;
        let chain = self.all_anchor_classes(top)?;
        let links = chain.iter().map(|c| Some(c.as_str())).chain(std::iter::once(None));
        for link in links {
            if link == file_class {
                return Ok(false);
            }
            if link == parent_class {
                return Ok(true);
            }
        }
        Err(FolioError::AggregationConfig(format!(
            "anchor class '{}' of the parent of {id} is not part of the anchor chain {:?}",
            parent_class.unwrap_or_default(),
            chain
        )))
    }
}
