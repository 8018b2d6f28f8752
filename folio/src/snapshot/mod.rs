use crate::asset::{Asset, AssetId, AssetLocator};
use crate::document::{Document, NodeId};
use crate::error::{FolioError, Result};
use crate::field::{Field, FieldGroup};
use crate::schema::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const LOGICAL: &str = "logical";
const PHYSICAL: &str = "physical";

/// Serde form of a document. Edges name their endpoints by tree path
/// (`"logical:0,1"`, or `"physical:"` for a root); assets are listed once and
/// referenced by position. Nodes outside both trees are left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical: Option<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical: Option<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<EdgeSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persons: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<FieldGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetRefSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRefSnapshot {
    /// Position in [`DocumentSnapshot::assets`]
    pub asset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<AssetLocator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub source: String,
    pub target: String,
    pub kind: String,
}

impl DocumentSnapshot {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a snapshot file, choosing the format by extension (`.json`,
    /// anything else is YAML).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::from_yaml(&text),
        }
    }
}

impl Document {
    pub fn to_snapshot(&self) -> Result<DocumentSnapshot> {
        let mut writer = SnapshotWriter {
            doc: self,
            assets: Vec::new(),
            asset_index: HashMap::new(),
        };
        let logical = self.logical_root().map(|r| writer.node(r)).transpose()?;
        let physical = self.physical_root().map(|r| writer.node(r)).transpose()?;

        let mut edges = Vec::new();
        let mut in_trees = Vec::new();
        for root in [self.logical_root(), self.physical_root()].into_iter().flatten() {
            in_trees.extend(self.subtree(root)?);
        }
        for &id in &in_trees {
            for edge in self.outbound_edges(id)? {
                match (self.tree_path(edge.source)?, self.tree_path(edge.target)?) {
                    (Some(source), Some(target)) => edges.push(EdgeSnapshot {
                        source,
                        target,
                        kind: edge.kind.clone(),
                    }),
                    _ => log::debug!(
                        "Skipping '{}' edge {} -> {} leaving the trees",
                        edge.kind,
                        edge.source,
                        edge.target
                    ),
                }
            }
        }

        Ok(DocumentSnapshot {
            identifier: self.identifier().cloned(),
            assets: writer.assets,
            logical,
            physical,
            edges,
        })
    }

    /// Rebuild a document. Every attach goes through the regular checks, so
    /// a snapshot that does not fit `registry` is rejected.
    pub fn from_snapshot(registry: Arc<Registry>, snapshot: &DocumentSnapshot) -> Result<Document> {
        let mut doc = Document::new(registry);
        doc.set_identifier(snapshot.identifier.clone());

        let asset_ids: Vec<AssetId> = snapshot
            .assets
            .iter()
            .map(|a| doc.assets_mut().add(a.clone()))
            .collect();

        if let Some(tree) = &snapshot.logical {
            let root = doc.build_from_snapshot(tree, &snapshot.assets, &asset_ids)?;
            doc.set_logical_root(root)?;
        }
        if let Some(tree) = &snapshot.physical {
            let root = doc.build_from_snapshot(tree, &snapshot.assets, &asset_ids)?;
            doc.set_physical_root(root)?;
        }

        for edge in &snapshot.edges {
            let source = doc.resolve_tree_path(&edge.source)?;
            let target = doc.resolve_tree_path(&edge.target)?;
            doc.add_reference_to(source, target, &edge.kind)?;
        }
        Ok(doc)
    }

    fn build_from_snapshot(
        &mut self,
        snapshot: &NodeSnapshot,
        assets: &[Asset],
        asset_ids: &[AssetId],
    ) -> Result<NodeId> {
        let id = match &snapshot.type_name {
            Some(type_name) => self.create_node(type_name)?,
            None => self.create_untyped_node(),
        };
        self.set_anchor_pointer(id, snapshot.anchor_pointer.clone())?;

        for field in &snapshot.fields {
            if !self.add_field(id, field.clone())? {
                return Err(refused(&field.type_name, snapshot));
            }
        }
        for person in &snapshot.persons {
            if !self.add_person(id, person.clone())? {
                return Err(refused(&person.type_name, snapshot));
            }
        }
        for group in &snapshot.groups {
            if !self.add_group(id, group.clone())? {
                return Err(refused(&group.type_name, snapshot));
            }
        }

        for reference in &snapshot.assets {
            let (Some(asset), Some(&asset_id)) =
                (assets.get(reference.asset), asset_ids.get(reference.asset))
            else {
                return Err(FolioError::Snapshot(format!(
                    "Asset #{} does not exist",
                    reference.asset
                )));
            };
            match &reference.locator {
                Some(locator) => self.add_asset_with_locator(id, asset_id, locator.clone())?,
                None => {
                    self.add_asset(id, asset.clone())?;
                }
            }
        }

        for child in &snapshot.children {
            let child_id = self.build_from_snapshot(child, assets, asset_ids)?;
            self.add_child(id, child_id, None)?;
        }
        Ok(id)
    }

    /// `"logical:0,1"` style address of a node, `None` outside both trees.
    fn tree_path(&self, id: NodeId) -> Result<Option<String>> {
        for (tree, root) in [(LOGICAL, self.logical_root()), (PHYSICAL, self.physical_root())] {
            let Some(root) = root else { continue };
            if root == id {
                return Ok(Some(format!("{tree}:")));
            }
            if let Some(path) = self.index_of(root, id)? {
                return Ok(Some(format!("{tree}:{path}")));
            }
        }
        Ok(None)
    }

    fn resolve_tree_path(&self, address: &str) -> Result<NodeId> {
        let unresolved = || FolioError::Snapshot(format!("Cannot resolve node path '{address}'"));
        let (tree, path) = address.split_once(':').ok_or_else(unresolved)?;
        let root = match tree {
            LOGICAL => self.logical_root(),
            PHYSICAL => self.physical_root(),
            _ => None,
        }
        .ok_or_else(unresolved)?;
        if path.is_empty() {
            return Ok(root);
        }
        self.child_at(root, path)?.ok_or_else(unresolved)
    }
}

fn refused(type_name: &str, node: &NodeSnapshot) -> FolioError {
    FolioError::Snapshot(format!(
        "Too many values of '{}' on element of type '{}'",
        type_name,
        node.type_name.as_deref().unwrap_or("<none>")
    ))
}

struct SnapshotWriter<'a> {
    doc: &'a Document,
    assets: Vec<Asset>,
    asset_index: HashMap<AssetId, usize>,
}

impl SnapshotWriter<'_> {
    fn node(&mut self, id: NodeId) -> Result<NodeSnapshot> {
        let node = self.doc.node(id)?;

        let mut assets = Vec::new();
        for reference in node.asset_refs() {
            let Some(asset) = self.doc.assets().get(reference.asset) else {
                continue;
            };
            let index = match self.asset_index.get(&reference.asset) {
                Some(&index) => index,
                None => {
                    self.assets.push(asset.clone());
                    self.asset_index.insert(reference.asset, self.assets.len() - 1);
                    self.assets.len() - 1
                }
            };
            assets.push(AssetRefSnapshot {
                asset: index,
                locator: reference.locator.clone(),
            });
        }

        let children = node
            .children()
            .iter()
            .map(|&child| self.node(child))
            .collect::<Result<Vec<_>>>()?;

        Ok(NodeSnapshot {
            type_name: node.type_name().map(str::to_string),
            anchor_pointer: node.anchor_pointer().map(str::to_string),
            fields: node.fields().to_vec(),
            persons: node.persons().to_vec(),
            groups: node.groups().to_vec(),
            assets,
            children,
        })
    }
}
