use super::{Document, NodeId};
use crate::asset::{Asset, AssetId, AssetLocator, AssetRef};
use crate::error::{FolioError, Result};

impl Document {
    /// Add `asset` to the asset set (unless its location is already known)
    /// and reference it from the node. An identical plain reference is not
    /// added twice.
    pub fn add_asset(&mut self, id: NodeId, asset: Asset) -> Result<AssetId> {
        self.node(id)?;
        let asset_id = self.assets.add(asset);
        let reference = AssetRef {
            asset: asset_id,
            locator: None,
        };
        let node = self.node_mut(id)?;
        if !node.assets.contains(&reference) {
            node.assets.push(reference);
        }
        Ok(asset_id)
    }

    /// Reference part of an already stored asset. Always appends.
    pub fn add_asset_with_locator(
        &mut self,
        id: NodeId,
        asset: AssetId,
        locator: AssetLocator,
    ) -> Result<()> {
        if self.assets.get(asset).is_none() {
            return Err(FolioError::DanglingAssetReference {
                location: asset.to_string(),
                element: id.to_string(),
            });
        }
        self.node_mut(id)?.assets.push(AssetRef {
            asset,
            locator: Some(locator),
        });
        Ok(())
    }

    /// Drop every reference from the node to `asset`.
    pub fn remove_asset(&mut self, id: NodeId, asset: AssetId) -> Result<()> {
        let location = self
            .assets
            .get(asset)
            .map(|a| a.location.clone())
            .unwrap_or_else(|| asset.to_string());
        let node = self.node_mut(id)?;
        let before = node.assets.len();
        node.assets.retain(|r| r.asset != asset);
        if node.assets.len() == before {
            log::warn!("Asset '{location}' is not referenced by {id}");
            return Err(FolioError::DanglingAssetReference {
                location,
                element: id.to_string(),
            });
        }
        Ok(())
    }

    /// Distinct assets referenced by the node, in reference order.
    pub fn assets_of(&self, id: NodeId) -> Result<Vec<(AssetId, &Asset)>> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for reference in &self.node(id)?.assets {
            if seen.contains(&reference.asset) {
                continue;
            }
            seen.push(reference.asset);
            if let Some(asset) = self.assets.get(reference.asset) {
                out.push((reference.asset, asset));
            }
        }
        Ok(out)
    }

    /// File name of the first asset referenced by the node.
    pub fn image_name(&self, id: NodeId) -> Result<Option<&str>> {
        Ok(self
            .assets_of(id)?
            .into_iter()
            .next()
            .map(|(_, asset)| asset.file_name()))
    }
}
