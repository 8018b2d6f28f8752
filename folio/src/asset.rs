use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an asset in a document's asset set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub usize);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// An external content file. Locations are not checked for existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub representative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl Asset {
    pub fn new(location: impl Into<String>) -> Self {
        Asset {
            location: location.into(),
            mimetype: None,
            representative: false,
            identifier: None,
        }
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Last path segment of the location.
    pub fn file_name(&self) -> &str {
        self.location
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.location.as_str())
    }
}

/// Restricts a reference to part of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLocator {
    /// e.g. `BYTE` or `AREA`
    pub kind: String,
    pub from: String,
    pub to: String,
}

/// A node's link to an asset in the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub asset: AssetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<AssetLocator>,
}

/// Document-wide collection of assets. Removing an asset leaves a hole so
/// that ids stay stable.
#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    assets: Vec<Option<Asset>>,
}

impl AssetSet {
    pub fn new() -> Self {
        AssetSet::default()
    }

    /// Add an asset unless one with the same location exists; returns the id
    /// of the stored asset either way.
    pub fn add(&mut self, asset: Asset) -> AssetId {
        if let Some(id) = self.find_by_location(&asset.location) {
            return id;
        }
        self.assets.push(Some(asset));
        AssetId(self.assets.len() - 1)
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.assets.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn find_by_location(&self, location: &str) -> Option<AssetId> {
        self.iter()
            .find(|(_, asset)| asset.location == location)
            .map(|(id, _)| id)
    }

    pub fn remove(&mut self, id: AssetId) -> Option<Asset> {
        self.assets.get_mut(id.0).and_then(Option::take)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &Asset)> {
        self.assets
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.as_ref().map(|a| (AssetId(i), a)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
