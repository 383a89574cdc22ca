//! Three-level service-catalog selection: catalog → sub-service →
//! detail-service.
//!
//! The selection is a single tree-position value with one `select`
//! operation; picking a node at any depth truncates everything below it
//! before the next option list is derived, so stale state can never survive
//! a re-selection. The "asset required" flag comes solely from the selected
//! depth-2 leaf.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::event::AssetId;
use crate::model::CatalogNode;
use crate::raw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogDepth {
    Catalog,
    SubService,
    DetailService,
}

impl CatalogDepth {
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::Catalog),
            2 => Some(Self::SubService),
            3 => Some(Self::DetailService),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog payload has no recognizable node list")]
    EmptyTree,
    #[error("invalid catalog depth {0}")]
    InvalidDepth(u8),
    #[error("no node `{id}` among the current options at depth {depth:?}")]
    UnknownNode { depth: CatalogDepth, id: String },
    #[error("a detail-service must be selected before submitting")]
    IncompleteSelection,
    #[error("the selected service requires an asset reference")]
    AssetRequired,
}

/// The catalog tree for one organizational unit, fetched once per
/// composition session and discarded with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogTree {
    roots: Vec<CatalogNode>,
}

impl CatalogTree {
    #[must_use]
    pub fn new(roots: Vec<CatalogNode>) -> Self {
        Self { roots }
    }

    /// Parses a catalog payload. The node array is probed under the usual
    /// wrap keys before trying the root.
    pub fn parse(payload: &Value) -> Result<Self, CatalogError> {
        let entries = payload
            .as_array()
            .map(Vec::as_slice)
            .or_else(|| raw::first_array(payload, &["catalogs", "catalog", "data"]))
            .ok_or(CatalogError::EmptyTree)?;

        let roots: Vec<CatalogNode> = entries
            .iter()
            .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                Ok(node) => Some(node),
                Err(error) => {
                    tracing::warn!(%error, "skipping malformed catalog node");
                    None
                }
            })
            .collect();

        if roots.is_empty() {
            return Err(CatalogError::EmptyTree);
        }
        Ok(Self { roots })
    }

    #[must_use]
    pub fn roots(&self) -> &[CatalogNode] {
        &self.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    fn find<'a>(nodes: &'a [CatalogNode], id: &str) -> Option<&'a CatalogNode> {
        nodes.iter().find(|n| n.id == id)
    }
}

/// Current position in the cascade. `level2`/`level3` are only ever set when
/// every shallower level is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogSelection {
    level1: Option<String>,
    level2: Option<String>,
    level3: Option<String>,
}

impl CatalogSelection {
    /// Selects a node at `depth`, clearing every deeper selection first —
    /// even when the new node shares child ids with the previous one.
    pub fn select(
        &mut self,
        tree: &CatalogTree,
        depth: CatalogDepth,
        id: &str,
    ) -> Result<(), CatalogError> {
        let unknown = |d| CatalogError::UnknownNode { depth: d, id: id.to_string() };

        match depth {
            CatalogDepth::Catalog => {
                CatalogTree::find(tree.roots(), id).ok_or_else(|| unknown(depth))?;
                self.level1 = Some(id.to_string());
                self.level2 = None;
                self.level3 = None;
            }
            CatalogDepth::SubService => {
                CatalogTree::find(self.level2_options(tree), id).ok_or_else(|| unknown(depth))?;
                self.level2 = Some(id.to_string());
                self.level3 = None;
            }
            CatalogDepth::DetailService => {
                CatalogTree::find(self.level3_options(tree), id).ok_or_else(|| unknown(depth))?;
                self.level3 = Some(id.to_string());
            }
        }
        Ok(())
    }

    pub fn select_index(
        &mut self,
        tree: &CatalogTree,
        depth_index: u8,
        id: &str,
    ) -> Result<(), CatalogError> {
        let depth =
            CatalogDepth::from_index(depth_index).ok_or(CatalogError::InvalidDepth(depth_index))?;
        self.select(tree, depth, id)
    }

    pub fn clear(&mut self) {
        self.level1 = None;
        self.level2 = None;
        self.level3 = None;
    }

    #[must_use]
    pub fn selected_catalog<'a>(&self, tree: &'a CatalogTree) -> Option<&'a CatalogNode> {
        CatalogTree::find(tree.roots(), self.level1.as_deref()?)
    }

    #[must_use]
    pub fn selected_sub_service<'a>(&self, tree: &'a CatalogTree) -> Option<&'a CatalogNode> {
        CatalogTree::find(
            &self.selected_catalog(tree)?.children,
            self.level2.as_deref()?,
        )
    }

    /// The selected depth-2 leaf, when the cascade is complete.
    #[must_use]
    pub fn resolved_detail<'a>(&self, tree: &'a CatalogTree) -> Option<&'a CatalogNode> {
        CatalogTree::find(
            &self.selected_sub_service(tree)?.children,
            self.level3.as_deref()?,
        )
    }

    /// Options the next level down should present.
    #[must_use]
    pub fn level2_options<'a>(&self, tree: &'a CatalogTree) -> &'a [CatalogNode] {
        self.selected_catalog(tree).map_or(&[], |n| &n.children)
    }

    #[must_use]
    pub fn level3_options<'a>(&self, tree: &'a CatalogTree) -> &'a [CatalogNode] {
        self.selected_sub_service(tree).map_or(&[], |n| &n.children)
    }

    /// True iff the selected leaf demands an asset reference. Never
    /// inherited from shallower nodes or a previous selection path.
    #[must_use]
    pub fn needs_asset(&self, tree: &CatalogTree) -> bool {
        self.resolved_detail(tree).is_some_and(|n| n.need_asset)
    }

    #[must_use]
    pub fn service_item_id(&self) -> Option<&str> {
        self.level3.as_deref()
    }

    /// Local validation gate run before a create request is described.
    pub fn validate_submission(
        &self,
        tree: &CatalogTree,
        asset: Option<&AssetId>,
    ) -> Result<(), CatalogError> {
        if self.resolved_detail(tree).is_none() {
            return Err(CatalogError::IncompleteSelection);
        }
        if self.needs_asset(tree) && asset.is_none() {
            return Err(CatalogError::AssetRequired);
        }
        Ok(())
    }
}
