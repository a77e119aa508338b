//! Ordered asset selection with a post-wide ratio lock.
//!
//! A post holds at most [`MAX_SELECTION`] assets, all sharing one
//! [`AspectRatio`]. The ratio locks on the first successful selection and
//! stays fixed until the selection is emptied again; that is the only way to
//! unlock it. The ratio picker only has an effect while nothing is selected.
//!
//! ```text
//! Empty ──select──▶ Selecting(1..=5, locked) ──deselect last──▶ Empty
//! ```

use crate::ratio::AspectRatio;
use crate::types::{AssetId, SourceAsset};
use thiserror::Error;

/// Maximum number of assets in one post.
pub const MAX_SELECTION: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection is full ({max} assets)")]
    Full { max: usize },
    #[error("asset {0} is already selected")]
    AlreadySelected(AssetId),
    #[error("asset {0} is not selected")]
    NotSelected(AssetId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// First asset of the post; the ratio is now locked.
    Locked(AspectRatio),
    Added,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeselectOutcome {
    Removed,
    /// Last asset removed; the ratio lock was cleared.
    Emptied,
}

#[derive(Debug, Clone)]
pub struct Selection {
    assets: Vec<SourceAsset>,
    lock: Option<AspectRatio>,
    /// Picked before the first selection; overrides `default_ratio` once.
    preferred: Option<AspectRatio>,
    default_ratio: AspectRatio,
}

impl Selection {
    pub fn new(default_ratio: AspectRatio) -> Self {
        Self {
            assets: Vec::new(),
            lock: None,
            preferred: None,
            default_ratio,
        }
    }

    pub fn assets(&self) -> &[SourceAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.assets.len() >= MAX_SELECTION
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.iter().any(|a| &a.id == id)
    }

    pub fn get(&self, id: &AssetId) -> Option<&SourceAsset> {
        self.assets.iter().find(|a| &a.id == id)
    }

    /// 1-based position in selection order, as shown on the picker badge.
    pub fn badge(&self, id: &AssetId) -> Option<usize> {
        self.assets.iter().position(|a| &a.id == id).map(|i| i + 1)
    }

    pub fn locked_ratio(&self) -> Option<AspectRatio> {
        self.lock
    }

    /// Ratio the picker should display: the lock if set, otherwise what a
    /// first selection would lock to.
    pub fn effective_ratio(&self) -> AspectRatio {
        self.lock
            .or(self.preferred)
            .unwrap_or(self.default_ratio)
    }

    /// Ratio picker. Returns `false` (and does nothing) while locked.
    pub fn pick_ratio(&mut self, ratio: AspectRatio) -> bool {
        if self.lock.is_some() {
            tracing::debug!(%ratio, locked = ?self.lock, "ratio picker ignored while locked");
            return false;
        }
        self.preferred = Some(ratio);
        true
    }

    pub fn select(&mut self, asset: SourceAsset) -> Result<SelectOutcome, SelectionError> {
        if self.contains(&asset.id) {
            return Err(SelectionError::AlreadySelected(asset.id));
        }
        if self.is_full() {
            return Err(SelectionError::Full { max: MAX_SELECTION });
        }

        tracing::debug!(id = %asset.id, count = self.assets.len() + 1, "select asset");
        self.assets.push(asset);
        if self.lock.is_some() {
            return Ok(SelectOutcome::Added);
        }
        let ratio = self.effective_ratio();
        self.lock = Some(ratio);
        tracing::info!(%ratio, "ratio locked for post");
        Ok(SelectOutcome::Locked(ratio))
    }

    pub fn deselect(&mut self, id: &AssetId) -> Result<DeselectOutcome, SelectionError> {
        let index = self
            .assets
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| SelectionError::NotSelected(id.clone()))?;
        self.assets.remove(index);
        tracing::debug!(%id, remaining = self.assets.len(), "deselect asset");

        if self.assets.is_empty() {
            self.lock = None;
            self.preferred = None;
            tracing::info!("selection emptied; ratio lock cleared");
            return Ok(DeselectOutcome::Emptied);
        }
        Ok(DeselectOutcome::Removed)
    }

    /// Drop everything, including the lock.
    pub fn clear(&mut self) {
        self.assets.clear();
        self.lock = None;
        self.preferred = None;
    }
}
