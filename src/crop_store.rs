//! Per-asset crop parameters for one post-creation session.
//!
//! Entries are created lazily the first time an asset is opened for
//! adjustment, defaulted to the fit scale (whole image visible, centered).
//! Every gesture runs through [`clamp_params`] before it is written back, so
//! a stored entry is never un-clamped. An entry that does not exist yet is
//! simply absent; there is no zero-zoom placeholder to leak into a render.
//!
//! Entries outlive finalization: re-opening a finalized asset restores the
//! stored parameters instead of re-defaulting them.

use crate::imaging::{CropParams, Dimensions, FrameSize, clamp_params, fit_scale, revalidate};
use crate::types::AssetId;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CropStoreError {
    #[error("asset {0} has no crop parameters yet")]
    Uninitialized(AssetId),
    #[error("asset {0} has a zero-sized source image")]
    EmptyImage(AssetId),
}

/// Stored state for one asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropEntry {
    pub params: CropParams,
    /// Source resolution the parameters refer to.
    pub image: Dimensions,
    /// `false` while the entry still holds the untouched fit-scale default.
    pub touched: bool,
}

impl CropEntry {
    fn revalidate(&mut self, frame: FrameSize) {
        let image = self.image.as_tuple();
        self.params = if self.touched {
            revalidate(self.params, image, frame)
        } else {
            CropParams::centered(fit_scale(image, frame))
        };
    }
}

#[derive(Debug, Clone, Default)]
pub struct CropStore {
    entries: HashMap<AssetId, CropEntry>,
}

impl CropStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &AssetId) -> Option<&CropEntry> {
        self.entries.get(id)
    }

    pub fn params(&self, id: &AssetId) -> Option<CropParams> {
        self.entries.get(id).map(|e| e.params)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the entry for `id`, creating it at fit scale on first access.
    pub fn open(
        &mut self,
        id: &AssetId,
        image: Dimensions,
        frame: FrameSize,
    ) -> Result<CropEntry, CropStoreError> {
        if let Some(entry) = self.entries.get(id) {
            return Ok(*entry);
        }
        if image.width == 0 || image.height == 0 {
            return Err(CropStoreError::EmptyImage(id.clone()));
        }
        let entry = CropEntry {
            params: CropParams::centered(fit_scale(image.as_tuple(), frame)),
            image,
            touched: false,
        };
        tracing::debug!(%id, zoom = entry.params.zoom, "initialized crop at fit scale");
        self.entries.insert(id.clone(), entry);
        Ok(entry)
    }

    /// Restore a previously stored entry (re-edit after a reload).
    pub fn restore(&mut self, id: AssetId, entry: CropEntry) {
        self.entries.insert(id, entry);
    }

    /// Clamp a candidate and write it back.
    pub fn commit(
        &mut self,
        id: &AssetId,
        candidate: CropParams,
        frame: FrameSize,
    ) -> Result<CropParams, CropStoreError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| CropStoreError::Uninitialized(id.clone()))?;
        let clamped = clamp_params(candidate, entry.image.as_tuple(), frame);
        entry.params = clamped;
        entry.touched = true;
        Ok(clamped)
    }

    /// Drag by `(dx, dy)` display units.
    pub fn pan(
        &mut self,
        id: &AssetId,
        dx: f64,
        dy: f64,
        frame: FrameSize,
    ) -> Result<CropParams, CropStoreError> {
        let current = self.current(id)?;
        self.commit(
            id,
            CropParams {
                zoom: current.zoom,
                offset_x: current.offset_x + dx,
                offset_y: current.offset_y + dy,
            },
            frame,
        )
    }

    /// Pinch by a multiplicative factor. Offsets scale with the zoom so the
    /// point under the frame center stays put.
    pub fn pinch(
        &mut self,
        id: &AssetId,
        factor: f64,
        frame: FrameSize,
    ) -> Result<CropParams, CropStoreError> {
        let current = self.current(id)?;
        self.commit(
            id,
            CropParams {
                zoom: current.zoom * factor,
                offset_x: current.offset_x * factor,
                offset_y: current.offset_y * factor,
            },
            frame,
        )
    }

    /// Programmatic zoom (slider, double-tap).
    pub fn set_zoom(
        &mut self,
        id: &AssetId,
        zoom: f64,
        frame: FrameSize,
    ) -> Result<CropParams, CropStoreError> {
        let current = self.current(id)?;
        self.commit(
            id,
            CropParams {
                zoom,
                ..current
            },
            frame,
        )
    }

    /// Back to the untouched fit-scale default.
    pub fn reset(&mut self, id: &AssetId, frame: FrameSize) -> Result<CropParams, CropStoreError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| CropStoreError::Uninitialized(id.clone()))?;
        entry.params = CropParams::centered(fit_scale(entry.image.as_tuple(), frame));
        entry.touched = false;
        Ok(entry.params)
    }

    /// Re-check one entry against a new frame.
    ///
    /// An untouched entry follows the new fit scale; a touched entry keeps
    /// its zoom when it still covers, and is recentered otherwise.
    pub fn revalidate(
        &mut self,
        id: &AssetId,
        frame: FrameSize,
    ) -> Result<CropParams, CropStoreError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| CropStoreError::Uninitialized(id.clone()))?;
        entry.revalidate(frame);
        tracing::debug!(%id, zoom = entry.params.zoom, "revalidated crop");
        Ok(entry.params)
    }

    pub fn revalidate_all(&mut self, frame: FrameSize) {
        for (id, entry) in &mut self.entries {
            entry.revalidate(frame);
            tracing::debug!(%id, zoom = entry.params.zoom, "revalidated crop");
        }
    }

    pub fn remove(&mut self, id: &AssetId) -> Option<CropEntry> {
        self.entries.remove(id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn current(&self, id: &AssetId) -> Result<CropParams, CropStoreError> {
        self.params(id)
            .ok_or_else(|| CropStoreError::Uninitialized(id.clone()))
    }
}
