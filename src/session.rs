//! One post-creation session.
//!
//! [`PostSession`] owns everything that lives exactly as long as one post
//! being put together: the ordered selection and its ratio lock, the crop
//! parameters per asset, the finalized bitmaps, and the stage machine that
//! says which of those may change right now. It is created on entry (after
//! the media access gate) and reset on exit; nothing is kept in globals.
//!
//! ```text
//! begin ─▶ select/deselect ─▶ open_for_adjust + gestures ─▶ finalize_all ─▶ Ready
//!              ▲                                                  │
//!              └──────────────────────── back ────────────────────┘
//! ```
//!
//! Finalization runs one asset at a time in selection order. A failure or a
//! cancellation stops the loop and leaves every asset before it finalized;
//! the stage falls back to `Selecting` so the run can be retried.

use crate::access::{AccessError, MediaAccessResolver, MediaType, ensure_access};
use crate::crop_store::{CropEntry, CropStore, CropStoreError};
use crate::imaging::operations::remove_superseded;
use crate::imaging::{
    CropParams, FinalizeError, FrameSize, ImageBackend, OutputConfig, crop_box_dimensions,
    finalize_image, materialize_video, probe_dimensions,
};
use crate::invariants::{self, InvariantViolation};
use crate::ratio::{AspectRatio, PostKind};
use crate::selection::{DeselectOutcome, SelectOutcome, Selection, SelectionError};
use crate::stage::{Stage, StageError, StageEvent, StageMachine};
use crate::types::{AssetId, FinalizedMedia, MediaKind, SourceAsset};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    CropStore(#[from] CropStoreError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Finalize(#[from] FinalizeError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("no ratio is locked; select an asset first")]
    NoRatioLock,
    #[error("finalization cancelled after {completed} of {total} assets")]
    Cancelled { completed: usize, total: usize },
}

/// Shared flag checked between assets during finalization.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Inputs fixed for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub kind: PostKind,
    /// Ratio a first selection locks to unless the picker chose another.
    pub default_ratio: AspectRatio,
    /// Space available for the crop frame, in display units.
    pub viewport: FrameSize,
    pub output: OutputConfig,
}

/// What a renderer should draw for an asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewSource<'a> {
    /// The asset has been finalized; only this bitmap may be shown.
    Finalized(&'a FinalizedMedia),
    /// Not finalized yet; the live source drives the interactive preview.
    Live(&'a SourceAsset),
}

impl PreviewSource<'_> {
    pub fn uri(&self) -> &str {
        match self {
            Self::Finalized(media) => &media.final_uri,
            Self::Live(asset) => &asset.uri,
        }
    }
}

#[derive(Debug)]
pub struct PostSession {
    settings: SessionSettings,
    selection: Selection,
    crops: CropStore,
    finalized: HashMap<AssetId, FinalizedMedia>,
    stage: StageMachine,
}

impl PostSession {
    /// Open a session behind the photo access gate.
    pub fn begin(
        resolver: &impl MediaAccessResolver,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let status = ensure_access(resolver, MediaType::Photos)?;
        tracing::info!(kind = ?settings.kind, state = ?status.state, "post session started");
        Ok(Self {
            selection: Selection::new(settings.default_ratio),
            settings,
            crops: CropStore::new(),
            finalized: HashMap::new(),
            stage: StageMachine::new(),
        })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn stage(&self) -> Stage {
        self.stage.stage()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn crops(&self) -> &CropStore {
        &self.crops
    }

    pub fn locked_ratio(&self) -> Option<AspectRatio> {
        self.selection.locked_ratio()
    }

    /// Crop frame for the current (or prospective) ratio in the viewport.
    pub fn frame(&self) -> FrameSize {
        let viewport = self.settings.viewport;
        crop_box_dimensions(
            self.selection.effective_ratio(),
            viewport.width,
            viewport.height,
        )
    }

    fn require(&self, event: StageEvent) -> Result<(), StageError> {
        if self.stage.can_transition(event) {
            Ok(())
        } else {
            Err(StageError::InvalidTransition {
                from: self.stage.stage(),
                event,
            })
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn pick_ratio(&mut self, ratio: AspectRatio) -> bool {
        self.selection.pick_ratio(ratio)
    }

    pub fn select(&mut self, asset: SourceAsset) -> Result<SelectOutcome, SessionError> {
        self.require(StageEvent::Select)?;
        let outcome = self.selection.select(asset)?;
        self.stage.transition(StageEvent::Select)?;
        Ok(outcome)
    }

    /// Remove an asset together with its crop entry and any finalized output.
    pub fn deselect(&mut self, id: &AssetId) -> Result<DeselectOutcome, SessionError> {
        if self.stage() != Stage::Selecting {
            return Err(StageError::InvalidTransition {
                from: self.stage(),
                event: StageEvent::Clear,
            }
            .into());
        }
        let outcome = self.selection.deselect(id)?;
        self.crops.remove(id);
        if let Some(previous) = self.finalized.remove(id) {
            remove_superseded(&previous);
        }
        if outcome == DeselectOutcome::Emptied {
            self.stage.transition(StageEvent::Clear)?;
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Adjusting
    // ------------------------------------------------------------------

    /// Crop entry for a selected asset, probing and initializing it at fit
    /// scale on first access.
    pub fn open_for_adjust(
        &mut self,
        backend: &impl ImageBackend,
        id: &AssetId,
    ) -> Result<CropEntry, SessionError> {
        let asset = self
            .selection
            .get(id)
            .ok_or_else(|| SelectionError::NotSelected(id.clone()))?;
        if let Some(entry) = self.crops.get(id) {
            return Ok(*entry);
        }
        let image = probe_dimensions(backend, asset)?;
        let frame = self.frame();
        Ok(self.crops.open(id, image, frame)?)
    }

    /// Write explicit parameters (restored from a saved draft, or sent by a
    /// client). They are clamped like any gesture.
    pub fn commit_crop(
        &mut self,
        id: &AssetId,
        candidate: CropParams,
    ) -> Result<CropParams, SessionError> {
        let frame = self.frame();
        Ok(self.crops.commit(id, candidate, frame)?)
    }

    pub fn pan(&mut self, id: &AssetId, dx: f64, dy: f64) -> Result<CropParams, SessionError> {
        let frame = self.frame();
        Ok(self.crops.pan(id, dx, dy, frame)?)
    }

    pub fn pinch(&mut self, id: &AssetId, factor: f64) -> Result<CropParams, SessionError> {
        let frame = self.frame();
        Ok(self.crops.pinch(id, factor, frame)?)
    }

    pub fn set_zoom(&mut self, id: &AssetId, zoom: f64) -> Result<CropParams, SessionError> {
        let frame = self.frame();
        Ok(self.crops.set_zoom(id, zoom, frame)?)
    }

    pub fn reset_crop(&mut self, id: &AssetId) -> Result<CropParams, SessionError> {
        let frame = self.frame();
        Ok(self.crops.reset(id, frame)?)
    }

    /// The viewport changed (rotation, split screen). Every stored crop is
    /// re-checked against the new frame.
    pub fn set_viewport(&mut self, viewport: FrameSize) {
        self.settings.viewport = viewport;
        let frame = self.frame();
        tracing::debug!(?viewport, ?frame, "viewport changed");
        self.crops.revalidate_all(frame);
    }

    /// Resolve what to draw for `id`.
    ///
    /// Once an asset is finalized its bitmap is the only answer; there is no
    /// fallback to the source.
    pub fn preview_source(&self, id: &AssetId) -> Result<PreviewSource<'_>, SessionError> {
        let asset = self
            .selection
            .get(id)
            .ok_or_else(|| SelectionError::NotSelected(id.clone()))?;
        let finalized = self.finalized.get(id);
        let source = match finalized {
            Some(media) => PreviewSource::Finalized(media),
            None => PreviewSource::Live(asset),
        };
        invariants::check_preview(id, source.uri(), finalized)?;
        Ok(source)
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    pub fn finalized(&self, id: &AssetId) -> Option<&FinalizedMedia> {
        self.finalized.get(id)
    }

    /// Finalized items for the current selection, in selection order.
    pub fn finalized_in_order(&self) -> Vec<FinalizedMedia> {
        self.selection
            .assets()
            .iter()
            .filter_map(|a| self.finalized.get(&a.id).cloned())
            .collect()
    }

    /// Render every selected asset, then run the pre-navigation check.
    ///
    /// On success the session is `Ready` and the finalized items are returned
    /// in selection order. On failure or cancellation the session is back in
    /// `Selecting`, with the assets processed before the failing one kept.
    /// Earlier renders of the assets this run did not reach are discarded.
    pub fn finalize_all(
        &mut self,
        backend: &impl ImageBackend,
        cancel: &CancelToken,
    ) -> Result<Vec<FinalizedMedia>, SessionError> {
        self.require(StageEvent::Advance)?;
        let ratio = self.locked_ratio().ok_or(SessionError::NoRatioLock)?;
        self.stage.transition(StageEvent::Advance)?;

        match self.run_finalization(backend, ratio, cancel) {
            Ok(media) => {
                self.stage.transition(StageEvent::Finalized)?;
                tracing::info!(count = media.len(), %ratio, "post finalized");
                Ok(media)
            }
            Err(err) => {
                tracing::error!(error = %err, "finalization stopped");
                self.stage.transition(StageEvent::Back)?;
                Err(err)
            }
        }
    }

    fn run_finalization(
        &mut self,
        backend: &impl ImageBackend,
        ratio: AspectRatio,
        cancel: &CancelToken,
    ) -> Result<Vec<FinalizedMedia>, SessionError> {
        // Every asset is pending until this run renders it again.
        let mut previous = std::mem::take(&mut self.finalized);
        let rendered = self.render_in_order(backend, ratio, cancel, &mut previous);
        for stale in previous.values() {
            tracing::debug!(id = %stale.id, "dropping render not reached by this run");
            remove_superseded(stale);
        }
        rendered?;

        let media = self.finalized_in_order();
        invariants::check_navigation(self.selection.assets(), &media, Some(ratio))?;
        Ok(media)
    }

    fn render_in_order(
        &mut self,
        backend: &impl ImageBackend,
        ratio: AspectRatio,
        cancel: &CancelToken,
        previous: &mut HashMap<AssetId, FinalizedMedia>,
    ) -> Result<(), SessionError> {
        let assets = self.selection.assets().to_vec();
        let total = assets.len();
        for (completed, asset) in assets.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(SessionError::Cancelled { completed, total });
            }
            let media = self.finalize_one(backend, asset, ratio)?;
            if let Some(old) = previous.remove(&asset.id)
                && old.final_uri != media.final_uri
            {
                remove_superseded(&old);
            }
            self.finalized.insert(asset.id.clone(), media);
        }
        Ok(())
    }

    fn finalize_one(
        &mut self,
        backend: &impl ImageBackend,
        asset: &SourceAsset,
        ratio: AspectRatio,
    ) -> Result<FinalizedMedia, SessionError> {
        if asset.kind == MediaKind::Video {
            return Ok(materialize_video(asset, ratio, &self.settings.output)?);
        }
        let frame = self.frame();
        let entry = match self.crops.get(&asset.id) {
            Some(entry) => *entry,
            None => {
                let image = probe_dimensions(backend, asset)?;
                self.crops.open(&asset.id, image, frame)?
            }
        };
        Ok(finalize_image(
            backend,
            asset,
            entry.image,
            entry.params,
            frame,
            ratio,
            &self.settings.output,
        )?)
    }

    /// Return from `Ready` (or an interrupted run) to editing.
    pub fn back(&mut self) -> Result<Stage, SessionError> {
        Ok(self.stage.transition(StageEvent::Back)?)
    }

    /// Pre-navigation check on the current state.
    pub fn check_navigation(&self) -> Result<Vec<FinalizedMedia>, InvariantViolation> {
        let media = self.finalized_in_order();
        invariants::check_navigation(self.selection.assets(), &media, self.locked_ratio())?;
        Ok(media)
    }

    /// Mark the post as handed to the uploader and drop its state.
    pub(crate) fn complete_submission(&mut self) -> Result<(), SessionError> {
        self.stage.transition(StageEvent::Submit)?;
        self.clear_state();
        Ok(())
    }

    /// Abandon the post. Finalized files stay on disk for pruning.
    pub fn reset(&mut self) {
        if let Err(err) = self.stage.transition(StageEvent::Reset) {
            tracing::warn!(%err, "reset transition rejected");
        }
        self.clear_state();
    }

    fn clear_state(&mut self) {
        self.selection.clear();
        self.crops.clear();
        self.finalized.clear();
    }
}
