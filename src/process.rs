//! Batch finalization.
//!
//! Drives a whole post through a [`PostSession`] from a JSON request and
//! produces a JSON manifest of the finalized bitmaps. This is what the
//! `finalize` CLI command runs, and what a client without its own session
//! state would call.
//!
//! ## Request
//!
//! ```json
//! {
//!   "kind": "photo",
//!   "ratio": "4:5",
//!   "viewport": { "width": 390.0, "height": 390.0 },
//!   "assets": [
//!     { "id": "IMG_0042", "uri": "/photos/IMG_0042.jpg" },
//!     { "id": "IMG_0043", "uri": "/photos/IMG_0043.jpg",
//!       "crop": { "zoom": 0.4, "offset_x": -20.0, "offset_y": 0.0 } }
//!   ]
//! }
//! ```
//!
//! `kind`, `ratio` and `viewport` are optional; without them the config
//! decides. Assets without `crop` are finalized at the fit-scale default.
//! Crop offsets are in display units of the crop frame the viewport yields.
//!
//! ## Manifest
//!
//! ```json
//! {
//!   "kind": "photo",
//!   "ratio": "4:5",
//!   "frame": { "width": 312.0, "height": 390.0 },
//!   "sources": [ ... ],
//!   "media": [
//!     { "id": "IMG_0042", "final_uri": "file:///work/finalized/IMG_0042-4x5-3fa9c2e01b7d.jpg",
//!       "ratio": "4:5", "type": "image" }
//!   ]
//! }
//! ```
//!
//! Assets are processed sequentially in request order. The first failure
//! aborts the batch; no manifest is written for a partial run.

use crate::access::MediaAccessResolver;
use crate::imaging::operations::prune_outputs;
use crate::imaging::{
    CropParams, CropRect, Dimensions, FrameSize, ImageBackend, RustBackend, clamp_params,
    compute_crop_rect, crop_box_dimensions, fit_scale, min_cover_scale,
};
use crate::invariants::{self, InvariantViolation};
use crate::ratio::{AspectRatio, OutputSize, PostKind};
use crate::session::{CancelToken, PostSession, SessionError, SessionSettings};
use crate::types::{AssetId, FinalizedMedia, MediaKind, SourceAsset};
use crate::uri;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("request contains no assets")]
    EmptyRequest,
    #[error("asset {0} is a video; videos are not cropped")]
    VideoCrop(AssetId),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub kind: PostKind,
    /// Ratio picked before the first selection.
    #[serde(default)]
    pub ratio: Option<AspectRatio>,
    #[serde(default)]
    pub viewport: Option<FrameSize>,
    pub assets: Vec<RequestAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestAsset {
    #[serde(flatten)]
    pub asset: SourceAsset,
    #[serde(default)]
    pub crop: Option<CropParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedManifest {
    pub kind: PostKind,
    pub ratio: AspectRatio,
    /// Crop frame the parameters were interpreted against.
    pub frame: FrameSize,
    /// Selected assets, in selection order.
    pub sources: Vec<SourceAsset>,
    /// One finalized item per source, same order.
    pub media: Vec<FinalizedMedia>,
}

pub fn load_request(path: &Path) -> Result<FinalizeRequest, ProcessError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn load_manifest(path: &Path) -> Result<FinalizedManifest, ProcessError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_manifest(path: &Path, manifest: &FinalizedManifest) -> Result<(), ProcessError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(manifest)?)?;
    Ok(())
}

pub fn process(
    resolver: &impl MediaAccessResolver,
    request: &FinalizeRequest,
    settings: SessionSettings,
    cancel: &CancelToken,
) -> Result<FinalizedManifest, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(&backend, resolver, request, settings, cancel)
}

/// Finalize a request using a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    resolver: &impl MediaAccessResolver,
    request: &FinalizeRequest,
    mut settings: SessionSettings,
    cancel: &CancelToken,
) -> Result<FinalizedManifest, ProcessError> {
    if request.assets.is_empty() {
        return Err(ProcessError::EmptyRequest);
    }
    if let Some(video) = request
        .assets
        .iter()
        .find(|item| item.asset.kind == MediaKind::Video && item.crop.is_some())
    {
        return Err(ProcessError::VideoCrop(video.asset.id.clone()));
    }
    // Settings built for another post kind carry that kind's ratio default.
    if settings.kind != request.kind {
        tracing::debug!(from = ?settings.kind, to = ?request.kind, "post kind taken from request");
        settings.kind = request.kind;
        settings.default_ratio = request.kind.default_ratio();
    }
    if let Some(viewport) = request.viewport {
        settings.viewport = viewport;
    }

    let mut session = PostSession::begin(resolver, settings)?;
    if let Some(ratio) = request.ratio {
        session.pick_ratio(ratio);
    }
    for item in &request.assets {
        session.select(item.asset.clone())?;
    }
    for item in &request.assets {
        if let Some(crop) = item.crop {
            session.open_for_adjust(backend, &item.asset.id)?;
            let applied = session.commit_crop(&item.asset.id, crop)?;
            if applied != crop {
                tracing::debug!(id = %item.asset.id, ?crop, ?applied, "requested crop clamped");
            }
        }
    }

    let media = session.finalize_all(backend, cancel)?;
    let ratio = session
        .locked_ratio()
        .ok_or(SessionError::NoRatioLock)?;
    Ok(FinalizedManifest {
        kind: request.kind,
        ratio,
        frame: session.frame(),
        sources: session.selection().assets().to_vec(),
        media,
    })
}

/// Geometry of one crop, computed without touching any pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropPlan {
    pub image: Dimensions,
    pub ratio: AspectRatio,
    pub frame: FrameSize,
    pub fit_scale: f64,
    pub cover_scale: f64,
    /// Parameters as requested, if any.
    pub requested: Option<CropParams>,
    /// Parameters after clamping; the fit-scale default when none were requested.
    pub params: CropParams,
    pub rect: CropRect,
    pub output: OutputSize,
}

/// Dry run of the crop math for the `plan` command.
pub fn plan_crop(
    image: Dimensions,
    viewport: FrameSize,
    ratio: AspectRatio,
    requested: Option<CropParams>,
) -> CropPlan {
    let dims = image.as_tuple();
    let frame = crop_box_dimensions(ratio, viewport.width, viewport.height);
    let fit = fit_scale(dims, frame);
    let params = match requested {
        Some(candidate) => clamp_params(candidate, dims, frame),
        None => CropParams::centered(fit),
    };
    CropPlan {
        image,
        ratio,
        frame,
        fit_scale: fit,
        cover_scale: min_cover_scale(dims, frame),
        requested,
        params,
        rect: compute_crop_rect(dims, params, frame, ratio),
        output: ratio.output_size(),
    }
}

/// Pre-navigation check on a manifest, plus the pre-upload check when a user
/// is given.
pub fn check_manifest(
    manifest: &FinalizedManifest,
    user_id: Option<&str>,
) -> Result<(), InvariantViolation> {
    let ratio = Some(manifest.ratio);
    invariants::check_navigation(&manifest.sources, &manifest.media, ratio)?;
    if let Some(user) = user_id {
        invariants::check_upload(user, &manifest.sources, &manifest.media, ratio)?;
    }
    Ok(())
}

/// Remove files in `dir` that `manifest` does not reference.
pub fn prune_unreferenced(dir: &Path, manifest: &FinalizedManifest) -> std::io::Result<usize> {
    let keep: Vec<PathBuf> = manifest
        .media
        .iter()
        .filter_map(|m| uri::local_path(&m.final_uri))
        .collect();
    let removed = prune_outputs(dir, &keep)?;
    if removed > 0 {
        tracing::info!(dir = %dir.display(), removed, "pruned stale outputs");
    }
    Ok(removed)
}
