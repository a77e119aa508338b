//! The finalization step: source asset + crop parameters → one rendered file.
//!
//! Combines the [geometry](super::geometry) with an [`ImageBackend`] to
//! produce a [`FinalizedMedia`]. The output is always a new local file in the
//! configured output directory; on any failure the caller gets an error,
//! never the untouched source as a stand-in.
//!
//! Output names are deterministic for identical input:
//!
//! ```text
//! <asset-id>-<ratio>-<hash12>.jpg
//! IMG_0042-4x5-3fa9c2e01b7d.jpg
//! ```
//!
//! where the hash covers the source URI, crop rectangle, output size and
//! quality, so a changed crop never reuses the name of a stale render.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::geometry::{CropParams, FrameSize, compute_crop_rect};
use super::params::{CropRect, CropResizeParams, Quality};
use super::rust_backend::partial_path;
use crate::ratio::{AspectRatio, OutputSize};
use crate::types::{AssetId, FinalizedMedia, MediaKind, SourceAsset};
use crate::uri;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinalizeError {
    #[error("asset {id}: source {uri} is not a readable local file ({kind})")]
    SourceNotLocal {
        id: AssetId,
        uri: String,
        kind: String,
    },
    #[error("asset {id}: source image has zero width or height")]
    EmptyImage { id: AssetId },
    #[error("asset {id}: degenerate crop rectangle {rect:?}")]
    DegenerateCrop { id: AssetId, rect: CropRect },
    #[error("asset {id}: output {path} would alias the source")]
    OutputAliasesSource { id: AssetId, path: PathBuf },
    #[error("asset {id}: backend reported success but produced no output at {path}")]
    MissingOutput { id: AssetId, path: PathBuf },
    #[error("asset {id}: {source}")]
    Backend {
        id: AssetId,
        #[source]
        source: BackendError,
    },
    #[error(transparent)]
    Uri(#[from] uri::UriError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FinalizeError {
    /// Asset the failure belongs to, if any.
    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            Self::SourceNotLocal { id, .. }
            | Self::EmptyImage { id }
            | Self::DegenerateCrop { id, .. }
            | Self::OutputAliasesSource { id, .. }
            | Self::MissingOutput { id, .. }
            | Self::Backend { id, .. } => Some(id),
            Self::Uri(_) | Self::Io(_) => None,
        }
    }
}

/// Where and how finalized files are written.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub quality: Quality,
}

impl OutputConfig {
    /// The output directory as an absolute path, created if missing.
    fn prepare_dir(&self) -> Result<PathBuf, FinalizeError> {
        let dir = std::path::absolute(&self.dir)?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Resolve an asset's source to a path the backend can read.
pub fn source_path(asset: &SourceAsset) -> Result<PathBuf, FinalizeError> {
    match uri::classify(&asset.uri) {
        uri::UriKind::LocalFile(path) => Ok(path),
        other => Err(FinalizeError::SourceNotLocal {
            id: asset.id.clone(),
            uri: asset.uri.clone(),
            kind: other.describe(),
        }),
    }
}

/// Probe the source's pixel dimensions.
///
/// An unreadable source is an error; no default size is ever substituted.
pub fn probe_dimensions(
    backend: &impl ImageBackend,
    asset: &SourceAsset,
) -> Result<Dimensions, FinalizeError> {
    let path = source_path(asset)?;
    let dims = backend
        .identify(&path)
        .map_err(|source| FinalizeError::Backend {
            id: asset.id.clone(),
            source,
        })?;
    if dims.width == 0 || dims.height == 0 {
        return Err(FinalizeError::EmptyImage {
            id: asset.id.clone(),
        });
    }
    Ok(dims)
}

/// Deterministic output file name for a render.
pub fn output_name(
    asset: &SourceAsset,
    ratio: AspectRatio,
    rect: CropRect,
    target: OutputSize,
    quality: Quality,
    extension: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(asset.uri.as_bytes());
    hasher.update(b"\0");
    for v in [
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        target.width,
        target.height,
        quality.value(),
    ] {
        hasher.update(v.to_le_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    format!(
        "{}-{}-{}.{}",
        asset.id.file_stem(),
        ratio.file_tag(),
        &digest[..12],
        extension
    )
}

fn verify_output(id: &AssetId, path: &Path) -> Result<(), FinalizeError> {
    let written = std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if written {
        Ok(())
    } else {
        Err(FinalizeError::MissingOutput {
            id: id.clone(),
            path: path.to_path_buf(),
        })
    }
}

/// Render one image asset.
///
/// `image` must be the *source* resolution (from [`probe_dimensions`]), not
/// the displayed size. The crop rectangle is computed against it and handed
/// to the backend together with the ratio's fixed output size.
pub fn finalize_image(
    backend: &impl ImageBackend,
    asset: &SourceAsset,
    image: Dimensions,
    params: CropParams,
    frame: FrameSize,
    ratio: AspectRatio,
    output: &OutputConfig,
) -> Result<FinalizedMedia, FinalizeError> {
    let source = source_path(asset)?;
    if image.width == 0 || image.height == 0 {
        return Err(FinalizeError::EmptyImage {
            id: asset.id.clone(),
        });
    }

    let rect = compute_crop_rect(image.as_tuple(), params, frame, ratio);
    if rect.is_empty() || !rect.fits_within(image.as_tuple()) {
        return Err(FinalizeError::DegenerateCrop {
            id: asset.id.clone(),
            rect,
        });
    }

    let target = ratio.output_size();
    let out_path = output
        .prepare_dir()?
        .join(output_name(asset, ratio, rect, target, output.quality, "jpg"));
    if uri::aliases(&out_path.display().to_string(), &asset.uri) {
        return Err(FinalizeError::OutputAliasesSource {
            id: asset.id.clone(),
            path: out_path,
        });
    }

    tracing::debug!(id = %asset.id, ?rect, ?target, "cropping");
    backend
        .crop_resize(&CropResizeParams {
            source,
            output: out_path.clone(),
            rect,
            target,
            quality: output.quality,
        })
        .map_err(|source| FinalizeError::Backend {
            id: asset.id.clone(),
            source,
        })?;
    verify_output(&asset.id, &out_path)?;

    tracing::info!(id = %asset.id, output = %out_path.display(), %ratio, "finalized image");
    Ok(FinalizedMedia {
        id: asset.id.clone(),
        final_uri: uri::file_uri(&out_path)?,
        ratio,
        kind: MediaKind::Image,
    })
}

/// Materialize a video asset as a local copy under a fresh name.
///
/// Videos are not cropped; they still leave the adjust stage only as a file
/// owned by the output directory, never as the picker's reference.
pub fn materialize_video(
    asset: &SourceAsset,
    ratio: AspectRatio,
    output: &OutputConfig,
) -> Result<FinalizedMedia, FinalizeError> {
    let source = source_path(asset)?;
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4")
        .to_ascii_lowercase();

    let dir = output.prepare_dir()?;
    let name = output_name(
        asset,
        ratio,
        CropRect::default(),
        ratio.output_size(),
        output.quality,
        &extension,
    );
    let out_path = dir.join(name);
    if uri::aliases(&out_path.display().to_string(), &asset.uri) {
        return Err(FinalizeError::OutputAliasesSource {
            id: asset.id.clone(),
            path: out_path,
        });
    }

    let partial = partial_path(&out_path);
    std::fs::copy(&source, &partial).map_err(|e| FinalizeError::Backend {
        id: asset.id.clone(),
        source: BackendError::Io(e),
    })?;
    std::fs::rename(&partial, &out_path)?;
    verify_output(&asset.id, &out_path)?;

    tracing::info!(id = %asset.id, output = %out_path.display(), "materialized video");
    Ok(FinalizedMedia {
        id: asset.id.clone(),
        final_uri: uri::file_uri(&out_path)?,
        ratio,
        kind: MediaKind::Video,
    })
}

/// Best-effort removal of a superseded render.
pub fn remove_superseded(previous: &FinalizedMedia) {
    let Some(path) = uri::local_path(&previous.final_uri) else {
        return;
    };
    match std::fs::remove_file(&path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed superseded output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(
            path = %path.display(),
            ?err,
            "failed to remove superseded output"
        ),
    }
}

/// Delete files in `dir` that are not in `keep`, including abandoned `.part` files.
///
/// Returns the number of files removed. A missing directory is not an error.
pub fn prune_outputs(dir: &Path, keep: &[PathBuf]) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    // Finalized URIs carry absolute paths; compare like with like.
    let dir = std::path::absolute(dir)?;
    let keep = keep
        .iter()
        .map(std::path::absolute)
        .collect::<std::io::Result<Vec<_>>>()?;
    let mut removed = 0;
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if !path.is_file() || keep.iter().any(|k| k == &path) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => tracing::warn!(path = %path.display(), ?err, "failed to prune output"),
        }
    }
    Ok(removed)
}
