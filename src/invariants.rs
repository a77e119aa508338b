//! Hand-off checks between pipeline stages.
//!
//! Three checkpoints guard every place a URI changes hands:
//!
//! | Checkpoint | When | What must hold |
//! |---|---|---|
//! | [`Checkpoint::PrePreview`] | before a renderer draws an asset | a finalized asset is drawn from its `final_uri`, never its source |
//! | [`Checkpoint::PreNavigation`] | before leaving the adjust stage | one valid finalized bitmap per selected asset, nothing extra |
//! | [`Checkpoint::PreUpload`] | right before the upload call | the navigation check again, plus a non-empty acting user |
//!
//! A valid finalized bitmap has a non-empty `final_uri` that is a local file
//! (not a gallery handle, not a remote URL), does not alias any source URI,
//! exists on disk with content, and is not an in-flight `.part` file.
//!
//! Checks are pure validation: they read file metadata but never change
//! anything, and running them twice gives the same answer. Violations are
//! returned as errors and logged; nothing is repaired.

use crate::imaging::rust_backend::PARTIAL_SUFFIX;
use crate::ratio::AspectRatio;
use crate::types::{AssetId, FinalizedMedia, SourceAsset};
use crate::uri::{self, UriKind};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    PrePreview,
    PreNavigation,
    PreUpload,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PrePreview => "pre-preview",
            Self::PreNavigation => "pre-navigation",
            Self::PreUpload => "pre-upload",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{checkpoint}: asset {id} rendered from {rendered} but finalized to {final_uri}")]
    StalePreview {
        checkpoint: Checkpoint,
        id: AssetId,
        rendered: String,
        final_uri: String,
    },
    #[error("{checkpoint}: asset {id} has no finalized bitmap")]
    NotFinalized { checkpoint: Checkpoint, id: AssetId },
    #[error("{checkpoint}: asset {id} has an empty final uri")]
    EmptyUri { checkpoint: Checkpoint, id: AssetId },
    #[error("{checkpoint}: asset {id} final uri {uri} is a {kind}, not a local file")]
    NotLocal {
        checkpoint: Checkpoint,
        id: AssetId,
        uri: String,
        kind: String,
    },
    #[error("{checkpoint}: asset {id} final uri {uri} aliases a source asset")]
    AliasesSource {
        checkpoint: Checkpoint,
        id: AssetId,
        uri: String,
    },
    #[error("{checkpoint}: asset {id} final file {path} is missing, empty or incomplete")]
    Unmaterialized {
        checkpoint: Checkpoint,
        id: AssetId,
        path: String,
    },
    #[error("{checkpoint}: asset {id} finalized for {found}, post is locked to {expected}")]
    RatioMismatch {
        checkpoint: Checkpoint,
        id: AssetId,
        found: AspectRatio,
        expected: AspectRatio,
    },
    #[error("{checkpoint}: assets {first} and {second} share final uri {uri}")]
    SharedUri {
        checkpoint: Checkpoint,
        first: AssetId,
        second: AssetId,
        uri: String,
    },
    #[error("{checkpoint}: finalized item {id} is not part of the selection")]
    NotSelected { checkpoint: Checkpoint, id: AssetId },
    #[error("{checkpoint}: {finalized} finalized items for {selected} selected assets")]
    CountMismatch {
        checkpoint: Checkpoint,
        selected: usize,
        finalized: usize,
    },
    #[error("{checkpoint}: acting user identity is missing")]
    MissingUser { checkpoint: Checkpoint },
}

fn report(violation: InvariantViolation) -> InvariantViolation {
    tracing::error!(%violation, "invariant violation");
    violation
}

fn is_materialized(path: &Path) -> bool {
    let partial = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PARTIAL_SUFFIX));
    !partial
        && std::fs::metadata(path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
}

/// Validate a single finalized item against every known source URI.
pub fn check_final_uri(
    checkpoint: Checkpoint,
    media: &FinalizedMedia,
    sources: &[SourceAsset],
) -> Result<(), InvariantViolation> {
    let id = || media.id.clone();
    if media.final_uri.trim().is_empty() {
        return Err(report(InvariantViolation::EmptyUri {
            checkpoint,
            id: id(),
        }));
    }
    let path = match uri::classify(&media.final_uri) {
        UriKind::LocalFile(path) => path,
        other => {
            return Err(report(InvariantViolation::NotLocal {
                checkpoint,
                id: id(),
                uri: media.final_uri.clone(),
                kind: other.describe(),
            }));
        }
    };
    if sources
        .iter()
        .any(|s| uri::aliases(&s.uri, &media.final_uri))
    {
        return Err(report(InvariantViolation::AliasesSource {
            checkpoint,
            id: id(),
            uri: media.final_uri.clone(),
        }));
    }
    if !is_materialized(&path) {
        return Err(report(InvariantViolation::Unmaterialized {
            checkpoint,
            id: id(),
            path: path.display().to_string(),
        }));
    }
    Ok(())
}

/// Checkpoint 1: the URI a renderer is about to draw for `id`.
///
/// Before finalization the source URI is the only thing there is to draw.
/// Once `id` has a finalized item, only its `final_uri` is acceptable.
pub fn check_preview(
    id: &AssetId,
    rendered: &str,
    finalized: Option<&FinalizedMedia>,
) -> Result<(), InvariantViolation> {
    match finalized {
        Some(media) if !uri::aliases(rendered, &media.final_uri) => {
            Err(report(InvariantViolation::StalePreview {
                checkpoint: Checkpoint::PrePreview,
                id: id.clone(),
                rendered: rendered.to_string(),
                final_uri: media.final_uri.clone(),
            }))
        }
        _ => Ok(()),
    }
}

fn check_handoff(
    checkpoint: Checkpoint,
    selected: &[SourceAsset],
    finalized: &[FinalizedMedia],
    ratio: Option<AspectRatio>,
) -> Result<(), InvariantViolation> {
    let by_id: HashMap<&AssetId, &FinalizedMedia> =
        finalized.iter().map(|m| (&m.id, m)).collect();

    for asset in selected {
        let media = by_id.get(&asset.id).ok_or_else(|| {
            report(InvariantViolation::NotFinalized {
                checkpoint,
                id: asset.id.clone(),
            })
        })?;
        check_final_uri(checkpoint, media, selected)?;
        if let Some(expected) = ratio
            && media.ratio != expected
        {
            return Err(report(InvariantViolation::RatioMismatch {
                checkpoint,
                id: asset.id.clone(),
                found: media.ratio,
                expected,
            }));
        }
    }

    for media in finalized {
        if !selected.iter().any(|a| a.id == media.id) {
            return Err(report(InvariantViolation::NotSelected {
                checkpoint,
                id: media.id.clone(),
            }));
        }
    }

    if finalized.len() != selected.len() {
        return Err(report(InvariantViolation::CountMismatch {
            checkpoint,
            selected: selected.len(),
            finalized: finalized.len(),
        }));
    }

    for (i, a) in finalized.iter().enumerate() {
        if let Some(b) = finalized[i + 1..]
            .iter()
            .find(|b| uri::aliases(&a.final_uri, &b.final_uri))
        {
            return Err(report(InvariantViolation::SharedUri {
                checkpoint,
                first: a.id.clone(),
                second: b.id.clone(),
                uri: a.final_uri.clone(),
            }));
        }
    }
    Ok(())
}

/// Checkpoint 2: leaving the adjust stage.
pub fn check_navigation(
    selected: &[SourceAsset],
    finalized: &[FinalizedMedia],
    ratio: Option<AspectRatio>,
) -> Result<(), InvariantViolation> {
    check_handoff(Checkpoint::PreNavigation, selected, finalized, ratio)
}

/// Checkpoint 3: immediately before handing URIs to the uploader.
pub fn check_upload(
    user_id: &str,
    selected: &[SourceAsset],
    finalized: &[FinalizedMedia],
    ratio: Option<AspectRatio>,
) -> Result<(), InvariantViolation> {
    if user_id.trim().is_empty() {
        return Err(report(InvariantViolation::MissingUser {
            checkpoint: Checkpoint::PreUpload,
        }));
    }
    check_handoff(Checkpoint::PreUpload, selected, finalized, ratio)
}
