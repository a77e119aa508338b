//! Shared test utilities.
//!
//! Builds small real JPEG fixtures and ready-to-use sessions inside a
//! [`TempDir`], so tests never depend on files checked into the repo.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let mut session = session_in(&tmp);
//! session.select(local_source(&tmp, "IMG_0001")).unwrap();
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::access::tests::ScriptedAccess;
use crate::imaging::{FrameSize, OutputConfig, Quality};
use crate::ratio::{AspectRatio, PostKind};
use crate::session::{PostSession, SessionSettings};
use crate::types::SourceAsset;

// =========================================================================
// Fixture files
// =========================================================================

/// Write a `width`×`height` JPEG with a horizontal gradient.
///
/// The gradient makes crops distinguishable: the left edge is dark, the
/// right edge bright.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        let v = (x * 255 / width.max(1)) as u8;
        image::Rgb([v, v, (y * 255 / height.max(1)) as u8])
    });
    img.save(path).unwrap();
}

/// A small real JPEG at `<tmp>/<id>.jpg`, as a picked image asset.
pub fn local_source(tmp: &TempDir, id: &str) -> SourceAsset {
    let path = tmp.path().join(format!("{id}.jpg"));
    write_test_jpeg(&path, 40, 20);
    SourceAsset::image(id, path.display().to_string()).with_size(40, 20)
}

// =========================================================================
// Sessions
// =========================================================================

/// Settings for a photo post writing into `<tmp>/finalized`.
pub fn settings_in(tmp: &TempDir) -> SessionSettings {
    SessionSettings {
        kind: PostKind::Photo,
        default_ratio: AspectRatio::Portrait,
        viewport: FrameSize::new(390.0, 390.0),
        output: OutputConfig {
            dir: tmp.path().join("finalized"),
            quality: Quality::default(),
        },
    }
}

/// A fresh photo session with access granted.
pub fn session_in(tmp: &TempDir) -> PostSession {
    PostSession::begin(&ScriptedAccess::granted(), settings_in(tmp)).unwrap()
}
