//! # Postframe
//!
//! The crop/adjust pipeline behind a multi-image post: pan and zoom each
//! picked photo inside a crop frame, lock the whole post to one aspect ratio,
//! render every photo to a new JPEG at the ratio's fixed size, and refuse to
//! let anything but those rendered files through to upload.
//!
//! # Architecture: Select → Adjust → Finalize → Hand off
//!
//! ```text
//! 1. Select     picked assets    →  Selection (≤ 5, ratio locked on first pick)
//! 2. Adjust     gestures         →  CropStore (zoom/offset per asset, always clamped)
//! 3. Finalize   asset + crop     →  FinalizedMedia (new local JPEG per asset)
//! 4. Hand off   finalized media  →  invariant checks → uploader
//! ```
//!
//! A [`session::PostSession`] threads all four through one explicit value
//! whose lifetime is one post. Geometry is pure and lives in
//! [`imaging::geometry`]; pixel work sits behind the
//! [`imaging::ImageBackend`] trait so everything above it can be tested with
//! a mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ratio`] | The three allowed aspect ratios and their fixed output sizes |
//! | [`types`] | `SourceAsset`, `FinalizedMedia` and friends, shared across stages |
//! | [`uri`] | Local file vs gallery handle vs remote URL classification |
//! | [`imaging`] | Crop geometry, the backend trait, the `image`-crate backend, single-asset finalization |
//! | [`selection`] | Ordered selection with the post-wide ratio lock |
//! | [`crop_store`] | Per-asset zoom/offset with lazy fit-scale defaults |
//! | [`stage`] | Explicit stage machine for a session |
//! | [`access`] | Media access gate |
//! | [`session`] | One post-creation session; sequential finalization |
//! | [`invariants`] | Pre-preview, pre-navigation and pre-upload checks |
//! | [`upload`] | The upload boundary |
//! | [`process`] | JSON request → finalized manifest, used by the CLI |
//! | [`config`] | Layered `config.toml` loading and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fit Scale First, Cover Scale on Touch
//!
//! A freshly opened asset shows the whole image (fit scale), margins and all.
//! The first gesture clamps the zoom up to the cover scale, so from then on
//! the frame never shows anything outside the photo. Stored parameters are
//! always clamped; there is no "uninitialized" zoom value, only a missing
//! entry.
//!
//! ## No Fallback to the Source
//!
//! Finalization either produces a new file or fails. A degenerate crop, an
//! unreadable source or a backend that reports success without writing are
//! all errors; the unmodified source is never substituted. A renderer asks
//! the session what to draw and gets either the finalized file or, before
//! finalization, the live source. Never both.
//!
//! ## Sequential Finalization
//!
//! Assets are rendered one at a time in selection order. A failure leaves a
//! clean prefix finalized and the rest pending, which is easy to retry and
//! easy to reason about.
//!
//! ## Atomic Writes
//!
//! Outputs are written to `<name>.part` and renamed into place. The checks
//! treat `.part`, missing and empty files as not rendered.

pub mod access;
pub mod config;
pub mod crop_store;
pub mod imaging;
pub mod invariants;
pub mod logging;
pub mod output;
pub mod process;
pub mod ratio;
pub mod selection;
pub mod session;
pub mod stage;
pub mod types;
pub mod upload;
pub mod uri;

#[cfg(test)]
pub(crate) mod test_helpers;
