//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every finalized asset leads with its position in the post and its id;
//! file locations follow as indented context lines. The numbers match the
//! selection badges a user saw while picking.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! Image 2000×1000, 4:5 frame 1080×1350
//!     Fit scale: 0.5400
//!     Cover scale: 1.3500
//!     Zoom: 0.5400, offset (0.0, 0.0)
//!     Crop: 800×1000 at (600, 0) → 1080×1350
//! ```
//!
//! ## Finalize
//!
//! ```text
//! Finalized 2 assets at 4:5 (1080×1350)
//! 001 IMG_0042
//!     Source: /photos/IMG_0042.jpg
//!     Final: /work/finalized/IMG_0042-4x5-3fa9c2e01b7d.jpg
//! 002 IMG_0043
//!     ...
//! ```
//!
//! ## Check
//!
//! ```text
//! pre-navigation: ok (2 assets)
//! pre-upload: ok (user alice)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::invariants::InvariantViolation;
use crate::process::{CropPlan, FinalizedManifest};
use crate::uri;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Prefer a plain path for local file URIs.
fn display_uri(raw: &str) -> String {
    uri::local_path(raw)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// plan
// ============================================================================

pub fn format_plan(plan: &CropPlan) -> Vec<String> {
    let mut lines = vec![format!(
        "Image {}\u{d7}{}, {} frame {}\u{d7}{}",
        plan.image.width, plan.image.height, plan.ratio, plan.frame.width, plan.frame.height
    )];
    lines.push(format!("{}Fit scale: {:.4}", indent(1), plan.fit_scale));
    lines.push(format!("{}Cover scale: {:.4}", indent(1), plan.cover_scale));
    if let Some(req) = plan.requested
        && req != plan.params
    {
        lines.push(format!(
            "{}Requested: zoom {:.4}, offset ({:.1}, {:.1})",
            indent(1),
            req.zoom,
            req.offset_x,
            req.offset_y
        ));
    }
    lines.push(format!(
        "{}Zoom: {:.4}, offset ({:.1}, {:.1})",
        indent(1),
        plan.params.zoom,
        plan.params.offset_x,
        plan.params.offset_y
    ));
    if plan.rect.is_empty() {
        lines.push(format!("{}Crop: empty (nothing to render)", indent(1)));
    } else {
        lines.push(format!(
            "{}Crop: {}\u{d7}{} at ({}, {}) \u{2192} {}\u{d7}{}",
            indent(1),
            plan.rect.width,
            plan.rect.height,
            plan.rect.x,
            plan.rect.y,
            plan.output.width,
            plan.output.height
        ));
    }
    lines
}

pub fn print_plan(plan: &CropPlan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

// ============================================================================
// finalize
// ============================================================================

pub fn format_finalize(manifest: &FinalizedManifest) -> Vec<String> {
    let size = manifest.ratio.output_size();
    let mut lines = vec![format!(
        "Finalized {} at {} ({}\u{d7}{})",
        plural(manifest.media.len(), "asset"),
        manifest.ratio,
        size.width,
        size.height
    )];
    for (i, media) in manifest.media.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), media.id));
        if let Some(source) = manifest.sources.iter().find(|s| s.id == media.id) {
            lines.push(format!("{}Source: {}", indent(1), display_uri(&source.uri)));
        }
        lines.push(format!("{}Final: {}", indent(1), display_uri(&media.final_uri)));
    }
    lines
}

pub fn print_finalize(manifest: &FinalizedManifest) {
    for line in format_finalize(manifest) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

/// Result lines for `check`. `user` is `Some` when the pre-upload check ran.
pub fn format_check(
    manifest: &FinalizedManifest,
    user: Option<&str>,
    result: &Result<(), InvariantViolation>,
) -> Vec<String> {
    match result {
        Ok(()) => {
            let mut lines = vec![format!(
                "pre-navigation: ok ({})",
                plural(manifest.media.len(), "asset")
            )];
            if let Some(user) = user {
                lines.push(format!("pre-upload: ok (user {})", user));
            }
            lines
        }
        Err(violation) => vec![format!("FAILED {}", violation)],
    }
}

pub fn print_check(
    manifest: &FinalizedManifest,
    user: Option<&str>,
    result: &Result<(), InvariantViolation>,
) {
    for line in format_check(manifest, user, result) {
        println!("{}", line);
    }
}
