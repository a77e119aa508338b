//! The three frame shapes a post may use, and the fixed output size of each.
//!
//! | Ratio | Output (px) | Typical use |
//! |---|---|---|
//! | `1:1` | 1080 × 1080 | square feed post |
//! | `4:5` | 1080 × 1350 | portrait photo post (photo default) |
//! | `16:9` | 1920 × 1080 | landscape / reel-style post (reel default) |
//!
//! The pixel table is a global constant. Config can choose which ratio a post
//! kind starts with, but never the pixels a ratio renders to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported aspect ratio '{0}' (expected 1:1, 4:5 or 16:9)")]
pub struct ParseRatioError(pub String);

/// Output pixel size of a finalized bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

/// One of the three allowed post frame shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Portrait,
    Landscape,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [Self::Square, Self::Portrait, Self::Landscape];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "4:5",
            Self::Landscape => "16:9",
        }
    }

    /// `(width, height)` terms of the ratio.
    pub const fn terms(self) -> (u32, u32) {
        match self {
            Self::Square => (1, 1),
            Self::Portrait => (4, 5),
            Self::Landscape => (16, 9),
        }
    }

    /// Fixed pixel size every finalized bitmap of this ratio is rendered to.
    pub const fn output_size(self) -> OutputSize {
        match self {
            Self::Square => OutputSize {
                width: 1080,
                height: 1080,
            },
            Self::Portrait => OutputSize {
                width: 1080,
                height: 1350,
            },
            Self::Landscape => OutputSize {
                width: 1920,
                height: 1080,
            },
        }
    }

    /// Width divided by height.
    pub fn as_f64(self) -> f64 {
        let (w, h) = self.terms();
        w as f64 / h as f64
    }

    /// Short form used in output file names (`1x1`, `4x5`, `16x9`).
    pub fn file_tag(self) -> String {
        let (w, h) = self.terms();
        format!("{w}x{h}")
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = ParseRatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(['x', '/'], ":");
        Self::ALL
            .into_iter()
            .find(|r| r.label() == normalized)
            .ok_or_else(|| ParseRatioError(s.to_string()))
    }
}

// Serialized as the human label ("4:5") in manifests and config.
impl Serialize for AspectRatio {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for AspectRatio {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What kind of post is being created. Decides the ratio a fresh selection locks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[default]
    Photo,
    Reel,
}

impl PostKind {
    /// Built-in default ratio, used when config does not override it.
    pub const fn default_ratio(self) -> AspectRatio {
        match self {
            Self::Photo => AspectRatio::Portrait,
            Self::Reel => AspectRatio::Landscape,
        }
    }
}
