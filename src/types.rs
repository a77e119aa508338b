//! Shared data types that cross module and stage boundaries.
//!
//! [`SourceAsset`] is what the picker hands us; [`FinalizedMedia`] is the only
//! thing allowed past the adjust stage. Both serialize to JSON for the batch
//! request/manifest files consumed by the CLI.

use crate::ratio::AspectRatio;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a picked asset, stable for the lifetime of a pick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id reduced to `[A-Za-z0-9_-]` so it can be embedded in a file name.
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if stem.is_empty() {
            "asset".to_string()
        } else {
            stem
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

/// One picked gallery/camera item. Never mutated after selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAsset {
    pub id: AssetId,
    /// Read-only reference to the original pixels.
    pub uri: String,
    #[serde(default)]
    pub kind: MediaKind,
    /// Known pixel dimensions, when the picker reported them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
}

impl SourceAsset {
    pub fn image(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(id),
            uri: uri.into(),
            kind: MediaKind::Image,
            width: None,
            height: None,
            created_at: 0,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Picker-reported dimensions if both are present.
    pub fn known_size(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

/// A concretely rendered, locally stored bitmap produced by finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedMedia {
    pub id: AssetId,
    /// `file://` URI of the rendered output. Never a source URI.
    pub final_uri: String,
    pub ratio: AspectRatio,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}
