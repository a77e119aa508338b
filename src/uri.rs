//! Classification of media URIs.
//!
//! Every URI that flows through the pipeline is one of:
//!
//! - a **local file** (`/abs/path.jpg`, `relative/path.jpg`, `file:///abs/path.jpg`),
//! - a **gallery handle** pointing into a photo library or content provider
//!   (`content://`, `ph://`, `assets-library://`, `photos://`, `media://`),
//! - a **remote** URL (`http(s)://`, `gs://`, `s3://`),
//! - or something else (`data:`, `blob:`, unknown schemes).
//!
//! Only local files may ever be a finalized bitmap. Gallery handles are how
//! source assets arrive from the picker.

use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

const GALLERY_SCHEMES: &[&str] = &["content", "ph", "assets-library", "photos", "media"];
const REMOTE_SCHEMES: &[&str] = &["http", "https", "gs", "s3", "ftp"];

#[derive(Error, Debug)]
pub enum UriError {
    #[error("cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} cannot be expressed as a file:// URI")]
    NotRepresentable(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriKind {
    LocalFile(PathBuf),
    GalleryHandle { scheme: String },
    Remote { scheme: String },
    Unknown { scheme: String },
    /// Has a scheme but does not parse, or is a `file:` URI naming another host.
    Malformed { reason: String },
}

impl UriKind {
    pub fn is_local_file(&self) -> bool {
        matches!(self, Self::LocalFile(_))
    }

    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::LocalFile(_) => "local file".to_string(),
            Self::GalleryHandle { scheme } => format!("gallery handle ({scheme}://)"),
            Self::Remote { scheme } => format!("remote URL ({scheme}://)"),
            Self::Unknown { scheme } => format!("unsupported scheme ({scheme}:)"),
            Self::Malformed { reason } => format!("malformed URI ({reason})"),
        }
    }
}

/// Classify a URI string.
///
/// Anything without a scheme is a plain path, taken literally. `file:` URIs
/// are percent-decoded into a path. Single-letter "schemes" are Windows drive
/// letters (`C:\photos\a.jpg`) and are treated as plain paths.
pub fn classify(uri: &str) -> UriKind {
    let trimmed = uri.trim();
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return UriKind::LocalFile(PathBuf::from(trimmed));
        }
        Err(err) => {
            return UriKind::Malformed {
                reason: err.to_string(),
            };
        }
    };

    let scheme = url.scheme();
    if scheme.len() == 1 {
        return UriKind::LocalFile(PathBuf::from(trimmed));
    }
    if scheme == "file" {
        return match url.to_file_path() {
            Ok(path) => UriKind::LocalFile(path),
            Err(()) => UriKind::Malformed {
                reason: format!("file URI on host {}", url.host_str().unwrap_or("?")),
            },
        };
    }
    if GALLERY_SCHEMES.contains(&scheme) {
        return UriKind::GalleryHandle {
            scheme: scheme.to_string(),
        };
    }
    if REMOTE_SCHEMES.contains(&scheme) {
        return UriKind::Remote {
            scheme: scheme.to_string(),
        };
    }
    UriKind::Unknown {
        scheme: scheme.to_string(),
    }
}

/// Resolve a URI to a filesystem path if it is a local file.
pub fn local_path(uri: &str) -> Option<PathBuf> {
    match classify(uri) {
        UriKind::LocalFile(path) => Some(path),
        _ => None,
    }
}

/// Render a local path as the URI form stored in [`FinalizedMedia`](crate::types::FinalizedMedia).
///
/// Relative paths are resolved against the current directory first, so the
/// URI never carries a path segment in its host position.
pub fn file_uri(path: &Path) -> Result<String, UriError> {
    let absolute = std::path::absolute(path).map_err(|source| UriError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| UriError::NotRepresentable(absolute))
}

/// Whether two URIs refer to the same underlying resource.
///
/// Local files are compared by path (canonicalized when both exist, so
/// symlinks and `..` segments cannot hide an alias). Anything else is compared
/// as trimmed text.
pub fn aliases(a: &str, b: &str) -> bool {
    match (local_path(a), local_path(b)) {
        (Some(pa), Some(pb)) => {
            if pa == pb {
                return true;
            }
            match (pa.canonicalize(), pb.canonicalize()) {
                (Ok(ca), Ok(cb)) => ca == cb,
                _ => false,
            }
        }
        _ => a.trim() == b.trim(),
    }
}
