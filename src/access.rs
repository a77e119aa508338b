//! Media access resolution.
//!
//! Permission handling lives outside this crate; the pipeline only needs a
//! resolver that answers "can we read the user's media, and in what state is
//! the permission". `can_access == false` is a hard gate: no selection
//! happens without it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessState {
    Granted,
    Denied,
    Blocked,
    Limited,
    Partial,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photos,
    Camera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessStatus {
    pub can_access: bool,
    pub state: AccessState,
}

impl AccessStatus {
    pub const fn new(can_access: bool, state: AccessState) -> Self {
        Self { can_access, state }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("media access to {media:?} not available (state: {state:?})")]
pub struct AccessError {
    pub media: MediaType,
    pub state: AccessState,
}

pub trait MediaAccessResolver {
    /// Current permission state, without prompting.
    fn resolve(&self, media: MediaType) -> AccessStatus;

    /// Ask for access. May prompt; returns the resulting state.
    fn request(&self, media: MediaType) -> AccessStatus;
}

/// Resolve, and request once if not yet accessible.
///
/// `Blocked` and `Unavailable` are final and never re-requested.
pub fn ensure_access(
    resolver: &impl MediaAccessResolver,
    media: MediaType,
) -> Result<AccessStatus, AccessError> {
    let current = resolver.resolve(media);
    if current.can_access {
        return Ok(current);
    }
    if matches!(current.state, AccessState::Blocked | AccessState::Unavailable) {
        tracing::warn!(?media, state = ?current.state, "media access unavailable");
        return Err(AccessError {
            media,
            state: current.state,
        });
    }

    let requested = resolver.request(media);
    if requested.can_access {
        tracing::debug!(?media, state = ?requested.state, "media access granted on request");
        Ok(requested)
    } else {
        tracing::warn!(?media, state = ?requested.state, "media access denied");
        Err(AccessError {
            media,
            state: requested.state,
        })
    }
}

/// Resolver for a local media directory: readable means granted.
#[derive(Debug, Clone)]
pub struct LocalDirAccess {
    root: PathBuf,
}

impl LocalDirAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MediaAccessResolver for LocalDirAccess {
    fn resolve(&self, _media: MediaType) -> AccessStatus {
        match std::fs::read_dir(&self.root) {
            Ok(_) => AccessStatus::new(true, AccessState::Granted),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                AccessStatus::new(false, AccessState::Unavailable)
            }
            Err(_) => AccessStatus::new(false, AccessState::Denied),
        }
    }

    fn request(&self, media: MediaType) -> AccessStatus {
        self.resolve(media)
    }
}
