//! The upload boundary.
//!
//! Only [`FinalizedMedia`] crosses it, and only after the pre-upload check has
//! passed on the exact batch being handed over. The remote store itself is
//! somebody else's problem and sits behind [`MediaUploader`].

use crate::invariants::{self, InvariantViolation};
use crate::ratio::AspectRatio;
use crate::session::{PostSession, SessionError};
use crate::stage::{Stage, StageError, StageEvent};
use crate::types::FinalizedMedia;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no ratio is locked for this post")]
    NoRatioLock,
    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// Everything the uploader gets for one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadBatch {
    pub user_id: String,
    pub ratio: AspectRatio,
    pub media: Vec<FinalizedMedia>,
}

/// Remote references returned by a successful upload, in batch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub remote_uris: Vec<String>,
}

pub trait MediaUploader {
    fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, UploadError>;
}

/// Hand a `Ready` session's finalized media to `uploader`.
///
/// The pre-upload check runs right before the call. On success the session
/// moves to `Submitted` and its state is dropped; on any failure the session
/// is left untouched so the caller can retry.
pub fn submit(
    uploader: &impl MediaUploader,
    user_id: &str,
    session: &mut PostSession,
) -> Result<UploadReceipt, UploadError> {
    if session.stage() != Stage::Ready {
        return Err(SessionError::from(StageError::InvalidTransition {
            from: session.stage(),
            event: StageEvent::Submit,
        })
        .into());
    }
    let ratio = session.locked_ratio().ok_or(UploadError::NoRatioLock)?;
    let media = session.finalized_in_order();
    invariants::check_upload(user_id, session.selection().assets(), &media, Some(ratio))?;

    let batch = UploadBatch {
        user_id: user_id.to_string(),
        ratio,
        media,
    };
    tracing::info!(user = user_id, count = batch.media.len(), "uploading post");
    let receipt = uploader.upload(&batch)?;
    session.complete_submission()?;
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Dimensions;
    use crate::imaging::backend::tests::MockBackend;
    use crate::session::CancelToken;
    use crate::test_helpers::{local_source, session_in};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingUploader {
        batches: RefCell<Vec<UploadBatch>>,
        reject: bool,
    }

    impl MediaUploader for RecordingUploader {
        fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, UploadError> {
            if self.reject {
                return Err(UploadError::Rejected("quota exceeded".into()));
            }
            self.batches.borrow_mut().push(batch.clone());
            Ok(UploadReceipt {
                remote_uris: batch
                    .media
                    .iter()
                    .map(|m| format!("https://cdn.example.com/{}", m.id))
                    .collect(),
            })
        }
    }

    fn ready_session(tmp: &TempDir, ids: &[&str]) -> PostSession {
        let mut session = session_in(tmp);
        for id in ids {
            session.select(local_source(tmp, id)).unwrap();
        }
        let backend = MockBackend::with_dimensions(vec![
            Dimensions {
                width: 40,
                height: 20
            };
            ids.len()
        ]);
        session.finalize_all(&backend, &CancelToken::new()).unwrap();
        session
    }

    #[test]
    fn submit_hands_over_finalized_media_only() {
        let tmp = TempDir::new().unwrap();
        let mut session = ready_session(&tmp, &["a", "b"]);
        let uploader = RecordingUploader::default();

        let receipt = submit(&uploader, "user-1", &mut session).unwrap();
        assert_eq!(receipt.remote_uris.len(), 2);

        let batches = uploader.batches.borrow();
        assert_eq!(batches[0].user_id, "user-1");
        assert!(batches[0].media.iter().all(|m| m.final_uri.starts_with("file://")));
        assert_eq!(session.stage(), Stage::Submitted);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn submit_without_user_never_calls_uploader() {
        let tmp = TempDir::new().unwrap();
        let mut session = ready_session(&tmp, &["a"]);
        let uploader = RecordingUploader::default();

        let err = submit(&uploader, "", &mut session).unwrap_err();
        assert!(matches!(
            err,
            UploadError::Invariant(InvariantViolation::MissingUser { .. })
        ));
        assert!(uploader.batches.borrow().is_empty());
        assert_eq!(session.stage(), Stage::Ready);
    }

    #[test]
    fn submit_rechecks_files_on_disk() {
        let tmp = TempDir::new().unwrap();
        let mut session = ready_session(&tmp, &["a"]);
        let media = session.finalized_in_order();
        let path = crate::uri::local_path(&media[0].final_uri).unwrap();
        std::fs::remove_file(path).unwrap();

        let err = submit(&RecordingUploader::default(), "user-1", &mut session).unwrap_err();
        assert!(matches!(
            err,
            UploadError::Invariant(InvariantViolation::Unmaterialized { .. })
        ));
    }

    #[test]
    fn submit_before_ready_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut session = session_in(&tmp);
        session.select(local_source(&tmp, "a")).unwrap();
        let err = submit(&RecordingUploader::default(), "user-1", &mut session).unwrap_err();
        assert!(matches!(err, UploadError::Session(SessionError::Stage(_))));
    }

    #[test]
    fn rejected_upload_keeps_session_ready() {
        let tmp = TempDir::new().unwrap();
        let mut session = ready_session(&tmp, &["a"]);
        let uploader = RecordingUploader {
            reject: true,
            ..Default::default()
        };
        assert!(matches!(
            submit(&uploader, "user-1", &mut session),
            Err(UploadError::Rejected(_))
        ));
        assert_eq!(session.stage(), Stage::Ready);
        assert_eq!(session.finalized_in_order().len(), 1);
    }
}
