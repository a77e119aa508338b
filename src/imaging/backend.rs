//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the capability the finalization step calls:
//! probe a source's dimensions, and crop + resize a source into a **new**
//! file. A backend must never write to or return its input path.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. There is exactly one; alternative native libraries are not chained.

use super::params::CropResizeParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unreadable image {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
pub trait ImageBackend {
    /// Read image dimensions. Fails for unreadable files; never guesses a size.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Crop `params.rect` out of `params.source`, resize it to exactly
    /// `params.target`, and write the result to `params.output`.
    fn crop_resize(&self, params: &CropResizeParams) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{CropRect, Quality};
    use crate::ratio::OutputSize;
    use std::sync::Mutex;

    /// Mock backend that records operations.
    ///
    /// `crop_resize` writes a small placeholder file to the output path so
    /// downstream checks (existence, non-empty) see a materialized file.
    /// Identify results are popped from the end of `identify_results`.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
        /// Fail `crop_resize` for sources whose path contains this string.
        pub fail_on: Option<String>,
        /// Skip writing the output file (simulates a primitive that "succeeds" silently).
        pub skip_write: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        CropResize {
            source: String,
            output: String,
            rect: CropRect,
            target: OutputSize,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn failing_on(mut self, needle: &str) -> Self {
            self.fail_on = Some(needle.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn crop_ops(&self) -> Vec<RecordedOp> {
            self.get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::CropResize { .. }))
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::Unreadable {
                    path: path.display().to_string(),
                    reason: "no mock dimensions".to_string(),
                })
        }

        fn crop_resize(&self, params: &CropResizeParams) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::CropResize {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                rect: params.rect,
                target: params.target,
                quality: params.quality.value(),
            });

            if let Some(needle) = &self.fail_on
                && params.source.to_string_lossy().contains(needle.as_str())
            {
                return Err(BackendError::ProcessingFailed(format!(
                    "mock failure for {}",
                    params.source.display()
                )));
            }
            if !self.skip_write {
                std::fs::write(&params.output, b"mock-jpeg")?;
            }
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_identify_without_results_is_unreadable() {
        let backend = MockBackend::new();
        let err = backend.identify(Path::new("/x.jpg")).unwrap_err();
        assert!(matches!(err, BackendError::Unreadable { .. }));
    }

    #[test]
    fn mock_records_crop_resize_and_writes_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out.jpg");
        let backend = MockBackend::new();

        backend
            .crop_resize(&CropResizeParams {
                source: "/source.jpg".into(),
                output: output.clone(),
                rect: CropRect {
                    x: 10,
                    y: 20,
                    width: 400,
                    height: 500,
                },
                target: OutputSize {
                    width: 1080,
                    height: 1350,
                },
                quality: Quality::new(85),
            })
            .unwrap();

        assert!(output.exists());
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::CropResize {
                target: OutputSize {
                    width: 1080,
                    height: 1350
                },
                quality: 85,
                ..
            }
        ));
    }
}
