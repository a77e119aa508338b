//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only, no full decode) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Output is written to `<output>.part` and renamed into place once the
//! encoder has finished, so an interrupted run never leaves a half-written
//! file under the final name.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::CropResizeParams;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of in-flight output files.
pub const PARTIAL_SUFFIX: &str = "part";

/// Production backend. See the [module docs](self) for the crate mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// `<output>.part`
pub(crate) fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Encode as JPEG into `<output>.part`, then rename over `output`.
fn save_jpeg(img: &DynamicImage, output: &Path, quality: u32) -> Result<(), BackendError> {
    let partial = partial_path(output);
    let result = (|| -> Result<(), BackendError> {
        let file = std::fs::File::create(&partial)?;
        let mut writer = std::io::BufWriter::new(file);
        // JPEG has no alpha channel
        let rgb = img.to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality as u8);
        rgb.write_with_encoder(encoder)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        writer.flush()?;
        std::fs::rename(&partial, output)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| BackendError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Dimensions { width, height })
    }

    fn crop_resize(&self, params: &CropResizeParams) -> Result<(), BackendError> {
        if params.output == params.source {
            return Err(BackendError::ProcessingFailed(format!(
                "refusing to overwrite source {}",
                params.source.display()
            )));
        }
        if params.rect.is_empty() || params.target.width == 0 || params.target.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "degenerate crop {:?} → {:?}",
                params.rect, params.target
            )));
        }

        let img = load_image(&params.source)?;
        if !params.rect.fits_within((img.width(), img.height())) {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {:?} exceeds {}x{} source",
                params.rect,
                img.width(),
                img.height()
            )));
        }

        let r = params.rect;
        let resized = img.crop_imm(r.x, r.y, r.width, r.height).resize_exact(
            params.target.width,
            params.target.height,
            FilterType::Lanczos3,
        );
        save_jpeg(&resized, &params.output, params.quality.value())
    }
}
