//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Crop → resize** | `crop_imm` + `resize_exact` (Lanczos3) |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` |
//! | **Output naming** | `sha2` over source + crop + size |
//!
//! The module is split into:
//! - **Geometry**: Pure functions for frame, scale, offset and crop-rect math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The finalization step combining geometry + backend

pub mod backend;
pub mod geometry;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use geometry::{
    CropParams, FrameSize, clamp_offset, clamp_params, compute_crop_rect, crop_box_dimensions,
    fit_scale, min_cover_scale, revalidate,
};
pub use operations::{
    FinalizeError, OutputConfig, finalize_image, materialize_video, probe_dimensions,
    prune_outputs,
};
pub use params::{CropRect, CropResizeParams, Quality};
pub use rust_backend::RustBackend;
