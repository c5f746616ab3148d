//! Media transcoding.
//!
//! This module owns the second pipeline phase: for every discovered image,
//! produce a matrix of (size × format) variants under a content-addressed or
//! path-mirroring layout, and build the path→URL, path→hash and hash→URL
//! indices the link resolver and graph builder consume.
//!
//! Layering:
//! - **Calculations**: pure dimension math (unit testable)
//! - **Parameters**: data structures describing encode operations
//! - **Backend**: trait + implementation for actual pixel work
//! - **Transcoder**: the matrix driver combining the above with skip gates
//! - **Catalog**: the frozen output handed to downstream phases

pub mod backend;
mod calculations;
pub mod catalog;
mod params;
pub mod transcoder;

pub use backend::{BackendError, ImageBackend, RasterBackend};
pub use catalog::{MediaCatalog, MediaMeta, MediaRecord, MediaVariant, mime_for_extension};
pub use params::{EncodeFormat, Quality, TranscodeParams};
pub use transcoder::transcode_all;
