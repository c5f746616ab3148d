//! Parameter types for media operations.
//!
//! These structs describe *what* to encode, not *how*. They are the
//! interface between the [`transcoder`](super::transcoder) (which decides
//! which variants to create) and the [`backend`](super::backend) (which does
//! the pixel work), so the matrix driver can be tested against a mock.

use std::path::PathBuf;

/// Quality setting for lossy encoding (1-100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Output formats the backend can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodeFormat {
    Webp,
    Jpeg,
    Avif,
    Png,
}

impl EncodeFormat {
    /// Parse a format name from config. `jpg` is accepted as `jpeg`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "webp" => Some(Self::Webp),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "avif" => Some(Self::Avif),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// File extension and catalog key for the format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
            Self::Avif => "avif",
            Self::Png => "png",
        }
    }
}

/// Full specification for one encode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Target dimensions, already fit-inside computed. Equal to the source
    /// dimensions for the `original` pseudo-size.
    pub width: u32,
    pub height: u32,
    pub format: EncodeFormat,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(80).value(), 80);
        assert_eq!(Quality::new(200).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }

    #[test]
    fn format_names_parse() {
        assert_eq!(EncodeFormat::from_name("webp"), Some(EncodeFormat::Webp));
        assert_eq!(EncodeFormat::from_name("JPEG"), Some(EncodeFormat::Jpeg));
        assert_eq!(EncodeFormat::from_name("jpg"), Some(EncodeFormat::Jpeg));
        assert_eq!(EncodeFormat::from_name("avif"), Some(EncodeFormat::Avif));
        assert_eq!(EncodeFormat::from_name("png"), Some(EncodeFormat::Png));
        assert_eq!(EncodeFormat::from_name("tiff"), None);
    }

    #[test]
    fn extension_matches_catalog_keys() {
        assert_eq!(EncodeFormat::Jpeg.extension(), "jpeg");
        assert_eq!(EncodeFormat::Webp.extension(), "webp");
    }
}
