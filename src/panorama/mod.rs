//! Decides whether a downloaded image should be opened in the panorama viewer.
//!
//! Photo-sphere cameras embed Google's GPano XMP namespace in the JPEG; when it
//! is present the projection type is taken from there. Images without the
//! metadata still qualify when they are at least twice as wide as they are tall.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::ImageReader;
use regex::bytes::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanoramaInfo {
    pub width: u32,
    pub height: u32,
    /// `GPano:ProjectionType`, e.g. "equirectangular".
    pub projection: Option<String>,
}

impl PanoramaInfo {
    pub fn is_panorama(&self) -> bool {
        self.projection.is_some()
            || (self.height > 0 && u64::from(self.width) >= 2 * u64::from(self.height))
    }
}

/// Extracts the GPano projection type from raw file bytes.
pub fn projection_type(data: &[u8]) -> Option<String> {
    // Attribute form: GPano:ProjectionType="x"; element form: <GPano:ProjectionType>x<
    let re = Regex::new(r#"GPano:ProjectionType\s*(?:=\s*["']([^"']+)["']|>\s*([^<\s]+)\s*<)"#).ok()?;
    let caps = re.captures(data)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    Some(String::from_utf8_lossy(value.as_bytes()).trim().to_string())
}

pub fn inspect(path: &Path) -> Result<PanoramaInfo, InspectError> {
    let data = fs::read(path)?;
    let (width, height) = ImageReader::new(Cursor::new(&data))
        .with_guessed_format()?
        .into_dimensions()?;

    Ok(PanoramaInfo {
        width,
        height,
        projection: projection_type(&data),
    })
}
