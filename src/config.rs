//! Conversion settings.
//!
//! All per-run knobs live in [`ConversionSettings`]: output format, render
//! scale, page range and JPEG quality. A run takes the settings by reference
//! and never mutates them, so one value can drive any number of runs and be
//! serialised next to the images it produced.
//!
//! # Design choice: builder over constructor
//! The fields are public for easy construction in tests and from JSON, but
//! the [`ConversionSettingsBuilder`] clamps every value into its legal range
//! as it is set. [`ConversionSettings::validate`] catches the rest (NaN,
//! hand-built out-of-range values) before any page is rendered.

use crate::error::Pdf2ImgError;
use crate::range::PageRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest supported render scale (1.0 = 72 DPI, one pixel per PDF point).
pub const MIN_SCALE: f32 = 1.0;

/// Largest supported render scale (5.0 = 360 DPI).
pub const MAX_SCALE: f32 = 5.0;

/// Settings for one conversion run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ConversionSettings, ImageFormat};
///
/// let settings = ConversionSettings::builder()
///     .format(ImageFormat::Jpeg)
///     .scale(3.0)
///     .quality(0.8)
///     .page_range("1-5, 8")
///     .build()
///     .unwrap();
/// assert_eq!(settings.jpeg_quality(), 80);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Output image format. Default: PNG.
    pub format: ImageFormat,

    /// Render scale relative to the page's size in points. Range: 1.0–5.0. Default: 2.0.
    ///
    /// A US-Letter page (612 × 792 pt) at scale 2.0 renders at 1224 × 1584 px.
    pub scale: f32,

    /// Page range expression, e.g. `"1-5, 8, 10-12"`. Blank selects every page.
    pub page_range: String,

    /// JPEG quality in `[0, 1]`. Ignored for PNG. Default: 0.92.
    pub quality: f32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            format: ImageFormat::default(),
            scale: 2.0,
            page_range: String::new(),
            quality: 0.92,
        }
    }
}

impl ConversionSettings {
    /// Create a new builder for `ConversionSettings`.
    pub fn builder() -> ConversionSettingsBuilder {
        ConversionSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// The parsed page range.
    pub fn pages(&self) -> PageRange {
        PageRange::parse(&self.page_range)
    }

    /// Quality on the 1–100 scale used by the JPEG encoder.
    pub fn jpeg_quality(&self) -> u8 {
        let q = if self.quality.is_finite() { self.quality } else { 1.0 };
        ((q.clamp(0.0, 1.0) * 100.0).round() as u8).clamp(1, 100)
    }

    /// Check every field is within its legal range.
    pub fn validate(&self) -> Result<(), Pdf2ImgError> {
        if !self.scale.is_finite() || !(MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "scale must be {MIN_SCALE}–{MAX_SCALE}, got {}",
                self.scale
            )));
        }
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "quality must be 0–1, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Builder for [`ConversionSettings`].
#[derive(Debug)]
pub struct ConversionSettingsBuilder {
    settings: ConversionSettings,
}

impl ConversionSettingsBuilder {
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.settings.format = format;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.settings.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        self
    }

    pub fn page_range(mut self, expression: impl Into<String>) -> Self {
        self.settings.page_range = expression.into();
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.settings.quality = quality.clamp(0.0, 1.0);
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<ConversionSettings, Pdf2ImgError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoded image format of each artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG. (default)
    #[default]
    Png,
    /// Lossy JPEG, encoded at [`ConversionSettings::quality`].
    Jpeg,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        })
    }
}

impl FromStr for ImageFormat {
    type Err = Pdf2ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(Pdf2ImgError::InvalidConfig(format!(
                "unknown image format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = ConversionSettings::default();
        assert_eq!(s.format, ImageFormat::Png);
        assert_eq!(s.scale, 2.0);
        assert!(s.page_range.is_empty());
        assert!(s.pages().is_all());
        assert_eq!(s.jpeg_quality(), 92);
        s.validate().unwrap();
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let s = ConversionSettings::builder()
            .scale(12.0)
            .quality(-0.5)
            .build()
            .unwrap();
        assert_eq!(s.scale, MAX_SCALE);
        assert_eq!(s.quality, 0.0);
        assert_eq!(s.jpeg_quality(), 1);

        let s = ConversionSettings::builder().scale(0.1).build().unwrap();
        assert_eq!(s.scale, MIN_SCALE);
    }

    #[test]
    fn validate_rejects_hand_built_values() {
        let s = ConversionSettings {
            scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(s.validate(), Err(Pdf2ImgError::InvalidConfig(_))));

        let s = ConversionSettings {
            quality: f32::NAN,
            ..Default::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn builder_rejects_nan_scale() {
        assert!(ConversionSettings::builder().scale(f32::NAN).build().is_err());
    }

    #[test]
    fn image_format_parsing() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("webp".parse::<ImageFormat>().is_err());
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
    }

    #[test]
    fn settings_deserialise_with_defaults() {
        let s: ConversionSettings =
            serde_json::from_str(r#"{"format":"jpeg","page_range":"2-3"}"#).unwrap();
        assert_eq!(s.format, ImageFormat::Jpeg);
        assert_eq!(s.scale, 2.0);
        assert_eq!(s.pages().resolve(10), vec![2, 3]);
    }
}
