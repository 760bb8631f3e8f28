//! Export configuration
//!
//! Everything that affects the look of the exported PDF is explicit here
//! instead of being inherited from the environment, so the same markdown
//! always rasterizes the same way. The configuration can be stored as TOML.

use crate::pagination::PageGeometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Complete export configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Styling of the off-screen render fragment
    pub style: RenderStyle,

    /// Physical page size and margin of the output PDF
    pub page: PageGeometry,

    /// Rasterization settings
    pub raster: RasterOptions,
}

/// Styling container applied to the markdown before layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Fixed layout width of the fragment in points
    pub width_pt: f64,

    /// Padding around the content in points
    pub padding_pt: f64,

    /// Body font family
    pub font_family: String,

    /// Font family for inline code and code blocks
    pub code_font_family: String,

    /// Body font size in points
    pub font_size_pt: f64,

    /// Line height as a multiple of the font size
    pub line_height: f64,

    /// Text color
    pub text_color: HexColor,

    /// Background fill of the fragment
    pub background: HexColor,

    /// Also search fonts installed on the host
    pub include_system_fonts: bool,

    /// Extra directories to search for fonts
    pub font_dirs: Vec<PathBuf>,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            width_pt: 800.0,
            padding_pt: 20.0,
            font_family: "Libertinus Serif".to_string(),
            code_font_family: "DejaVu Sans Mono".to_string(),
            font_size_pt: 14.0,
            line_height: 1.6,
            text_color: HexColor::new(0x1f, 0x29, 0x37),
            background: HexColor::WHITE,
            include_system_fonts: false,
            font_dirs: Vec::new(),
        }
    }
}

/// Rasterization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterOptions {
    /// Oversampling scale (pixels per point)
    pub scale: f32,

    /// Opaque background every pixel is composited onto
    pub background: HexColor,

    /// Largest bitmap the rasterizer will allocate, in bytes
    pub max_bitmap_bytes: u64,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: HexColor::WHITE,
            max_bitmap_bytes: 2 * 1024 * 1024 * 1024,
        }
    }
}

impl ExportConfig {
    /// Load configuration from a TOML file
    ///
    /// # Parameters
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(ExportConfig)` - Successfully loaded and validated configuration
    /// * `Err(ConfigError)` - Error reading, parsing or validating the file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(ConfigError::IoError)?;

        let config: ExportConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    ///
    /// # Parameters
    /// * `path` - Path where the configuration file will be written
    ///
    /// # Returns
    /// * `Ok(())` - Successfully saved configuration
    /// * `Err(ConfigError)` - Error serializing or writing the file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        fs::write(&path, content).map_err(ConfigError::IoError)?;

        Ok(())
    }

    /// Check that every value can produce a valid export
    pub fn validate(&self) -> Result<(), ConfigError> {
        let style = &self.style;
        if !(style.width_pt.is_finite() && style.width_pt > 0.0) {
            return Err(invalid("style.width_pt must be a positive number"));
        }
        if !(style.padding_pt.is_finite() && style.padding_pt >= 0.0) {
            return Err(invalid("style.padding_pt must not be negative"));
        }
        if !(style.font_size_pt.is_finite() && style.font_size_pt > 0.0) {
            return Err(invalid("style.font_size_pt must be a positive number"));
        }
        if !(style.line_height.is_finite() && style.line_height >= 1.0) {
            return Err(invalid("style.line_height must be at least 1.0"));
        }

        if !(self.raster.scale.is_finite() && self.raster.scale > 0.0) {
            return Err(invalid("raster.scale must be a positive number"));
        }
        if self.raster.max_bitmap_bytes == 0 {
            return Err(invalid("raster.max_bitmap_bytes must be greater than zero"));
        }

        self.page.validate().map_err(ConfigError::Invalid)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// An opaque sRGB color written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Typst color expression for this color
    pub fn to_typst(self) -> String {
        format!("rgb(\"{self}\")")
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| format!("invalid color '{s}', expected #rrggbb"))?;

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|e| e.to_string())
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// Errors that can occur when loading, saving or validating configuration
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
    /// IO error when reading or writing file
    IoError(std::io::Error),

    /// Error parsing TOML
    ParseError(toml::de::Error),

    /// Error serializing to TOML
    SerializeError(toml::ser::Error),

    /// A value is out of range
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "TOML serialize error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ExportConfig::default().validate().unwrap();
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = ExportConfig::default();
        config.style.font_family = "DejaVu Sans Mono".to_string();
        config.raster.scale = 3.0;

        // Serialize to TOML
        let toml_str = toml::to_string_pretty(&config).unwrap();
        println!("Generated TOML:\n{}", toml_str);

        // Deserialize back
        let parsed: ExportConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r##"
[style]
font_size_pt = 12.0
text_color = "#000000"

[page]
margin_mm = 10.0
"##;

        let config: ExportConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.style.font_size_pt, 12.0);
        assert_eq!(config.style.text_color, HexColor::new(0, 0, 0));
        assert_eq!(config.style.width_pt, 800.0);
        assert_eq!(config.page.margin_mm, 10.0);
        assert_eq!(config.page.page_width_mm, 210.0);
        assert_eq!(config.raster, RasterOptions::default());
    }

    #[test]
    fn test_invalid_color_is_rejected() {
        let result: Result<ExportConfig, _> = toml::from_str("[style]\nbackground = \"white\"\n");

        assert!(result.is_err());
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("#gggggg".parse::<HexColor>().is_err());
        assert_eq!("#0a0B0c".parse::<HexColor>(), Ok(HexColor::new(10, 11, 12)));
    }

    #[test]
    fn test_hex_color_formats() {
        let color = HexColor::new(0x1f, 0x29, 0x37);

        assert_eq!(color.to_string(), "#1f2937");
        assert_eq!(color.to_typst(), "rgb(\"#1f2937\")");
    }

    #[test]
    fn test_margins_consuming_page_are_rejected() {
        let mut config = ExportConfig::default();
        config.page.margin_mm = 105.0;

        let err = config.validate().unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_default_bitmap_budget_admits_long_documents() {
        // Rows of a full-width bitmap that fit in the default budget
        let config = ExportConfig::default();
        let row_bytes = (config.style.width_pt * f64::from(config.raster.scale)) as u64 * 4;
        let rows = config.raster.max_bitmap_bytes / row_bytes;

        let layout = crate::pagination::PageLayout::compute(
            std::num::NonZeroU32::new(1600).unwrap(),
            std::num::NonZeroU32::new(u32::try_from(rows).unwrap()).unwrap(),
            &config.page,
        );

        assert_eq!(rows, 335_544);
        assert_eq!(layout.page_count, 139);
    }

    #[test]
    fn test_non_positive_scale_is_rejected() {
        let mut config = ExportConfig::default();
        config.raster.scale = 0.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdviz.toml");
        let config = ExportConfig::default();

        config.save(&path).unwrap();
        let loaded = ExportConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }
}
