//! Atlas configuration
//!
//! Page geometry, padding and format are fixed for the lifetime of an atlas.
//! Configs can be built in code or loaded from TOML:
//!
//! ```toml
//! page_width = 512
//! page_height = 512
//! horizontal_padding = 2
//! vertical_padding = 2
//! expected_entries = 300
//! format = "rgba"
//! pixel_type = "u8"
//! ```

use crate::error::{AtlasError, AtlasResult};
use crate::pixel_format::{PixelFormat, PixelType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration accepted at atlas creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Width of every page in pixels
    pub page_width: u32,
    /// Height of every page in pixels
    pub page_height: u32,
    /// Padding added on the left and right of each frame
    pub horizontal_padding: u32,
    /// Padding added above and below each frame
    pub vertical_padding: u32,
    /// Hint used to size the name index and entry storage
    pub expected_entries: u32,
    pub format: PixelFormat,
    pub pixel_type: PixelType,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            page_width: 1024,
            page_height: 1024,
            horizontal_padding: 1,
            vertical_padding: 1,
            expected_entries: 256,
            format: PixelFormat::Rgba,
            pixel_type: PixelType::U8,
        }
    }
}

impl AtlasConfig {
    /// Parse a config from a TOML document. Missing keys take default values.
    pub fn from_toml_str(source: &str) -> AtlasResult<Self> {
        let config: AtlasConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> AtlasResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| AtlasError::ConfigIo {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        log::debug!("[AtlasConfig::load] Loaded atlas config from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Check page geometry. Format support is checked against the backend at creation.
    pub fn validate(&self) -> AtlasResult<()> {
        if self.page_width == 0 {
            return Err(invalid("page_width", self.page_width, "must be non-zero"));
        }
        if self.page_height == 0 {
            return Err(invalid("page_height", self.page_height, "must be non-zero"));
        }
        if self.horizontal_padding as u64 * 2 >= self.page_width as u64 {
            return Err(invalid(
                "horizontal_padding",
                self.horizontal_padding,
                "padding leaves no room on the page",
            ));
        }
        if self.vertical_padding as u64 * 2 >= self.page_height as u64 {
            return Err(invalid(
                "vertical_padding",
                self.vertical_padding,
                "padding leaves no room on the page",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: u32, reason: &str) -> AtlasError {
    AtlasError::InvalidConfig {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AtlasConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = AtlasConfig::from_toml_str(
            r#"
            page_width = 256
            page_height = 128
            format = "r"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.page_width, 256);
        assert_eq!(config.page_height, 128);
        assert_eq!(config.format, PixelFormat::R);
        assert_eq!(config.pixel_type, PixelType::U8);
        assert_eq!(config.horizontal_padding, 1);
    }

    #[test]
    fn test_rejects_oversized_padding() {
        let config = AtlasConfig {
            page_width: 8,
            horizontal_padding: 4,
            ..Default::default()
        };
        match config.validate() {
            Err(AtlasError::InvalidConfig { field, .. }) => {
                assert_eq!(field, "horizontal_padding")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_toml() {
        let result = AtlasConfig::from_toml_str("page_width = \"wide\"");
        assert!(matches!(result, Err(AtlasError::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "page_width = 64\npage_height = 64\nexpected_entries = 10")
            .expect("Failed to write config");

        let config = AtlasConfig::load(file.path()).expect("config should load");
        assert_eq!(config.page_width, 64);
        assert_eq!(config.expected_entries, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AtlasConfig::load("/nonexistent/atlas.toml");
        assert!(matches!(result, Err(AtlasError::ConfigIo { .. })));
    }
}
