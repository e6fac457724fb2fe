use crate::constants::{
    COVER_PAGE_UNITS, DEFAULT_LOCALE, DEFAULT_STORAGE_PREFIX, MAX_PAGE_UNITS, QR_MIN_SIZE_PT,
    STANDARD_PAGE_UNITS, mm_to_pt,
};
use crate::error::ConfigError;
use crate::layout::{SlotGeometry, voucher_qr_size};
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Voucher book generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    // Paper
    pub paper_size: PaperSize,
    pub orientation: Orientation,
    pub margins: PageMargins,

    // Grid
    pub units_per_page: u8,
    pub cover_units: u8,

    // Rendering
    pub add_page_numbers: bool,
    pub compress_streams: bool,
    pub default_locale: String,

    // Output
    pub storage_prefix: String,

    pub rate_limit: RateLimitOptions,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            margins: PageMargins::default(),
            units_per_page: STANDARD_PAGE_UNITS,
            cover_units: COVER_PAGE_UNITS,
            add_page_numbers: true,
            compress_streams: true,
            default_locale: DEFAULT_LOCALE.to_string(),
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            rate_limit: RateLimitOptions::default(),
        }
    }
}

/// Generation requests allowed per caller per window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitOptions {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl GeneratorOptions {
    /// Load options from JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes)?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Page capacity in units for a layout type
    pub fn capacity(&self, layout: PageLayout) -> u8 {
        match layout {
            PageLayout::Cover => self.cover_units,
            PageLayout::Standard => self.units_per_page,
        }
    }

    /// Page size in points with orientation applied
    pub fn page_size_pt(&self) -> (f32, f32) {
        let (w, h) = self
            .paper_size
            .dimensions_with_orientation(self.orientation);
        (mm_to_pt(w), mm_to_pt(h))
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units_per_page == 0 || self.units_per_page > MAX_PAGE_UNITS {
            return Err(ConfigError::Invalid(format!(
                "units_per_page must be between 1 and {MAX_PAGE_UNITS}"
            )));
        }
        if self.cover_units > self.units_per_page {
            return Err(ConfigError::Invalid(
                "cover_units cannot exceed units_per_page".to_string(),
            ));
        }

        let (width_mm, height_mm) = self
            .paper_size
            .dimensions_with_orientation(self.orientation);
        let m = &self.margins;
        if [m.top_mm, m.bottom_mm, m.left_mm, m.right_mm]
            .iter()
            .any(|v| *v < 0.0)
        {
            return Err(ConfigError::Invalid("Margins cannot be negative".to_string()));
        }
        if m.left_mm + m.right_mm >= width_mm || m.top_mm + m.bottom_mm >= height_mm {
            return Err(ConfigError::Invalid(
                "Margins leave no room for content".to_string(),
            ));
        }

        // Any one-unit slot may hold a voucher.
        let qr_size = voucher_qr_size(&SlotGeometry::from_options(self).smallest_slot());
        if qr_size < QR_MIN_SIZE_PT {
            return Err(ConfigError::Invalid(format!(
                "One-unit slots on {:?} {:?} paper leave {qr_size:.1}pt for a QR code, at least {QR_MIN_SIZE_PT}pt needed",
                self.paper_size, self.orientation
            )));
        }

        if self.default_locale.trim().is_empty() {
            return Err(ConfigError::Invalid("default_locale is empty".to_string()));
        }

        let prefix = self.storage_prefix.as_str();
        if prefix.is_empty() || prefix.starts_with('/') || prefix.ends_with('/') || prefix.contains("..")
        {
            return Err(ConfigError::Invalid(format!(
                "storage_prefix '{prefix}' must be a relative path without leading or trailing '/'"
            )));
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit needs a positive request count and window".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = GeneratorOptions::default();
        options.validate().unwrap();
        assert_eq!(options.capacity(PageLayout::Standard), 8);
        assert_eq!(options.capacity(PageLayout::Cover), 4);
    }

    #[test]
    fn rejects_oversized_grid() {
        let options = GeneratorOptions {
            units_per_page: 40,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn rejects_cover_larger_than_page() {
        let options = GeneratorOptions {
            units_per_page: 4,
            cover_units: 6,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn rejects_margins_that_swallow_the_page() {
        let options = GeneratorOptions {
            margins: PageMargins::uniform(120.0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn rejects_paper_too_short_for_voucher_codes() {
        let options = GeneratorOptions {
            paper_size: PaperSize::A5,
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("QR code"));

        let fewer_units = GeneratorOptions {
            units_per_page: 4,
            cover_units: 2,
            ..options
        };
        fewer_units.validate().unwrap();
    }

    #[test]
    fn rejects_absolute_storage_prefix() {
        let options = GeneratorOptions {
            storage_prefix: "/books".into(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let options: GeneratorOptions =
            serde_json::from_str(r#"{"paper_size":"Letter","add_page_numbers":false}"#).unwrap();
        assert_eq!(options.paper_size, PaperSize::Letter);
        assert!(!options.add_page_numbers);
        assert_eq!(options.units_per_page, 8);
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generator.json");

        let options = GeneratorOptions {
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        options.save(&path).await.unwrap();

        let loaded = GeneratorOptions::load(&path).await.unwrap();
        assert_eq!(loaded, options);
    }
}
