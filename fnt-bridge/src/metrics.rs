//! Mapping between pixel metrics of an atlas and unit metrics of an outline font.
//!
//! Every spatial quantity crossing between the two spaces goes through one
//! of the two metric types here, so that nothing is ever converted with the
//! wrong factor. Values are rounded with OpenType rounding (half rounds up).

use write_fonts::OtRound;

use crate::{error::ConvertError, fnt::Common};

/// The em size of fonts built from a bitmap atlas.
pub const GENERATED_UNITS_PER_EM: u16 = 1000;

/// Vertical metrics of an outline font, in font units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VerticalMetrics {
    pub units_per_em: u16,
    pub ascender: f64,
    /// Usually negative.
    pub descender: f64,
    pub line_gap: f64,
    /// Overrides from the `OS/2` table, when the font has one.
    pub os2: Option<Os2Metrics>,
}

/// The `OS/2` fields that take precedence over the horizontal header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Os2Metrics {
    pub win_ascent: u16,
    /// Positive distance below the baseline.
    pub win_descent: u16,
    pub typo_line_gap: i16,
}

/// Pixel metrics for rendering an outline font into an atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasMetrics {
    /// Pixels per font unit.
    pub scale: f64,
    /// Distance from the top of a cell to the baseline, in pixels.
    pub base: i32,
    pub line_height: i32,
}

impl AtlasMetrics {
    /// Derive atlas metrics for rendering at `font_size` pixels per em.
    pub fn from_outline(metrics: &VerticalMetrics, font_size: f64) -> Result<Self, ConvertError> {
        if metrics.units_per_em == 0 {
            return Err(ConvertError::Metrics("units per em is 0".into()));
        }
        let (ascender, descender, line_gap) = match metrics.os2 {
            Some(os2) => (
                os2.win_ascent as f64,
                -(os2.win_descent as f64),
                os2.typo_line_gap as f64,
            ),
            None => (
                metrics.ascender,
                -metrics.descender.abs(),
                metrics.line_gap,
            ),
        };
        let scale = font_size / metrics.units_per_em as f64;
        let base: f64 = (ascender * scale).ot_round();
        let line_height: f64 = ((ascender - descender + line_gap) * scale).ot_round();
        if !scale.is_finite() || !base.is_finite() || !line_height.is_finite() {
            return Err(ConvertError::Metrics(format!(
                "line height {line_height}, base {base}, units per em {}",
                metrics.units_per_em
            )));
        }
        if line_height <= 0.0 {
            return Err(ConvertError::Metrics(format!(
                "line height {line_height} at size {font_size} leaves no room for glyphs"
            )));
        }
        log::debug!("atlas metrics at {font_size}px: base {base}, line height {line_height}");
        Ok(AtlasMetrics {
            scale,
            base: base as i32,
            line_height: line_height as i32,
        })
    }

    /// Convert a length in font units to whole pixels.
    pub fn to_pixels(&self, units: f64) -> i32 {
        let px: f64 = (units * self.scale).ot_round();
        px as i32
    }
}

/// Unit metrics for an outline font built from an atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutlineMetrics {
    pub units_per_em: u16,
    /// Font units per pixel.
    pub scale: f64,
    pub ascender: i32,
    pub descender: i32,
}

impl OutlineMetrics {
    /// Derive outline metrics from the atlas line height and baseline.
    pub fn from_atlas(common: &Common, units_per_em: u16) -> Result<Self, ConvertError> {
        if common.line_height <= 0 {
            return Err(ConvertError::Metrics(format!(
                "line height {} must be positive",
                common.line_height
            )));
        }
        if units_per_em == 0 {
            return Err(ConvertError::Metrics("units per em is 0".into()));
        }
        let scale = units_per_em as f64 / common.line_height as f64;
        let ascender: f64 = (common.base as f64 * scale).ot_round();
        let descender: f64 = ((common.line_height - common.base) as f64 * scale).ot_round();
        Ok(OutlineMetrics {
            units_per_em,
            scale,
            ascender: ascender as i32,
            descender: -(descender as i32),
        })
    }

    /// Convert a length in pixels to whole font units.
    pub fn to_units(&self, pixels: f64) -> i32 {
        let units: f64 = (pixels * self.scale).ot_round();
        units as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hhea_only() -> VerticalMetrics {
        VerticalMetrics {
            units_per_em: 1000,
            ascender: 800.0,
            descender: -200.0,
            line_gap: 90.0,
            os2: None,
        }
    }

    #[test]
    fn atlas_metrics_from_hhea() {
        let metrics = AtlasMetrics::from_outline(&hhea_only(), 64.0).unwrap();
        assert_eq!(metrics.scale, 0.064);
        assert_eq!(metrics.base, 51);
        // (800 + 200 + 90) * 0.064 = 69.76
        assert_eq!(metrics.line_height, 70);
        assert_eq!(metrics.to_pixels(600.0), 38);
    }

    #[test]
    fn os2_overrides_hhea() {
        let metrics = VerticalMetrics {
            os2: Some(Os2Metrics {
                win_ascent: 1000,
                win_descent: 250,
                typo_line_gap: 0,
            }),
            ..hhea_only()
        };
        let atlas = AtlasMetrics::from_outline(&metrics, 32.0).unwrap();
        assert_eq!(atlas.base, 32);
        assert_eq!(atlas.line_height, 40);
    }

    #[test]
    fn positive_descender_is_treated_as_distance() {
        let metrics = VerticalMetrics {
            descender: 200.0,
            ..hhea_only()
        };
        let atlas = AtlasMetrics::from_outline(&metrics, 64.0).unwrap();
        assert_eq!(atlas.line_height, 70);
    }

    #[test]
    fn degenerate_outline_metrics() {
        let zero_upem = VerticalMetrics {
            units_per_em: 0,
            ..hhea_only()
        };
        assert!(matches!(
            AtlasMetrics::from_outline(&zero_upem, 64.0),
            Err(ConvertError::Metrics(_))
        ));
        let nan = VerticalMetrics {
            ascender: f64::NAN,
            ..hhea_only()
        };
        assert!(AtlasMetrics::from_outline(&nan, 64.0).is_err());
        assert!(AtlasMetrics::from_outline(&hhea_only(), 0.0).is_err());
    }

    #[test]
    fn outline_metrics_from_atlas() {
        let common = Common {
            line_height: 32,
            base: 26,
            pages: 1,
            ..Default::default()
        };
        let metrics = OutlineMetrics::from_atlas(&common, GENERATED_UNITS_PER_EM).unwrap();
        assert_eq!(metrics.scale, 31.25);
        assert_eq!(metrics.ascender, 813);
        assert_eq!(metrics.descender, -188);
        assert_eq!(metrics.to_units(22.0), 688);
    }

    #[test]
    fn zero_line_height_is_rejected() {
        let common = Common::default();
        assert!(matches!(
            OutlineMetrics::from_atlas(&common, GENERATED_UNITS_PER_EM),
            Err(ConvertError::Metrics(_))
        ));
    }
}
