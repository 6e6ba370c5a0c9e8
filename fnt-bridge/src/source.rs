//! Outline fonts that can be rendered into an atlas.

use kurbo::{BezPath, Rect, Shape};
use skrifa::{
    outline::{DrawSettings, OutlinePen},
    prelude::{LocationRef, Size},
    raw::{FontRef, TableProvider},
    string::StringId,
    GlyphId, MetadataProvider,
};

use crate::{
    error::ConvertError,
    metrics::{Os2Metrics, VerticalMetrics},
    outline::OutlineFont,
};

/// A glyph outline in font units, y pointing up.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceGlyph {
    pub path: BezPath,
    /// The ink bounds, or `None` for a glyph without contours.
    pub bounds: Option<Rect>,
    pub advance_width: f64,
}

impl SourceGlyph {
    pub fn new(path: BezPath, advance_width: f64) -> Self {
        let bounds = (!path.elements().is_empty()).then(|| path.bounding_box());
        SourceGlyph {
            path,
            bounds,
            advance_width,
        }
    }
}

/// Anything that maps characters to outlines.
pub trait OutlineSource {
    fn family_name(&self) -> String;

    fn vertical_metrics(&self) -> VerticalMetrics;

    /// The outline for `ch`, or `None` when the font has no glyph for it.
    fn glyph(&self, ch: char) -> Option<SourceGlyph>;
}

/// A TrueType or OpenType font file read with skrifa.
pub struct SkrifaSource {
    data: Vec<u8>,
    family_name: String,
    metrics: VerticalMetrics,
}

impl SkrifaSource {
    /// Parse a font file, reading its names and metrics up front.
    pub fn new(data: Vec<u8>) -> Result<Self, ConvertError> {
        let font = FontRef::new(&data).map_err(|e| ConvertError::FontRead(e.to_string()))?;
        let head = font
            .head()
            .map_err(|e| ConvertError::FontRead(format!("head: {e}")))?;
        let hhea = font
            .hhea()
            .map_err(|e| ConvertError::FontRead(format!("hhea: {e}")))?;
        let os2 = font.os2().ok().map(|os2| Os2Metrics {
            win_ascent: os2.us_win_ascent(),
            win_descent: os2.us_win_descent(),
            typo_line_gap: os2.s_typo_line_gap(),
        });
        let metrics = VerticalMetrics {
            units_per_em: head.units_per_em(),
            ascender: hhea.ascender().to_i16() as f64,
            descender: hhea.descender().to_i16() as f64,
            line_gap: hhea.line_gap().to_i16() as f64,
            os2,
        };
        let family_name = font
            .localized_strings(StringId::FAMILY_NAME)
            .english_or_first()
            .map(|name| name.to_string())
            .unwrap_or_default();
        log::debug!("loaded font '{family_name}' with {metrics:?}");
        Ok(SkrifaSource {
            data,
            family_name,
            metrics,
        })
    }

    fn font(&self) -> Option<FontRef<'_>> {
        FontRef::new(&self.data).ok()
    }
}

impl OutlineSource for SkrifaSource {
    fn family_name(&self) -> String {
        self.family_name.clone()
    }

    fn vertical_metrics(&self) -> VerticalMetrics {
        self.metrics
    }

    fn glyph(&self, ch: char) -> Option<SourceGlyph> {
        let font = self.font()?;
        let gid = font.charmap().map(ch)?;
        if gid == GlyphId::NOTDEF {
            return None;
        }
        let advance_width = font
            .glyph_metrics(Size::unscaled(), LocationRef::default())
            .advance_width(gid)
            .unwrap_or_default() as f64;
        let mut pen = BezPathPen::default();
        if let Some(outline) = font.outline_glyphs().get(gid) {
            let settings = DrawSettings::unhinted(Size::unscaled(), LocationRef::default());
            if let Err(e) = outline.draw(settings, &mut pen) {
                log::warn!("failed to draw glyph for {ch:?}: {e}");
                pen.path = BezPath::new();
            }
        }
        Some(SourceGlyph::new(pen.path, advance_width))
    }
}

impl OutlineSource for OutlineFont {
    fn family_name(&self) -> String {
        self.family_name.clone()
    }

    fn vertical_metrics(&self) -> VerticalMetrics {
        VerticalMetrics {
            units_per_em: self.units_per_em,
            ascender: self.ascender as f64,
            descender: self.descender as f64,
            line_gap: 0.0,
            os2: None,
        }
    }

    fn glyph(&self, ch: char) -> Option<SourceGlyph> {
        let glyph = self.glyph_for_char(ch)?;
        let mut path = BezPath::new();
        for contour in glyph.contours.iter().filter(|c| !c.is_empty()) {
            path.move_to(contour[0]);
            for point in &contour[1..] {
                path.line_to(*point);
            }
            path.close_path();
        }
        Some(SourceGlyph::new(path, glyph.advance_width))
    }
}

/// Collects skrifa drawing commands into a kurbo path.
#[derive(Default)]
struct BezPathPen {
    path: BezPath,
}

impl OutlinePen for BezPathPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.path
            .quad_to((cx0 as f64, cy0 as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.path.curve_to(
            (cx0 as f64, cy0 as f64),
            (cx1 as f64, cy1 as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}
