//! Rendering glyph outlines into binary pixel cells.
//!
//! Outlines are flattened to line segments and filled with the nonzero
//! winding rule, sampling each pixel at its centre. There is no
//! antialiasing: a pixel is either opaque white or fully transparent, which
//! keeps cell boundaries crisp for the runtime renderer and for tracing.

use kurbo::{Affine, BezPath, PathEl, Point};
use write_fonts::OtRound;

use crate::{error::ConvertError, pixmap::Pixmap, source::SourceGlyph};

/// Curve flattening tolerance, in pixels.
const FLATTEN_TOLERANCE: f64 = 0.1;

/// The color of covered pixels.
pub const INK: [u8; 4] = [255, 255, 255, 255];

/// Draws outlines into cells as tall as a line of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphRasterizer {
    /// Blank columns kept left and right of the ink.
    pub padding: u32,
}

impl Default for GlyphRasterizer {
    fn default() -> Self {
        GlyphRasterizer { padding: 1 }
    }
}

/// A rendered glyph cell.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterCell {
    pub pixmap: Pixmap,
    /// Horizontal offset from the pen position to the left edge of the cell.
    pub xoffset: i32,
}

/// A line segment in pixel space.
#[derive(Clone, Copy, Debug)]
struct Edge {
    p0: Point,
    p1: Point,
}

impl GlyphRasterizer {
    /// The width of the cell [`rasterize`](Self::rasterize) would produce,
    /// or `None` for a glyph without ink.
    ///
    /// Nothing is drawn, so this is cheap enough to size up a glyph before
    /// committing to it.
    pub fn cell_width(&self, glyph: &SourceGlyph, scale: f64) -> Option<u32> {
        let bounds = glyph.bounds?;
        let ink_width = ((bounds.x1 - bounds.x0) * scale).ceil();
        if !(ink_width > 0.0) {
            return None;
        }
        // float to int casts saturate
        Some((ink_width as u32).saturating_add(self.padding.saturating_mul(2)))
    }

    /// Render `glyph` at `scale` pixels per font unit.
    ///
    /// The baseline lands `baseline_y` pixels below the top of a cell
    /// `cell_height` pixels tall, and the left edge of the ink sits
    /// `padding` pixels in from the left. Returns `None` for glyphs without
    /// ink, which only contribute an advance.
    pub fn rasterize(
        &self,
        glyph: &SourceGlyph,
        scale: f64,
        baseline_y: f64,
        cell_height: u32,
    ) -> Result<Option<RasterCell>, ConvertError> {
        let (Some(bounds), Some(width)) = (glyph.bounds, self.cell_width(glyph, scale)) else {
            return Ok(None);
        };
        let mut pixmap = Pixmap::try_new(width, cell_height)?;

        let left = bounds.x0 * scale;
        let transform = Affine::new([
            scale,
            0.0,
            0.0,
            -scale,
            self.padding as f64 - left,
            baseline_y,
        ]);
        let edges = flatten_edges(&glyph.path, transform);
        fill_nonzero(&mut pixmap, &edges);

        let left: f64 = left.ot_round();
        Ok(Some(RasterCell {
            pixmap,
            xoffset: left as i32 - self.padding as i32,
        }))
    }
}

/// Flatten a path into closed polygons, returned as a list of edges.
fn flatten_edges(path: &BezPath, transform: Affine) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut start = Point::ZERO;
    let mut p0 = Point::ZERO;
    let iter = path.iter().map(|el| transform * el);
    kurbo::flatten(iter, FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            // contours are implicitly closed
            if p0 != start {
                edges.push(Edge { p0, p1: start });
            }
            start = p;
            p0 = p;
        }
        PathEl::LineTo(p) => {
            edges.push(Edge { p0, p1: p });
            p0 = p;
        }
        PathEl::ClosePath => {
            if p0 != start {
                edges.push(Edge { p0, p1: start });
            }
            p0 = start;
        }
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => (),
    });
    if p0 != start {
        edges.push(Edge { p0, p1: start });
    }
    edges
}

/// Fill pixels whose centres have a nonzero winding number.
fn fill_nonzero(pixmap: &mut Pixmap, edges: &[Edge]) {
    let width = pixmap.width() as f64;
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for row in 0..pixmap.height() {
        let y = row as f64 + 0.5;
        crossings.clear();
        for edge in edges {
            let (p0, p1) = (edge.p0, edge.p1);
            if p0.y == p1.y {
                continue;
            }
            let (lo, hi, dir) = if p0.y < p1.y {
                (p0, p1, 1)
            } else {
                (p1, p0, -1)
            };
            if y < lo.y || y >= hi.y {
                continue;
            }
            let t = (y - lo.y) / (hi.y - lo.y);
            crossings.push((lo.x + t * (hi.x - lo.x), dir));
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for (i, (x, dir)) in crossings.iter().enumerate() {
            winding += dir;
            let Some((next_x, _)) = crossings.get(i + 1) else {
                break;
            };
            if winding == 0 {
                continue;
            }
            // pixel centres in [x, next_x)
            let first = (x - 0.5).ceil().clamp(0.0, width) as u32;
            let end = (next_x - 0.5).ceil().clamp(0.0, width) as u32;
            if end > first {
                pixmap.fill_rect(first, row, end - first, 1, INK);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Shape};

    use super::*;

    fn glyph(path: BezPath, advance: f64) -> SourceGlyph {
        SourceGlyph::new(path, advance)
    }

    fn rect_path(rect: Rect) -> BezPath {
        rect.to_path(0.1)
    }

    /// Rows of the cell as strings, `#` for ink.
    fn rows(pixmap: &Pixmap) -> Vec<String> {
        (0..pixmap.height())
            .map(|y| {
                (0..pixmap.width())
                    .map(|x| match pixmap.pixel(x, y) {
                        Some(INK) => '#',
                        _ => '.',
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn block_fills_exact_cell() {
        let block = glyph(rect_path(Rect::new(0.0, -187.5, 625.0, 812.5)), 688.0);
        let cell = GlyphRasterizer::default()
            .rasterize(&block, 0.032, 26.0, 32)
            .unwrap()
            .unwrap();
        assert_eq!(cell.pixmap.width(), 22);
        assert_eq!(cell.pixmap.height(), 32);
        assert_eq!(cell.xoffset, -1);
        for row in rows(&cell.pixmap) {
            assert_eq!(row, format!(".{}.", "#".repeat(20)));
        }
    }

    #[test]
    fn glyph_is_placed_on_baseline() {
        // a 2x2 pixel square sitting on the baseline, starting at x = 3px
        let square = glyph(rect_path(Rect::new(30.0, 0.0, 50.0, 20.0)), 60.0);
        let cell = GlyphRasterizer::default()
            .rasterize(&square, 0.1, 4.0, 6)
            .unwrap()
            .unwrap();
        assert_eq!(cell.xoffset, 2);
        assert_eq!(
            rows(&cell.pixmap),
            vec!["....", "....", ".##.", ".##.", "....", "...."]
        );
    }

    #[test]
    fn nonzero_fills_overlaps_and_keeps_holes() {
        let mut path = BezPath::new();
        // outer square, counter-clockwise in y-up space
        path.move_to((0.0, 0.0));
        path.line_to((6.0, 0.0));
        path.line_to((6.0, 6.0));
        path.line_to((0.0, 6.0));
        path.close_path();
        // hole, wound the other way
        path.move_to((2.0, 2.0));
        path.line_to((2.0, 4.0));
        path.line_to((4.0, 4.0));
        path.line_to((4.0, 2.0));
        path.close_path();
        // overlapping square wound like the outer one
        path.move_to((4.0, 0.0));
        path.line_to((6.0, 0.0));
        path.line_to((6.0, 2.0));
        path.line_to((4.0, 2.0));
        path.close_path();
        let rasterizer = GlyphRasterizer { padding: 0 };
        let cell = rasterizer
            .rasterize(&glyph(path, 6.0), 1.0, 6.0, 6)
            .unwrap()
            .unwrap();
        assert_eq!(
            rows(&cell.pixmap),
            vec!["######", "######", "##..##", "##..##", "######", "######"]
        );
    }

    #[test]
    fn curves_are_flattened() {
        // a quarter-round shape bulging to the right
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((100.0, 0.0));
        path.quad_to((100.0, 100.0), (0.0, 100.0));
        path.close_path();
        let cell = GlyphRasterizer { padding: 0 }
            .rasterize(&glyph(path, 100.0), 0.1, 10.0, 10)
            .unwrap()
            .unwrap();
        let rows = rows(&cell.pixmap);
        assert_eq!(rows[0], "####......");
        assert_eq!(rows[5], "#########.");
        assert_eq!(rows[9], "##########");
    }

    #[test]
    fn blank_glyphs_have_no_cell() {
        let rasterizer = GlyphRasterizer::default();
        let space = glyph(BezPath::new(), 250.0);
        assert_eq!(rasterizer.rasterize(&space, 0.05, 40.0, 50).unwrap(), None);
        let mut hairline = BezPath::new();
        hairline.move_to((10.0, 0.0));
        hairline.line_to((10.0, 500.0));
        let hairline = glyph(hairline, 0.0);
        assert_eq!(
            rasterizer.rasterize(&hairline, 0.05, 40.0, 50).unwrap(),
            None
        );
    }

    #[test]
    fn zero_height_cell_is_unavailable() {
        let block = glyph(rect_path(Rect::new(0.0, 0.0, 100.0, 100.0)), 100.0);
        assert!(matches!(
            GlyphRasterizer::default().rasterize(&block, 0.1, 0.0, 0),
            Err(ConvertError::CanvasUnavailable { .. })
        ));
    }

    #[test]
    fn cell_width_matches_rendered_cell() {
        let rasterizer = GlyphRasterizer::default();
        let block = glyph(rect_path(Rect::new(0.0, -187.5, 625.0, 812.5)), 688.0);
        assert_eq!(rasterizer.cell_width(&block, 0.032), Some(22));
        assert_eq!(rasterizer.cell_width(&glyph(BezPath::new(), 250.0), 0.032), None);
    }

    #[test]
    fn cell_width_saturates() {
        let rasterizer = GlyphRasterizer { padding: u32::MAX };
        let wide = glyph(rect_path(Rect::new(0.0, 0.0, 1e12, 10.0)), 1e12);
        assert_eq!(rasterizer.cell_width(&wide, 1.0), Some(u32::MAX));
    }
}
