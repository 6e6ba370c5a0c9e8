//! The in-memory outline font produced from a bitmap atlas.

use kurbo::Point;

/// A closed polygon in font units, y pointing up.
///
/// The closing segment back to the first point is implied.
pub type Contour = Vec<Point>;

/// One glyph of an [`OutlineFont`].
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineGlyph {
    pub name: String,
    /// The Unicode code point; 0 for `.notdef`.
    pub codepoint: u32,
    /// Advance in font units.
    pub advance_width: f64,
    pub contours: Vec<Contour>,
}

/// A font made of polygon glyphs, with `.notdef` always first.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineFont {
    pub family_name: String,
    pub units_per_em: u16,
    pub ascender: i32,
    /// Negative for a descent below the baseline.
    pub descender: i32,
    pub glyphs: Vec<OutlineGlyph>,
}

impl OutlineGlyph {
    /// The placeholder glyph: a box half an em wide reaching up to the ascender.
    pub fn notdef(units_per_em: u16, ascender: i32) -> Self {
        let width = (units_per_em as f64 / 2.0).round();
        OutlineGlyph {
            name: ".notdef".into(),
            codepoint: 0,
            advance_width: width,
            contours: vec![rectangle(0.0, 0.0, width, ascender as f64)],
        }
    }

    /// The character this glyph is mapped to, if any.
    pub fn character(&self) -> Option<char> {
        match self.codepoint {
            0 => None,
            cp => char::from_u32(cp),
        }
    }
}

impl OutlineFont {
    /// Look up the glyph mapped to `ch`.
    pub fn glyph_for_char(&self, ch: char) -> Option<&OutlineGlyph> {
        self.glyphs
            .iter()
            .skip(1)
            .find(|glyph| glyph.codepoint == ch as u32)
    }

    /// The mapped characters, in glyph order.
    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        self.glyphs.iter().filter_map(OutlineGlyph::character)
    }
}

/// A clockwise (in y-up space) rectangle spanning `x0..x1` and `y0..y1`.
pub(crate) fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
    vec![
        Point::new(x0, y0),
        Point::new(x0, y1),
        Point::new(x1, y1),
        Point::new(x1, y0),
    ]
}

/// The PostScript name for the glyph of `ch`.
///
/// ASCII letters name themselves; everything else gets a `uniXXXX` name
/// (or `uXXXXX` outside the Basic Multilingual Plane).
pub fn glyph_name(ch: char) -> String {
    let cp = ch as u32;
    if ch.is_ascii_alphabetic() {
        ch.to_string()
    } else if cp <= 0xFFFF {
        format!("uni{cp:04X}")
    } else {
        format!("u{cp:05X}")
    }
}

/// The signed area of a polygon; negative for clockwise winding in y-up space.
#[cfg(test)]
pub(crate) fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}
