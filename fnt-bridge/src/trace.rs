//! Tracing atlas cells back into outlines.
//!
//! Each row of a cell is split into maximal runs of ink pixels and every run
//! becomes its own rectangle. Rows are not merged, so the outline is a stack
//! of one pixel tall bars; filling all of them reproduces the bitmap exactly.

use crate::{
    fnt::CharRecord,
    outline::{rectangle, Contour},
    pixmap::Pixmap,
};

/// Pixels with an alpha above this are ink.
pub const ALPHA_THRESHOLD: u8 = 128;

/// The binarized coverage of one cell.
///
/// Only the part of the cell that overlaps its page is stored; the rest
/// reads as transparent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlphaMask {
    width: usize,
    height: usize,
    // the stored window, in cell coordinates
    left: usize,
    top: usize,
    stored_width: usize,
    stored_height: usize,
    ink: Vec<bool>,
}

impl AlphaMask {
    /// Extract the `width` x `height` region at `(x, y)` of `page`.
    ///
    /// Pixels outside the page read as transparent.
    pub fn from_region(page: &Pixmap, x: i32, y: i32, width: i32, height: i32) -> Self {
        let width = width.max(0) as usize;
        let height = height.max(0) as usize;
        let (left, stored_width) = clip_span(x, width, page.width());
        let (top, stored_height) = clip_span(y, height, page.height());
        let mut ink = Vec::with_capacity(stored_width * stored_height);
        for row in 0..stored_height {
            let py = (y as i64 + (top + row) as i64) as u32;
            for col in 0..stored_width {
                let px = (x as i64 + (left + col) as i64) as u32;
                let alpha = page.pixel(px, py).map(|rgba| rgba[3]).unwrap_or(0);
                ink.push(alpha > ALPHA_THRESHOLD);
            }
        }
        AlphaMask {
            width,
            height,
            left,
            top,
            stored_width,
            stored_height,
            ink,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The rows that can hold ink.
    pub fn ink_rows(&self) -> std::ops::Range<usize> {
        self.top..self.top + self.stored_height
    }

    pub fn is_ink(&self, x: usize, y: usize) -> bool {
        let (Some(col), Some(row)) = (x.checked_sub(self.left), y.checked_sub(self.top)) else {
            return false;
        };
        col < self.stored_width
            && row < self.stored_height
            && self.ink[row * self.stored_width + col]
    }

    /// The maximal runs of ink in `row`, as inclusive column ranges.
    pub fn runs(&self, row: usize) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut col = self.left;
        let end = self.left + self.stored_width;
        while col < end {
            if !self.is_ink(col, row) {
                col += 1;
                continue;
            }
            let start = col;
            while self.is_ink(col + 1, row) {
                col += 1;
            }
            runs.push((start, col));
            col += 1;
        }
        runs
    }
}

/// The part of `[origin, origin + len)` inside `[0, limit)`, as an offset
/// from `origin` and a length.
fn clip_span(origin: i32, len: usize, limit: u32) -> (usize, usize) {
    let origin = origin as i64;
    let start = origin.max(0);
    let end = (origin + len as i64).min(limit as i64);
    if end <= start {
        return (0, 0);
    }
    ((start - origin) as usize, (end - start) as usize)
}

/// Turn the ink of a cell into rectangle contours in font units.
///
/// `base` is the atlas baseline in pixels and `scale` the number of font
/// units per pixel. The top of the cell maps to `(base - yoffset) * scale`
/// and y grows upward, so pixel rows are flipped.
pub fn vectorize(mask: &AlphaMask, record: &CharRecord, base: i32, scale: f64) -> Vec<Contour> {
    let top = (base - record.yoffset) as f64 * scale;
    let x_units = |px: usize| (record.xoffset as f64 + px as f64) * scale;
    let y_units = |py: usize| top - py as f64 * scale;
    let mut contours = Vec::new();
    for row in mask.ink_rows() {
        for (start, end) in mask.runs(row) {
            contours.push(rectangle(
                x_units(start),
                y_units(row + 1),
                x_units(end + 1),
                y_units(row),
            ));
        }
    }
    contours
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;
    use crate::outline::signed_area;

    /// A page from rows of `#` (opaque) and `.` (transparent).
    fn page(rows: &[&str]) -> Pixmap {
        let mut pixmap = Pixmap::try_new(rows[0].len() as u32, rows.len() as u32).unwrap();
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    pixmap.set_pixel(x as u32, y as u32, [255, 255, 255, 255]);
                }
            }
        }
        pixmap
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut pixmap = Pixmap::try_new(3, 1).unwrap();
        pixmap.set_pixel(0, 0, [0, 0, 0, 128]);
        pixmap.set_pixel(1, 0, [0, 0, 0, 129]);
        pixmap.set_pixel(2, 0, [255, 255, 255, 255]);
        let mask = AlphaMask::from_region(&pixmap, 0, 0, 3, 1);
        assert!(!mask.is_ink(0, 0));
        assert!(mask.is_ink(1, 0));
        assert!(mask.is_ink(2, 0));
    }

    #[test]
    fn region_outside_page_is_transparent() {
        let pixmap = page(&["##", "##"]);
        let mask = AlphaMask::from_region(&pixmap, 1, -1, 3, 3);
        assert_eq!(mask.width(), 3);
        assert!(!mask.is_ink(0, 0));
        assert!(mask.is_ink(0, 1));
        assert!(mask.is_ink(0, 2));
        assert!(!mask.is_ink(1, 1));
    }

    #[test]
    fn runs_per_row() {
        let pixmap = page(&["##.###.#", "........", "########"]);
        let mask = AlphaMask::from_region(&pixmap, 0, 0, 8, 3);
        assert_eq!(mask.runs(0), vec![(0, 1), (3, 5), (7, 7)]);
        assert!(mask.runs(1).is_empty());
        assert_eq!(mask.runs(2), vec![(0, 7)]);
    }

    #[test]
    fn full_block_maps_to_font_units() {
        let pixmap = page(&["##", "##"]);
        let mask = AlphaMask::from_region(&pixmap, 0, 0, 2, 2);
        let record = CharRecord {
            id: 'A' as i32,
            width: 2,
            height: 2,
            xoffset: 1,
            yoffset: 0,
            ..Default::default()
        };
        let contours = vectorize(&mask, &record, 2, 10.0);
        // rows are not merged
        assert_eq!(contours.len(), 2);
        assert_eq!(
            contours[0],
            vec![
                Point::new(10.0, 10.0),
                Point::new(10.0, 20.0),
                Point::new(30.0, 20.0),
                Point::new(30.0, 10.0),
            ]
        );
        assert_eq!(contours[1][0], Point::new(10.0, 0.0));
        assert!(contours.iter().all(|c| signed_area(c) < 0.0));
    }

    #[test]
    fn yoffset_moves_cell_down() {
        let pixmap = page(&["#"]);
        let mask = AlphaMask::from_region(&pixmap, 0, 0, 1, 1);
        let record = CharRecord {
            width: 1,
            height: 1,
            yoffset: 3,
            ..Default::default()
        };
        let contours = vectorize(&mask, &record, 4, 100.0);
        assert_eq!(contours[0][0], Point::new(0.0, 0.0));
        assert_eq!(contours[0][2], Point::new(100.0, 100.0));
    }

    #[test]
    fn empty_mask_has_no_contours() {
        let pixmap = page(&["...", "..."]);
        let mask = AlphaMask::from_region(&pixmap, 0, 0, 3, 2);
        assert!(vectorize(&mask, &CharRecord::default(), 10, 1.0).is_empty());
    }

    #[test]
    fn huge_region_keeps_only_the_page_overlap() {
        let pixmap = page(&["##", "#."]);
        let mask = AlphaMask::from_region(&pixmap, 0, 0, 2_000_000_000, 2_000_000_000);
        assert_eq!(mask.width(), 2_000_000_000);
        assert_eq!(mask.ink_rows(), 0..2);
        assert_eq!(mask.runs(0), vec![(0, 1)]);
        assert_eq!(mask.runs(1), vec![(0, 0)]);
        assert!(!mask.is_ink(5, 0));
        assert!(!mask.is_ink(0, 1_999_999_999));
        let record = CharRecord {
            width: 2_000_000_000,
            height: 2_000_000_000,
            ..Default::default()
        };
        assert_eq!(vectorize(&mask, &record, 2, 1.0).len(), 2);
    }

    #[test]
    fn region_beside_the_page_is_empty() {
        let pixmap = page(&["##", "##"]);
        let mask = AlphaMask::from_region(&pixmap, 5, 0, 3, 2);
        assert!(mask.ink_rows().is_empty());
        assert!(mask.runs(0).is_empty());
        let mask = AlphaMask::from_region(&pixmap, -10, -10, 3, 3);
        assert!(mask.ink_rows().is_empty());
    }
}
