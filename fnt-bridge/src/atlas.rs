//! Shelf packing of glyph cells onto fixed-size atlas pages.
//!
//! Cells are placed left to right along a row; when a cell does not fit the
//! remaining width the cursor wraps to a new row below the tallest cell of
//! the current one, and when the row does not fit the remaining height a new
//! page is started. Every glyph cell is as tall as the line height, so rows
//! are uniform in practice.
//!
//! The packer is a single-pass, order-dependent accumulator: the same
//! sequence of requests always produces the same layout.

use crate::{error::ConvertError, pixmap::Pixmap};

/// The default margin between cells and around the page edge, in pixels.
pub const DEFAULT_SPACING: u32 = 2;

/// Where an allocated cell lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellPlacement {
    /// Index of the page, in creation order.
    pub page: usize,
    pub x: u32,
    pub y: u32,
}

/// Assigns cells to pages and owns the page surfaces while they are drawn.
#[derive(Debug)]
pub struct AtlasPacker {
    width: u32,
    height: u32,
    spacing: u32,
    pages: Vec<Pixmap>,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl AtlasPacker {
    pub fn new(width: u32, height: u32, spacing: u32) -> Self {
        AtlasPacker {
            width,
            height,
            spacing,
            pages: Vec::new(),
            cursor_x: spacing,
            cursor_y: spacing,
            row_height: 0,
        }
    }

    /// Find a spot for a `width` x `height` cell.
    ///
    /// Fails with [`ConvertError::CellTooLarge`] if the cell, with its
    /// margins, is larger than an empty page. That error only concerns this
    /// cell; the packer is left untouched and later requests may succeed.
    pub fn allocate(&mut self, width: u32, height: u32) -> Result<CellPlacement, ConvertError> {
        self.check(width, height)?;
        if self.pages.is_empty() {
            self.start_page()?;
        }
        if self.cursor_x + width + self.spacing > self.width {
            self.cursor_x = self.spacing;
            self.cursor_y += self.row_height + self.spacing;
            self.row_height = 0;
        }
        if self.cursor_y + height + self.spacing > self.height {
            self.start_page()?;
        }

        let placement = CellPlacement {
            page: self.current_page(),
            x: self.cursor_x,
            y: self.cursor_y,
        };
        self.cursor_x += width + self.spacing;
        self.row_height = self.row_height.max(height);
        Ok(placement)
    }

    /// Whether a `width` x `height` cell, with its margins, fits on an empty
    /// page. Fails with the same [`ConvertError::CellTooLarge`] as
    /// [`allocate`](Self::allocate), without placing anything.
    pub fn check(&self, width: u32, height: u32) -> Result<(), ConvertError> {
        let margins = self.spacing.saturating_mul(2);
        if width.saturating_add(margins) > self.width
            || height.saturating_add(margins) > self.height
        {
            return Err(ConvertError::CellTooLarge {
                width,
                height,
                atlas_width: self.width,
                atlas_height: self.height,
            });
        }
        Ok(())
    }

    /// Copy a drawn cell onto the page it was allocated on.
    pub fn blit(&mut self, placement: CellPlacement, cell: &Pixmap) {
        if let Some(page) = self.pages.get_mut(placement.page) {
            page.blit(cell, placement.x, placement.y);
        }
    }

    /// The index of the newest page; 0 before anything was allocated.
    pub fn current_page(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Hand the pages over to the caller.
    ///
    /// A packer that never placed a cell still yields one blank page, so
    /// the descriptor written alongside always has a texture to point at.
    pub fn finish(mut self) -> Result<Vec<Pixmap>, ConvertError> {
        if self.pages.is_empty() {
            self.start_page()?;
        }
        Ok(self.pages)
    }

    fn start_page(&mut self) -> Result<(), ConvertError> {
        self.pages.push(Pixmap::try_new(self.width, self.height)?);
        self.cursor_x = self.spacing;
        self.cursor_y = self.spacing;
        self.row_height = 0;
        log::debug!("started atlas page {}", self.pages.len() - 1);
        Ok(())
    }
}
