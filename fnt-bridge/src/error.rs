//! Errors raised while converting between bitmap and outline fonts.

use thiserror::Error;

/// An error that stops a conversion step.
///
/// Per-glyph problems (an oversized cell, a character missing from the
/// source) are logged and skipped by the drivers in [`crate::convert`]; the
/// variants here are only returned when a step cannot produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The `.fnt` text is malformed or incomplete.
    #[error("invalid .fnt data: {0}")]
    Format(String),
    /// A page image is missing, or was supplied under the wrong name.
    #[error("missing page image: {0}")]
    MissingAsset(String),
    /// Font metrics are degenerate and no scale can be derived from them.
    #[error("could not calculate font metrics: {0}")]
    Metrics(String),
    /// A glyph cell is larger than an empty atlas page.
    #[error("cell of {width}x{height} does not fit an atlas page of {atlas_width}x{atlas_height}")]
    CellTooLarge {
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },
    /// Nothing survived character-set filtering.
    #[error("no usable glyphs: {0}")]
    EmptyResult(String),
    /// A drawing surface of the requested size could not be created.
    #[error("cannot create a {width}x{height} drawing surface")]
    CanvasUnavailable { width: u32, height: u32 },
    #[error("PNG error: {0}")]
    Png(String),
    #[error("error reading font data: {0}")]
    FontRead(String),
    #[error("error compiling font: {0}")]
    FontWrite(String),
}

impl ConvertError {
    /// Returns `true` for errors that only affect a single glyph.
    pub fn is_per_glyph(&self) -> bool {
        matches!(self, ConvertError::CellTooLarge { .. })
    }
}

impl From<png::DecodingError> for ConvertError {
    fn from(e: png::DecodingError) -> Self {
        ConvertError::Png(e.to_string())
    }
}

impl From<png::EncodingError> for ConvertError {
    fn from(e: png::EncodingError) -> Self {
        ConvertError::Png(e.to_string())
    }
}
