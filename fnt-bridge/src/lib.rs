//! Converting between bitmap fonts and outline fonts.
//!
//! A bitmap font here is a BMFont text descriptor (`.fnt`) plus one or more
//! PNG atlas pages. In one direction every atlas cell is traced into
//! rectangle contours and compiled into a TrueType font; in the other an
//! outline font is rendered, one line-high cell per glyph, onto shelf-packed
//! atlas pages.
//!
//! ```no_run
//! # fn convert(fnt: &str, png: Vec<u8>) -> Result<(), fnt_bridge::ConvertError> {
//! use fnt_bridge::FntToTtf;
//!
//! let mut driver = FntToTtf::new();
//! driver.load_fnt("My Font", fnt)?;
//! driver.attach_png_pages(vec![("atlas.png".to_string(), png)])?;
//! let ttf = driver.generate()?.to_ttf()?;
//! # Ok(())
//! # }
//! ```
//!
//! The pieces each pipeline is made of ([`AtlasPacker`], [`GlyphRasterizer`],
//! [`vectorize`], the metric conversions) are public so they can be used on
//! their own.

#![forbid(unsafe_code)]

mod atlas;
pub mod charset;
mod convert;
mod error;
mod fnt;
mod metrics;
mod outline;
mod pixmap;
mod raster;
mod source;
mod trace;
mod ttf;

pub use atlas::{AtlasPacker, CellPlacement, DEFAULT_SPACING};
pub use charset::{CharacterSetSelection, CHARACTER_SETS};
pub use convert::{
    ttf_file_name, AtlasOptions, AtlasPage, BitmapFont, FntToTtf, FntToTtfStage, PageAsset,
    TtfToFnt, TtfToFntStage,
};
pub use error::ConvertError;
pub use fnt::{CharRecord, Common, FontDescriptor, Info, Page};
pub use metrics::{
    AtlasMetrics, Os2Metrics, OutlineMetrics, VerticalMetrics, GENERATED_UNITS_PER_EM,
};
pub use outline::{glyph_name, Contour, OutlineFont, OutlineGlyph};
pub use pixmap::{Pixmap, MAX_SURFACE_SIDE};
pub use raster::{GlyphRasterizer, RasterCell, INK};
pub use source::{OutlineSource, SkrifaSource, SourceGlyph};
pub use trace::{vectorize, AlphaMask, ALPHA_THRESHOLD};
