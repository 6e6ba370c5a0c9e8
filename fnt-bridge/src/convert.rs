//! The two conversion pipelines.
//!
//! [`FntToTtf`] turns a `.fnt` descriptor and its PNG pages into an
//! [`OutlineFont`]; [`TtfToFnt`] renders an [`OutlineSource`] into a
//! [`BitmapFont`]. Both are small state machines: inputs are supplied one
//! step at a time, and a step that fails leaves the driver in the stage it
//! was in before, so the caller can fix the input and retry without starting
//! over.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::{
    atlas::{AtlasPacker, DEFAULT_SPACING},
    charset::CharacterSetSelection,
    error::ConvertError,
    fnt::{strip_quotes, CharRecord, Common, FontDescriptor, Info, Page},
    metrics::{AtlasMetrics, OutlineMetrics, GENERATED_UNITS_PER_EM},
    outline::{glyph_name, OutlineFont, OutlineGlyph},
    pixmap::{Pixmap, MAX_SURFACE_SIDE},
    raster::GlyphRasterizer,
    source::OutlineSource,
    trace::{vectorize, AlphaMask},
};

/// Settings for rendering an outline font into an atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasOptions {
    /// Pixels per em.
    pub font_size: u32,
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Margin between cells and around the page edge.
    pub spacing: u32,
    /// Blank columns left and right of each glyph's ink.
    pub padding: u32,
}

impl Default for AtlasOptions {
    fn default() -> Self {
        AtlasOptions {
            font_size: 64,
            atlas_width: 1024,
            atlas_height: 1024,
            spacing: DEFAULT_SPACING,
            padding: 1,
        }
    }
}

impl AtlasOptions {
    /// Reject settings that could never produce an atlas.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.font_size == 0 {
            return Err(ConvertError::Metrics("font size must be positive".into()));
        }
        if self.atlas_width == 0
            || self.atlas_height == 0
            || self.atlas_width > MAX_SURFACE_SIDE
            || self.atlas_height > MAX_SURFACE_SIDE
        {
            return Err(ConvertError::CanvasUnavailable {
                width: self.atlas_width,
                height: self.atlas_height,
            });
        }
        Ok(())
    }
}

/// A decoded page image and the file name it was supplied under.
#[derive(Clone, Debug, PartialEq)]
pub struct PageAsset {
    pub name: String,
    pub pixmap: Pixmap,
}

/// Progress of a [`FntToTtf`] conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FntToTtfStage {
    Idle,
    /// A descriptor is loaded; some pages are still missing.
    SourceLoaded,
    /// Every declared page has an image.
    AssetsResolved,
    Generating,
    Done,
}

/// Builds an outline font from a bitmap font.
#[derive(Debug)]
pub struct FntToTtf {
    stage: FntToTtfStage,
    selection: CharacterSetSelection,
    project_name: String,
    descriptor: Option<FontDescriptor>,
    /// One slot per declared page, in declaration order.
    page_images: Vec<Option<Pixmap>>,
    output: Option<OutlineFont>,
}

impl Default for FntToTtf {
    fn default() -> Self {
        Self::new()
    }
}

impl FntToTtf {
    pub fn new() -> Self {
        FntToTtf {
            stage: FntToTtfStage::Idle,
            selection: CharacterSetSelection::all(),
            project_name: String::new(),
            descriptor: None,
            page_images: Vec::new(),
            output: None,
        }
    }

    pub fn stage(&self) -> FntToTtfStage {
        self.stage
    }

    pub fn selection(&self) -> &CharacterSetSelection {
        &self.selection
    }

    /// Change which character sets are traced.
    ///
    /// A previously generated font is discarded.
    pub fn selection_mut(&mut self) -> &mut CharacterSetSelection {
        if self.stage == FntToTtfStage::Done {
            self.stage = FntToTtfStage::AssetsResolved;
            self.output = None;
        }
        &mut self.selection
    }

    pub fn descriptor(&self) -> Option<&FontDescriptor> {
        self.descriptor.as_ref()
    }

    /// The most recently generated font.
    pub fn output(&self) -> Option<&OutlineFont> {
        self.output.as_ref()
    }

    /// Parse `text` as the descriptor of a font called `project_name`.
    ///
    /// Replaces any previously loaded descriptor and forgets its pages.
    pub fn load_fnt(&mut self, project_name: &str, text: &str) -> Result<(), ConvertError> {
        let descriptor = FontDescriptor::parse(text)?;
        if descriptor.pages.is_empty() {
            return Err(ConvertError::EmptyResult(format!(
                "'{project_name}' does not declare any page images"
            )));
        }
        log::info!(
            "loaded '{project_name}': {} pages, {} chars",
            descriptor.pages.len(),
            descriptor.chars.len()
        );
        self.project_name = project_name.to_owned();
        self.page_images = vec![None; descriptor.pages.len()];
        self.descriptor = Some(descriptor);
        self.output = None;
        self.stage = FntToTtfStage::SourceLoaded;
        Ok(())
    }

    /// The page files still waiting for an image, in declaration order.
    pub fn missing_pages(&self) -> Vec<&str> {
        let Some(descriptor) = &self.descriptor else {
            return Vec::new();
        };
        descriptor
            .pages
            .iter()
            .zip(&self.page_images)
            .filter(|(_, image)| image.is_none())
            .map(|(page, _)| page.file.as_str())
            .collect()
    }

    /// Supply the image for the page declared as `page_file`.
    ///
    /// The asset must have been supplied under exactly that name; a
    /// mismatch, even in case only, is rejected rather than risk pairing the
    /// descriptor with the wrong texture.
    pub fn attach_page(&mut self, page_file: &str, asset: PageAsset) -> Result<(), ConvertError> {
        let Some(descriptor) = &self.descriptor else {
            return Err(ConvertError::MissingAsset(format!(
                "no descriptor is loaded to attach '{page_file}' to"
            )));
        };
        if asset.name != page_file {
            return Err(ConvertError::MissingAsset(format!(
                "expected '{page_file}', got '{}'",
                asset.name
            )));
        }
        let slots: Vec<usize> = descriptor
            .pages
            .iter()
            .enumerate()
            .filter(|(_, page)| page.file == page_file)
            .map(|(idx, _)| idx)
            .collect();
        if slots.is_empty() {
            return Err(ConvertError::MissingAsset(format!(
                "'{page_file}' is not a page of this font"
            )));
        }
        log::debug!(
            "attached '{page_file}' ({}x{})",
            asset.pixmap.width(),
            asset.pixmap.height()
        );
        for idx in slots {
            self.page_images[idx] = Some(asset.pixmap.clone());
        }
        self.output = None;
        self.stage = if self.page_images.iter().all(Option::is_some) {
            FntToTtfStage::AssetsResolved
        } else {
            FntToTtfStage::SourceLoaded
        };
        Ok(())
    }

    /// Decode and attach several PNG pages, given as `(file name, bytes)`.
    ///
    /// Pages are decoded in parallel. Nothing is attached unless every name
    /// is a declared page and every page decodes.
    pub fn attach_png_pages(&mut self, pages: Vec<(String, Vec<u8>)>) -> Result<(), ConvertError> {
        let Some(descriptor) = &self.descriptor else {
            return Err(ConvertError::MissingAsset("no .fnt descriptor is loaded".into()));
        };
        if let Some((name, _)) = pages
            .iter()
            .find(|(name, _)| !descriptor.pages.iter().any(|page| &page.file == name))
        {
            return Err(ConvertError::MissingAsset(format!(
                "'{name}' is not a page of this font"
            )));
        }
        let decoded = pages
            .into_par_iter()
            .map(|(name, bytes)| match Pixmap::from_png(&bytes) {
                Ok(pixmap) => Ok(PageAsset { name, pixmap }),
                Err(ConvertError::Png(e)) => Err(ConvertError::Png(format!("{name}: {e}"))),
                Err(e) => Err(e),
            })
            .collect::<Result<Vec<_>, _>>()?;
        for asset in decoded {
            let file = asset.name.clone();
            self.attach_page(&file, asset)?;
        }
        Ok(())
    }

    /// The characters the next [`generate`](Self::generate) would include.
    pub fn included_characters(&self) -> String {
        let Some(descriptor) = &self.descriptor else {
            return String::new();
        };
        descriptor
            .chars
            .iter()
            .filter_map(CharRecord::character)
            .filter(|ch| self.selection.contains(*ch))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Trace every selected character into an outline font.
    pub fn generate(&mut self) -> Result<&OutlineFont, ConvertError> {
        let previous = self.stage;
        self.stage = FntToTtfStage::Generating;
        match self.build() {
            Ok(font) => {
                self.stage = FntToTtfStage::Done;
                Ok(&*self.output.insert(font))
            }
            Err(e) => {
                self.stage = previous;
                Err(e)
            }
        }
    }

    fn build(&self) -> Result<OutlineFont, ConvertError> {
        let Some(descriptor) = &self.descriptor else {
            return Err(ConvertError::MissingAsset("no .fnt descriptor is loaded".into()));
        };
        if let Some(file) = self.missing_pages().first() {
            return Err(ConvertError::MissingAsset(format!("'{file}' has not been supplied")));
        }
        let metrics = OutlineMetrics::from_atlas(&descriptor.common, GENERATED_UNITS_PER_EM)?;

        let mut glyphs = vec![OutlineGlyph::notdef(
            metrics.units_per_em,
            metrics.ascender,
        )];
        let mut seen = BTreeSet::new();
        for record in &descriptor.chars {
            let Some(ch) = record.character() else {
                log::warn!("skipping char id {}: not a Unicode scalar value", record.id);
                continue;
            };
            if ch == '\0' || !self.selection.contains(ch) {
                continue;
            }
            if !seen.insert(ch) {
                log::warn!("skipping duplicate record for {ch:?}");
                continue;
            }
            let contours = if record.has_ink() {
                let page = self.page_image(descriptor, record.page).ok_or_else(|| {
                    ConvertError::MissingAsset(format!(
                        "{ch:?} refers to undeclared page id {}",
                        record.page
                    ))
                })?;
                if !cell_within(page, record) {
                    log::warn!(
                        "{ch:?}: cell {}x{} at ({}, {}) extends past its {}x{} page",
                        record.width,
                        record.height,
                        record.x,
                        record.y,
                        page.width(),
                        page.height()
                    );
                }
                let mask =
                    AlphaMask::from_region(page, record.x, record.y, record.width, record.height);
                vectorize(&mask, record, descriptor.common.base, metrics.scale)
            } else {
                Vec::new()
            };
            glyphs.push(OutlineGlyph {
                name: glyph_name(ch),
                codepoint: ch as u32,
                advance_width: metrics.to_units(record.xadvance as f64) as f64,
                contours,
            });
        }
        if glyphs.len() <= 1 {
            return Err(ConvertError::EmptyResult(format!(
                "none of the {} chars in '{}' are in the selected character sets",
                descriptor.chars.len(),
                self.project_name
            )));
        }
        log::info!("traced {} glyphs for '{}'", glyphs.len() - 1, self.project_name);

        let family_name = match self.project_name.trim() {
            "" => descriptor.info.face.clone(),
            name => name.to_owned(),
        };
        Ok(OutlineFont {
            family_name,
            units_per_em: metrics.units_per_em,
            ascender: metrics.ascender,
            descender: metrics.descender,
            glyphs,
        })
    }

    fn page_image<'a>(&'a self, descriptor: &FontDescriptor, id: i32) -> Option<&'a Pixmap> {
        let idx = descriptor.pages.iter().position(|page| page.id == id)?;
        self.page_images.get(idx)?.as_ref()
    }
}

/// Progress of a [`TtfToFnt`] conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TtfToFntStage {
    Idle,
    SourceLoaded,
    /// The characters to render are known.
    GlyphsResolved,
    Generating,
    Done,
}

/// Renders an outline font into a bitmap font.
pub struct TtfToFnt<S> {
    stage: TtfToFntStage,
    selection: CharacterSetSelection,
    project_name: String,
    source: Option<S>,
    characters: Vec<char>,
}

impl<S: OutlineSource> Default for TtfToFnt<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OutlineSource> TtfToFnt<S> {
    pub fn new() -> Self {
        TtfToFnt {
            stage: TtfToFntStage::Idle,
            selection: CharacterSetSelection::all(),
            project_name: String::new(),
            source: None,
            characters: Vec::new(),
        }
    }

    pub fn stage(&self) -> TtfToFntStage {
        self.stage
    }

    pub fn selection(&self) -> &CharacterSetSelection {
        &self.selection
    }

    /// Change which character sets are rendered.
    ///
    /// Any previously resolved characters are discarded.
    pub fn selection_mut(&mut self) -> &mut CharacterSetSelection {
        if self.stage > TtfToFntStage::SourceLoaded {
            self.stage = TtfToFntStage::SourceLoaded;
            self.characters.clear();
        }
        &mut self.selection
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Name the output files; defaults to the source's family name.
    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.project_name = name.into();
    }

    pub fn load(&mut self, source: S) {
        let family_name = source.family_name();
        log::info!("loaded outline font '{family_name}'");
        if self.project_name.is_empty() {
            self.project_name = family_name;
        }
        self.source = Some(source);
        self.characters.clear();
        self.stage = TtfToFntStage::SourceLoaded;
    }

    /// Work out which selected characters the source can draw.
    ///
    /// Returns them as a string, for previewing.
    pub fn resolve_glyphs(&mut self) -> Result<String, ConvertError> {
        let Some(source) = &self.source else {
            return Err(ConvertError::MissingAsset("no outline font is loaded".into()));
        };
        let characters: Vec<char> = self
            .selection
            .characters()
            .into_iter()
            .filter(|ch| source.glyph(*ch).is_some())
            .collect();
        if characters.is_empty() {
            return Err(ConvertError::EmptyResult(format!(
                "'{}' has no glyphs for the selected character sets",
                source.family_name()
            )));
        }
        log::debug!("resolved {} characters", characters.len());
        self.characters = characters;
        self.stage = TtfToFntStage::GlyphsResolved;
        Ok(self.characters.iter().collect())
    }

    /// Render every resolved character into atlas pages.
    ///
    /// Glyphs are resolved first if that has not happened yet.
    pub fn generate(&mut self, options: &AtlasOptions) -> Result<BitmapFont, ConvertError> {
        options.validate()?;
        if self.stage < TtfToFntStage::GlyphsResolved {
            self.resolve_glyphs()?;
        }
        let previous = self.stage;
        self.stage = TtfToFntStage::Generating;
        match self.build(options) {
            Ok(font) => {
                self.stage = TtfToFntStage::Done;
                Ok(font)
            }
            Err(e) => {
                self.stage = previous;
                Err(e)
            }
        }
    }

    fn build(&self, options: &AtlasOptions) -> Result<BitmapFont, ConvertError> {
        let Some(source) = &self.source else {
            return Err(ConvertError::MissingAsset("no outline font is loaded".into()));
        };
        let metrics = AtlasMetrics::from_outline(&source.vertical_metrics(), options.font_size as f64)?;
        let cell_height = metrics.line_height as u32;
        let rasterizer = GlyphRasterizer {
            padding: options.padding,
        };
        let mut packer = AtlasPacker::new(options.atlas_width, options.atlas_height, options.spacing);
        let mut records = Vec::with_capacity(self.characters.len());

        for &ch in &self.characters {
            let Some(glyph) = source.glyph(ch) else {
                log::debug!("no glyph for {ch:?}");
                continue;
            };
            let xadvance = metrics.to_pixels(glyph.advance_width);
            let Some(cell_width) = rasterizer.cell_width(&glyph, metrics.scale) else {
                if xadvance > 0 {
                    records.push(CharRecord {
                        id: ch as i32,
                        xadvance,
                        page: packer.current_page() as i32,
                        ..Default::default()
                    });
                }
                continue;
            };
            // size up the cell before drawing it
            match packer.check(cell_width, cell_height) {
                Ok(()) => (),
                Err(e) if e.is_per_glyph() => {
                    log::warn!("skipping {ch:?}: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            }
            let Some(cell) =
                rasterizer.rasterize(&glyph, metrics.scale, metrics.base as f64, cell_height)?
            else {
                continue;
            };
            let placement = packer.allocate(cell.pixmap.width(), cell.pixmap.height())?;
            packer.blit(placement, &cell.pixmap);
            records.push(CharRecord {
                id: ch as i32,
                x: placement.x as i32,
                y: placement.y as i32,
                width: cell.pixmap.width() as i32,
                height: cell.pixmap.height() as i32,
                xoffset: cell.xoffset,
                yoffset: 0,
                xadvance,
                page: placement.page as i32,
            });
        }
        if records.is_empty() {
            return Err(ConvertError::EmptyResult(format!(
                "none of the {} characters could be placed",
                self.characters.len()
            )));
        }

        let pixmaps = packer.finish()?;
        let name = strip_quotes(&self.project_name);
        let page_count = pixmaps.len();
        let pages: Vec<AtlasPage> = pixmaps
            .into_iter()
            .enumerate()
            .map(|(idx, pixmap)| AtlasPage {
                file: page_file_name(&name, idx, page_count),
                pixmap,
            })
            .collect();
        log::info!(
            "rendered {} chars of '{name}' onto {page_count} pages",
            records.len()
        );

        let descriptor = FontDescriptor {
            info: Info {
                face: name,
                size: options.font_size as i32,
                padding: [options.padding as i32; 4],
                spacing: [options.spacing as i32; 2],
            },
            common: Common {
                line_height: metrics.line_height,
                base: metrics.base,
                scale_w: options.atlas_width as i32,
                scale_h: options.atlas_height as i32,
                pages: page_count as i32,
            },
            pages: pages
                .iter()
                .enumerate()
                .map(|(idx, page)| Page {
                    id: idx as i32,
                    file: page.file.clone(),
                })
                .collect(),
            chars: records,
        };
        Ok(BitmapFont { descriptor, pages })
    }
}

/// One page of a generated atlas.
#[derive(Clone, Debug, PartialEq)]
pub struct AtlasPage {
    /// The file name the descriptor refers to this page by.
    pub file: String,
    pub pixmap: Pixmap,
}

/// The result of rendering an outline font.
#[derive(Clone, Debug, PartialEq)]
pub struct BitmapFont {
    pub descriptor: FontDescriptor,
    pub pages: Vec<AtlasPage>,
}

impl BitmapFont {
    pub fn fnt_file_name(&self) -> String {
        format!("{}.fnt", self.descriptor.info.face)
    }

    pub fn to_fnt_string(&self) -> String {
        self.descriptor.to_fnt_string()
    }

    /// Encode every page as PNG, paired with its file name.
    pub fn encode_pages(&self) -> Result<Vec<(String, Vec<u8>)>, ConvertError> {
        self.pages
            .iter()
            .map(|page| Ok((page.file.clone(), page.pixmap.to_png()?)))
            .collect()
    }
}

fn cell_within(page: &Pixmap, record: &CharRecord) -> bool {
    let (x, y) = (record.x as i64, record.y as i64);
    x >= 0
        && y >= 0
        && x + record.width as i64 <= page.width() as i64
        && y + record.height as i64 <= page.height() as i64
}

fn page_file_name(name: &str, idx: usize, page_count: usize) -> String {
    if page_count > 1 {
        format!("{name}_{idx}.png")
    } else {
        format!("{name}.png")
    }
}

/// The file name for a TrueType font called `project_name`.
pub fn ttf_file_name(project_name: &str) -> String {
    let stem: String = project_name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{stem}.ttf")
}
