//! An RGBA8 drawing surface, used for atlas pages and glyph cells.

use crate::error::ConvertError;

/// The largest width or height, in pixels, of a surface we agree to create.
pub const MAX_SURFACE_SIDE: u32 = 16384;

/// A pixmap with straight (not premultiplied) RGBA8 pixels in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Create a fully transparent surface.
    ///
    /// Fails with [`ConvertError::CanvasUnavailable`] when either side is
    /// zero or larger than [`MAX_SURFACE_SIDE`].
    pub fn try_new(width: u32, height: u32) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 || width > MAX_SURFACE_SIDE || height > MAX_SURFACE_SIDE {
            return Err(ConvertError::CanvasUnavailable { width, height });
        }
        Ok(Pixmap {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        })
    }

    /// Wrap existing RGBA8 data.
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 4).then_some(Pixmap {
            width,
            height,
            data,
        })
    }

    /// Decode a PNG file.
    ///
    /// Palette, greyscale and 16-bit images are expanded to RGBA8.
    pub fn from_png(data: &[u8]) -> Result<Self, ConvertError> {
        let mut decoder = png::Decoder::new(data);
        decoder.set_transformations(
            png::Transformations::normalize_to_color8() | png::Transformations::ALPHA,
        );

        let mut reader = decoder.read_info()?;
        let mut img_data = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut img_data)?;
        img_data.truncate(info.buffer_size());

        let rgba = match info.color_type {
            png::ColorType::Rgba => img_data,
            png::ColorType::GrayscaleAlpha => img_data
                .chunks_exact(2)
                .flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]])
                .collect(),
            other => {
                return Err(ConvertError::Png(format!(
                    "unexpected color type {other:?} after expansion"
                )))
            }
        };
        Pixmap::from_rgba(info.width, info.height, rgba)
            .ok_or_else(|| ConvertError::Png("decoded image has the wrong size".into()))
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, ConvertError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.data)?;
            writer.finish()?;
        }
        Ok(out)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The RGBA value at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.offset(x, y);
        let px = &self.data[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Set the pixel at `(x, y)`; writes outside the surface are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width && y < self.height {
            let idx = self.offset(x, y);
            self.data[idx..idx + 4].copy_from_slice(&rgba);
        }
    }

    /// Fill the rectangle with `rgba`, clipped to the surface.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgba: [u8; 4]) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y..y_end {
            for col in x..x_end {
                let idx = self.offset(col, row);
                self.data[idx..idx + 4].copy_from_slice(&rgba);
            }
        }
    }

    /// Copy all of `src` so that its top left corner lands at `(x, y)`.
    ///
    /// Pixels falling outside this surface are clipped.
    pub fn blit(&mut self, src: &Pixmap, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = src.width.min(self.width - x) as usize;
        let rows = src.height.min(self.height - y);
        for row in 0..rows {
            let src_start = src.offset(0, row);
            let dst_start = self.offset(x, y + row);
            self.data[dst_start..dst_start + cols * 4]
                .copy_from_slice(&src.data[src_start..src_start + cols * 4]);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        4 * (self.width as usize * y as usize + x as usize)
    }
}
