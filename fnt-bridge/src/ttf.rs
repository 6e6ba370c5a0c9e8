//! Compiling an [`OutlineFont`] into a TrueType binary.

use skrifa::raw::tables::glyf::CurvePoint;
use write_fonts::{
    tables::{
        cmap::Cmap,
        glyf::{Bbox, Contour, GlyfLocaBuilder, SimpleGlyph},
        head::Head,
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        maxp::Maxp,
        name::{Name, NameRecord},
        os2::Os2,
        post::Post,
    },
    types::{FWord, GlyphId, NameId, UfWord},
    FontBuilder, OtRound,
};

use crate::{
    error::ConvertError,
    outline::{OutlineFont, OutlineGlyph},
};

const WINDOWS_PLATFORM: u16 = 3;
const WINDOWS_UNICODE_BMP: u16 = 1;
const WINDOWS_ENGLISH_US: u16 = 0x409;
const STYLE_NAME: &str = "Regular";

/// A glyph with integer coordinates, ready for the `glyf` table.
struct CompiledGlyph {
    glyph: SimpleGlyph,
    advance: u16,
    /// `None` for glyphs without contours.
    bbox: Option<Bbox>,
    num_points: usize,
}

impl OutlineFont {
    /// Build a TrueType font file.
    ///
    /// Points are rounded to whole font units; contours that collapse to
    /// nothing in the process are dropped.
    pub fn to_ttf(&self) -> Result<Vec<u8>, ConvertError> {
        let glyphs = self
            .glyphs
            .iter()
            .map(compile_glyph)
            .collect::<Result<Vec<_>, _>>()?;
        let num_glyphs = u16::try_from(glyphs.len())
            .map_err(|_| ConvertError::FontWrite(format!("{} glyphs is too many", glyphs.len())))?;
        let ascender = to_i16(self.ascender as f64, "ascender")?;
        let descender = to_i16(self.descender as f64, "descender")?;

        let mut glyf_builder = GlyfLocaBuilder::new();
        for (compiled, source) in glyphs.iter().zip(&self.glyphs) {
            glyf_builder.add_glyph(&compiled.glyph).map_err(|e| {
                ConvertError::FontWrite(format!("glyph '{}': {e}", source.name))
            })?;
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let font_bbox = glyphs
            .iter()
            .filter_map(|g| g.bbox)
            .reduce(Bbox::union)
            .unwrap_or_default();
        let inked = || glyphs.iter().filter_map(|g| g.bbox.map(|bbox| (g.advance, bbox)));
        let advance_width_max = glyphs.iter().map(|g| g.advance).max().unwrap_or_default();
        let min_left_side_bearing = inked().map(|(_, bbox)| bbox.x_min).min().unwrap_or_default();
        let min_right_side_bearing = inked()
            .map(|(advance, bbox)| (advance as i32 - bbox.x_max as i32).clamp(-0x8000, 0x7fff) as i16)
            .min()
            .unwrap_or_default();
        let x_max_extent = inked().map(|(_, bbox)| bbox.x_max).max().unwrap_or_default();

        let head = Head {
            units_per_em: self.units_per_em,
            x_min: font_bbox.x_min,
            y_min: font_bbox.y_min,
            x_max: font_bbox.x_max,
            y_max: font_bbox.y_max,
            lowest_rec_ppem: 8,
            index_to_loc_format: loca_format as i16,
            ..Default::default()
        };
        let hhea = Hhea {
            ascender: FWord::new(ascender),
            descender: FWord::new(descender),
            line_gap: FWord::new(0),
            advance_width_max: UfWord::new(advance_width_max),
            min_left_side_bearing: FWord::new(min_left_side_bearing),
            min_right_side_bearing: FWord::new(min_right_side_bearing),
            x_max_extent: FWord::new(x_max_extent),
            caret_slope_rise: 1,
            caret_slope_run: 0,
            caret_offset: 0,
            number_of_h_metrics: num_glyphs,
        };
        let maxp = Maxp {
            num_glyphs,
            max_points: Some(glyphs.iter().map(|g| g.num_points).max().unwrap_or(0) as u16),
            max_contours: Some(
                glyphs
                    .iter()
                    .map(|g| g.glyph.contours.len())
                    .max()
                    .unwrap_or(0) as u16,
            ),
            max_composite_points: Some(0),
            max_composite_contours: Some(0),
            max_zones: Some(2),
            max_twilight_points: Some(0),
            max_storage: Some(0),
            max_function_defs: Some(0),
            max_instruction_defs: Some(0),
            max_stack_elements: Some(0),
            max_size_of_instructions: Some(0),
            max_component_elements: Some(0),
            max_component_depth: Some(0),
        };
        let hmtx = Hmtx {
            h_metrics: glyphs
                .iter()
                .map(|g| LongMetric {
                    advance: g.advance,
                    side_bearing: g.bbox.map(|bbox| bbox.x_min).unwrap_or_default(),
                })
                .collect(),
            left_side_bearings: Vec::new(),
        };
        let cmap = Cmap::from_mappings(
            self.glyphs
                .iter()
                .enumerate()
                .filter_map(|(gid, glyph)| {
                    glyph
                        .character()
                        .map(|ch| (ch, GlyphId::new(gid as u32)))
                }),
        )
        .map_err(|e| ConvertError::FontWrite(e.to_string()))?;
        let os2 = self.os2(&glyphs, font_bbox, ascender, descender);
        let post = Post::new_v2(self.glyphs.iter().map(|g| g.name.as_str()));
        let name = self.name_table();

        let mut builder = FontBuilder::new();
        builder
            .add_table(&head)
            .and_then(|b| b.add_table(&hhea))
            .and_then(|b| b.add_table(&maxp))
            .and_then(|b| b.add_table(&os2))
            .and_then(|b| b.add_table(&hmtx))
            .and_then(|b| b.add_table(&cmap))
            .and_then(|b| b.add_table(&loca))
            .and_then(|b| b.add_table(&glyf))
            .and_then(|b| b.add_table(&name))
            .and_then(|b| b.add_table(&post))
            .map_err(|e| ConvertError::FontWrite(e.to_string()))?;
        let bytes = builder.build();
        log::info!(
            "compiled '{}': {} glyphs, {} bytes",
            self.family_name,
            num_glyphs,
            bytes.len()
        );
        Ok(bytes)
    }

    fn os2(&self, glyphs: &[CompiledGlyph], bbox: Bbox, ascender: i16, descender: i16) -> Os2 {
        let advances: Vec<u32> = glyphs
            .iter()
            .map(|g| g.advance as u32)
            .filter(|adv| *adv > 0)
            .collect();
        let x_avg_char_width = match advances.len() {
            0 => 0,
            n => {
                let avg: f64 = (advances.iter().sum::<u32>() as f64 / n as f64).ot_round();
                avg.min(i16::MAX as f64) as i16
            }
        };
        let codepoints = || self.glyphs.iter().filter_map(|g| g.character()).map(|c| c as u32);
        let first_char = codepoints().min().unwrap_or_default().min(0xFFFF) as u16;
        let last_char = codepoints().max().unwrap_or_default().min(0xFFFF) as u16;
        Os2 {
            x_avg_char_width,
            us_weight_class: 400,
            us_width_class: 5,
            us_first_char_index: first_char,
            us_last_char_index: last_char,
            s_typo_ascender: ascender,
            s_typo_descender: descender,
            s_typo_line_gap: 0,
            us_win_ascent: ascender.max(bbox.y_max).max(0) as u16,
            us_win_descent: (-(descender as i32)).max(-(bbox.y_min as i32)).max(0) as u16,
            // Latin 1
            ul_code_page_range_1: Some(1),
            ul_code_page_range_2: Some(0),
            ..Default::default()
        }
    }

    fn name_table(&self) -> Name {
        let family = crate::fnt::strip_quotes(&self.family_name);
        let full_name = format!("{family} {STYLE_NAME}");
        let postscript_name: String = format!("{family}-{STYLE_NAME}")
            .chars()
            .filter(|c| c.is_ascii_graphic() && !"[](){}<>/%".contains(*c))
            .collect();
        let mut name = Name::default();
        for (id, value) in [
            (NameId::FAMILY_NAME, family.clone()),
            (NameId::SUBFAMILY_NAME, STYLE_NAME.to_string()),
            (NameId::UNIQUE_ID, full_name.clone()),
            (NameId::FULL_NAME, full_name),
            (NameId::VERSION_STRING, "Version 1.000".to_string()),
            (NameId::POSTSCRIPT_NAME, postscript_name),
        ] {
            name.name_record.push(NameRecord {
                platform_id: WINDOWS_PLATFORM,
                encoding_id: WINDOWS_UNICODE_BMP,
                language_id: WINDOWS_ENGLISH_US,
                name_id: id,
                string: value.into(),
            });
        }
        name.name_record.sort();
        name
    }
}

fn compile_glyph(glyph: &OutlineGlyph) -> Result<CompiledGlyph, ConvertError> {
    let mut contours = Vec::new();
    let mut bbox: Option<Bbox> = None;
    let mut num_points = 0;
    for contour in &glyph.contours {
        let mut points: Vec<(i16, i16)> = Vec::with_capacity(contour.len());
        for point in contour {
            let p = (to_i16(point.x, &glyph.name)?, to_i16(point.y, &glyph.name)?);
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 || twice_area(&points) == 0 {
            continue;
        }
        for &(x, y) in &points {
            let point_box = Bbox {
                x_min: x,
                y_min: y,
                x_max: x,
                y_max: y,
            };
            bbox = Some(bbox.map_or(point_box, |b| b.union(point_box)));
        }
        num_points += points.len();
        contours.push(Contour::from(
            points
                .into_iter()
                .map(|(x, y)| CurvePoint::on_curve(x, y))
                .collect::<Vec<_>>(),
        ));
    }
    if contours.len() >= i16::MAX as usize {
        return Err(ConvertError::FontWrite(format!(
            "glyph '{}' has {} contours",
            glyph.name,
            contours.len()
        )));
    }
    let advance: f64 = glyph.advance_width.ot_round();
    if !(0.0..=u16::MAX as f64).contains(&advance) {
        return Err(ConvertError::FontWrite(format!(
            "advance {} of glyph '{}' is out of range",
            glyph.advance_width, glyph.name
        )));
    }
    Ok(CompiledGlyph {
        glyph: SimpleGlyph {
            bbox: bbox.unwrap_or_default(),
            contours,
            instructions: Vec::new(),
        },
        advance: advance as u16,
        bbox,
        num_points,
    })
}

/// Round a coordinate to whole font units.
fn to_i16(value: f64, what: &str) -> Result<i16, ConvertError> {
    let rounded: f64 = value.ot_round();
    if rounded >= i16::MIN as f64 && rounded <= i16::MAX as f64 {
        Ok(rounded as i16)
    } else {
        Err(ConvertError::FontWrite(format!(
            "value {value} in '{what}' does not fit in a font unit"
        )))
    }
}

fn twice_area(points: &[(i16, i16)]) -> i64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use kurbo::Point;
    use skrifa::{
        prelude::{LocationRef, Size},
        raw::{FontRef, TableProvider},
        string::StringId,
        GlyphId as ReadGlyphId, MetadataProvider,
    };

    use super::*;
    use crate::outline::rectangle;

    fn block_font() -> OutlineFont {
        OutlineFont {
            family_name: "Block Sans".into(),
            units_per_em: 1000,
            ascender: 813,
            descender: -188,
            glyphs: vec![
                OutlineGlyph::notdef(1000, 813),
                OutlineGlyph {
                    name: "A".into(),
                    codepoint: 'A' as u32,
                    advance_width: 688.0,
                    contours: vec![rectangle(0.0, -187.5, 625.0, 812.5)],
                },
                OutlineGlyph {
                    name: "uni0020".into(),
                    codepoint: ' ' as u32,
                    advance_width: 250.0,
                    contours: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn compiled_font_reads_back() {
        let _ = env_logger::builder().is_test(true).try_init();
        let bytes = block_font().to_ttf().unwrap();
        let font = FontRef::new(&bytes).unwrap();
        assert_eq!(font.maxp().unwrap().num_glyphs(), 3);
        assert_eq!(font.head().unwrap().units_per_em(), 1000);
        assert_eq!(font.hhea().unwrap().ascender().to_i16(), 813);
        assert_eq!(font.hhea().unwrap().descender().to_i16(), -188);
        let os2 = font.os2().unwrap();
        assert_eq!(os2.us_win_ascent(), 813);
        assert_eq!(os2.us_win_descent(), 188);
        assert_eq!(os2.s_typo_ascender(), 813);
        assert_eq!(os2.s_typo_descender(), -188);

        let charmap = font.charmap();
        assert_eq!(charmap.map('A'), Some(ReadGlyphId::new(1)));
        assert_eq!(charmap.map(' '), Some(ReadGlyphId::new(2)));
        assert_eq!(charmap.map('B'), None);

        let metrics = font.glyph_metrics(Size::unscaled(), LocationRef::default());
        assert_eq!(metrics.advance_width(ReadGlyphId::new(1)), Some(688.0));
        assert_eq!(metrics.advance_width(ReadGlyphId::new(0)), Some(500.0));

        let family = font
            .localized_strings(StringId::FAMILY_NAME)
            .english_or_first()
            .map(|s| s.to_string());
        assert_eq!(family.as_deref(), Some("Block Sans"));
        let post = font.post().unwrap();
        assert_eq!(post.glyph_name(skrifa::GlyphId16::new(0)), Some(".notdef"));
        assert_eq!(post.glyph_name(skrifa::GlyphId16::new(1)), Some("A"));
        assert_eq!(post.glyph_name(skrifa::GlyphId16::new(2)), Some("uni0020"));
    }

    #[test]
    fn points_are_rounded() {
        let compiled = compile_glyph(&block_font().glyphs[1]).unwrap();
        assert_eq!(
            compiled.bbox,
            Some(Bbox {
                x_min: 0,
                y_min: -187,
                x_max: 625,
                y_max: 813
            })
        );
        assert_eq!(compiled.advance, 688);
        assert_eq!(compiled.num_points, 4);
    }

    #[test]
    fn collapsed_contours_are_dropped() {
        let glyph = OutlineGlyph {
            name: "sliver".into(),
            codepoint: 'l' as u32,
            advance_width: 100.0,
            contours: vec![
                rectangle(10.0, 0.0, 10.2, 500.0),
                vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0)],
                rectangle(20.0, 0.0, 40.0, 10.0),
            ],
        };
        let compiled = compile_glyph(&glyph).unwrap();
        assert_eq!(compiled.glyph.contours.len(), 1);
        assert_eq!(compiled.bbox.map(|b| b.x_min), Some(20));
    }

    #[test]
    fn out_of_range_coordinates_fail() {
        let glyph = OutlineGlyph {
            name: "huge".into(),
            codepoint: 'H' as u32,
            advance_width: 100.0,
            contours: vec![rectangle(0.0, 0.0, 40_000.0, 10.0)],
        };
        assert!(matches!(
            compile_glyph(&glyph),
            Err(ConvertError::FontWrite(_))
        ));
    }
}
