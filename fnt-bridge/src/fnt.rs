//! The BMFont text descriptor (`.fnt`).
//!
//! Each line is a record: a tag (`info`, `common`, `page`, `char`, ...)
//! followed by space separated `key=value` or `key="quoted value"` pairs.
//! Unknown tags and keys are ignored, so descriptors written by other tools
//! (with `kernings`, `chnl`, `packed` and friends) still load.

use std::fmt::Write;

use crate::error::ConvertError;

/// Width of the left-justified numeric columns in `char` lines.
const CHAR_COLUMN_WIDTH: usize = 5;

/// A parsed `.fnt` descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontDescriptor {
    pub info: Info,
    pub common: Common,
    /// Pages in declaration order.
    pub pages: Vec<Page>,
    /// Character records in declaration order.
    pub chars: Vec<CharRecord>,
}

/// The `info` record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Info {
    pub face: String,
    /// The size the atlas was rendered at, in pixels.
    pub size: i32,
    /// Up, right, down, left.
    pub padding: [i32; 4],
    /// Horizontal and vertical spacing between cells.
    pub spacing: [i32; 2],
}

/// The `common` record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Common {
    pub line_height: i32,
    /// Distance from the top of a line to the baseline, in pixels.
    pub base: i32,
    pub scale_w: i32,
    pub scale_h: i32,
    /// The declared page count.
    pub pages: i32,
}

/// A `page` record, naming one atlas image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub id: i32,
    pub file: String,
}

/// A `char` record: where a glyph lives on its page and how to place it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CharRecord {
    /// The Unicode code point.
    pub id: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub xoffset: i32,
    pub yoffset: i32,
    pub xadvance: i32,
    /// The id of the [`Page`] holding the cell.
    pub page: i32,
}

impl CharRecord {
    /// Returns `true` if the record has a cell with visible pixels.
    ///
    /// Records for spaces and other blank characters only carry an advance.
    pub fn has_ink(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// The character this record describes, if the id is a valid scalar value.
    pub fn character(&self) -> Option<char> {
        u32::try_from(self.id).ok().and_then(char::from_u32)
    }
}

impl FontDescriptor {
    /// Parse the text of a `.fnt` file.
    ///
    /// Fails if either the `info` or the `common` record is missing, or if a
    /// numeric field holds something that is not a number.
    pub fn parse(text: &str) -> Result<FontDescriptor, ConvertError> {
        let mut info = None;
        let mut common = None;
        let mut pages = Vec::new();
        let mut chars = Vec::new();

        for (idx, line) in text.split('\n').enumerate() {
            let record = Record::new(idx + 1, line);
            match record.tag {
                "info" => {
                    info = Some(Info {
                        face: record.string("face"),
                        size: record.int("size")?,
                        padding: record.int_list("padding")?,
                        spacing: record.int_list("spacing")?,
                    })
                }
                "common" => {
                    common = Some(Common {
                        line_height: record.int("lineHeight")?,
                        base: record.int("base")?,
                        scale_w: record.int("scaleW")?,
                        scale_h: record.int("scaleH")?,
                        pages: record.int("pages")?,
                    })
                }
                "page" => pages.push(Page {
                    id: record.int("id")?,
                    file: record.string("file"),
                }),
                "char" => chars.push(CharRecord {
                    id: record.int("id")?,
                    x: record.int("x")?,
                    y: record.int("y")?,
                    width: record.int("width")?,
                    height: record.int("height")?,
                    xoffset: record.int("xoffset")?,
                    yoffset: record.int("yoffset")?,
                    xadvance: record.int("xadvance")?,
                    page: record.int("page")?,
                }),
                _ => (),
            }
        }

        let (Some(info), Some(common)) = (info, common) else {
            return Err(ConvertError::Format(
                "missing \"info\" or \"common\" line".into(),
            ));
        };
        log::debug!(
            "parsed .fnt '{}': {} pages, {} chars",
            info.face,
            pages.len(),
            chars.len()
        );
        Ok(FontDescriptor {
            info,
            common,
            pages,
            chars,
        })
    }

    /// Look up a page by id.
    pub fn page(&self, id: i32) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == id)
    }

    /// Serialize to `.fnt` text.
    ///
    /// Fields this crate does not model are written with fixed values so
    /// that other BMFont tools accept the output. The numeric columns of
    /// `char` lines are padded for readability only.
    pub fn to_fnt_string(&self) -> String {
        let mut out = String::new();
        let Info {
            face,
            size,
            padding: [up, right, down, left],
            spacing: [spacing_h, spacing_v],
        } = &self.info;
        // writing to a String cannot fail
        let _ = write!(
            out,
            "info face=\"{}\" size={size} bold=0 italic=0 charset=\"\" unicode=1 stretchH=100 \
             smooth=1 aa=1 padding={up},{right},{down},{left} spacing={spacing_h},{spacing_v} outline=0",
            strip_quotes(face),
        );
        let Common {
            line_height,
            base,
            scale_w,
            scale_h,
            pages,
        } = &self.common;
        let _ = write!(
            out,
            "\ncommon lineHeight={line_height} base={base} scaleW={scale_w} scaleH={scale_h} \
             pages={pages} packed=0 alphaChnl=1 redChnl=4 greenChnl=4 blueChnl=4"
        );

        let mut sorted_pages: Vec<_> = self.pages.iter().collect();
        sorted_pages.sort_by_key(|page| page.id);
        for page in sorted_pages {
            let _ = write!(
                out,
                "\npage id={} file=\"{}\"",
                page.id,
                strip_quotes(&page.file)
            );
        }

        let _ = write!(out, "\nchars count={}", self.chars.len());
        for c in &self.chars {
            let _ = write!(
                out,
                "\nchar id={:<w$} x={:<w$} y={:<w$} width={:<w$} height={:<w$} xoffset={:<w$} \
                 yoffset={:<w$} xadvance={:<w$} page={}  chnl=15",
                c.id,
                c.x,
                c.y,
                c.width,
                c.height,
                c.xoffset,
                c.yoffset,
                c.xadvance,
                c.page,
                w = CHAR_COLUMN_WIDTH,
            );
        }
        out
    }
}

/// The grammar has no escapes, so quotes are dropped rather than written.
pub(crate) fn strip_quotes(s: &str) -> String {
    s.replace('"', "")
}

/// One line, split into its tag and key/value pairs.
struct Record<'a> {
    line: usize,
    tag: &'a str,
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Record<'a> {
    fn new(line: usize, text: &'a str) -> Self {
        let text = text.trim();
        let tag = text.split_whitespace().next().unwrap_or_default();
        Record {
            line,
            tag,
            pairs: split_pairs(&text[tag.len()..]),
        }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        // later duplicates win
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_owned()
    }

    fn int(&self, key: &str) -> Result<i32, ConvertError> {
        match self.get(key) {
            Some(value) => parse_int(value).ok_or_else(|| {
                ConvertError::Format(format!(
                    "line {}: value '{value}' of '{key}' in '{}' is not a number",
                    self.line, self.tag
                ))
            }),
            None => Ok(0),
        }
    }

    fn int_list<const N: usize>(&self, key: &str) -> Result<[i32; N], ConvertError> {
        let mut result = [0; N];
        let Some(value) = self.get(key) else {
            return Ok(result);
        };
        for (slot, item) in result.iter_mut().zip(value.split(',')) {
            *slot = parse_int(item).ok_or_else(|| {
                ConvertError::Format(format!(
                    "line {}: value '{value}' of '{key}' is not a list of numbers",
                    self.line
                ))
            })?;
        }
        Ok(result)
    }
}

/// Split `key=value key="quoted value"` into pairs.
///
/// Tokens without an `=` are skipped.
fn split_pairs(mut rest: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return pairs;
        }
        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let Some(eq) = rest[..token_end].find('=') else {
            rest = &rest[token_end..];
            continue;
        };
        let key = &rest[..eq];
        let after = &rest[eq + 1..];
        if let Some(quoted) = after.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            pairs.push((key, &quoted[..end]));
            rest = quoted.get(end + 1..).unwrap_or_default();
        } else {
            let end = after.find(char::is_whitespace).unwrap_or(after.len());
            pairs.push((key, &after[..end]));
            rest = &after[end..];
        }
    }
}

/// Parse a leading integer, ignoring anything after the digits.
///
/// `"12px"` is 12; `"px"` and `""` are not numbers.
fn parse_int(value: &str) -> Option<i32> {
    let value = value.trim_start();
    let (sign, digits) = match value.as_bytes().first() {
        Some(b'-') => (-1, &value[1..]),
        Some(b'+') => (1, &value[1..]),
        _ => (1, value),
    };
    let len = digits
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if len == 0 {
        return None;
    }
    digits[..len].parse::<i32>().ok().map(|v| v * sign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    static BLOCK_FNT: &str = include_str!("../test_data/block.fnt");

    #[test]
    fn parse_block_font() {
        let font = FontDescriptor::parse(BLOCK_FNT).unwrap();
        assert_eq!(font.info.face, "Block Sans");
        assert_eq!(font.info.size, 32);
        assert_eq!(font.common.line_height, 32);
        assert_eq!(font.common.base, 26);
        assert_eq!(font.common.pages, 1);
        assert_eq!(
            font.pages,
            vec![Page {
                id: 0,
                file: "atlas.png".into()
            }]
        );
        assert_eq!(
            font.chars[0],
            CharRecord {
                id: 65,
                x: 0,
                y: 0,
                width: 20,
                height: 32,
                xoffset: 0,
                yoffset: 0,
                xadvance: 22,
                page: 0,
            }
        );
        assert_eq!(font.chars[1].character(), Some(' '));
        assert!(!font.chars[1].has_ink());
    }

    #[test]
    fn missing_common_is_an_error() {
        let err = FontDescriptor::parse("info face=\"x\" size=12\npage id=0 file=\"a.png\"")
            .unwrap_err();
        assert!(matches!(err, ConvertError::Format(_)), "{err}");
    }

    #[test]
    fn unknown_tags_and_keys_are_ignored() {
        let text = "info face=\"Mono\" size=10 frobnicate=yes\r\n\
                    common lineHeight=12 base=9 pages=1 packed=0\r\n\
                    kernings count=1\r\n\
                    kerning first=65 second=66 amount=-1\r\n\
                    page id=0 file=\"mono.png\"\r\n";
        let font = FontDescriptor::parse(text).unwrap();
        assert_eq!(font.info.face, "Mono");
        assert_eq!(font.common.line_height, 12);
        assert_eq!(font.pages.len(), 1);
        assert!(font.chars.is_empty());
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let text = "info face=\"Very Long Name\" size=8\ncommon lineHeight=8 base=6 pages=1\n\
                    page id=0 file=\"my atlas.png\"";
        let font = FontDescriptor::parse(text).unwrap();
        assert_eq!(font.info.face, "Very Long Name");
        assert_eq!(font.pages[0].file, "my atlas.png");
    }

    #[test]
    fn numbers_parse_like_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("12px"), Some(12));
        assert_eq!(parse_int("px"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn bad_number_names_line_and_key() {
        let text = "info face=\"x\" size=1\ncommon lineHeight=tall base=1 pages=1";
        let err = FontDescriptor::parse(text).unwrap_err();
        let ConvertError::Format(message) = err else {
            panic!("unexpected error {err:?}");
        };
        assert!(message.starts_with("line 2:"), "{message}");
        assert!(message.contains("lineHeight"), "{message}");
    }

    #[test]
    fn padding_and_spacing_lists() {
        let text = "info face=\"x\" size=1 padding=1,2,3,4 spacing=2,2\ncommon lineHeight=1 base=1";
        let font = FontDescriptor::parse(text).unwrap();
        assert_eq!(font.info.padding, [1, 2, 3, 4]);
        assert_eq!(font.info.spacing, [2, 2]);
    }

    #[test]
    fn serialize_layout() {
        let font = FontDescriptor::parse(BLOCK_FNT).unwrap();
        let text = font.to_fnt_string();
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("info face=\"Block Sans\" size=32 bold=0"));
        assert!(lines[1].starts_with("common lineHeight=32 base=26 scaleW=64 scaleH=64 pages=1"));
        assert_eq!(lines[2], "page id=0 file=\"atlas.png\"");
        assert_eq!(lines[3], "chars count=2");
        assert_eq!(
            lines[4],
            "char id=65    x=0     y=0     width=20    height=32    xoffset=0     \
             yoffset=0     xadvance=22    page=0  chnl=15"
        );
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn serialize_strips_quotes() {
        let font = FontDescriptor {
            info: Info {
                face: "My \"Quoted\" Font".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let text = font.to_fnt_string();
        assert!(text.starts_with("info face=\"My Quoted Font\""), "{text}");
        assert_eq!(
            FontDescriptor::parse(&text).unwrap().info.face,
            "My Quoted Font"
        );
    }

    #[test]
    fn serialize_sorts_pages() {
        let font = FontDescriptor {
            pages: vec![
                Page {
                    id: 1,
                    file: "b.png".into(),
                },
                Page {
                    id: 0,
                    file: "a.png".into(),
                },
            ],
            ..Default::default()
        };
        let text = font.to_fnt_string();
        let first = text.find("a.png").unwrap();
        let second = text.find("b.png").unwrap();
        assert!(first < second);
    }

    #[test]
    fn format_roundtrip() {
        let font = FontDescriptor {
            info: Info {
                face: "Round Trip".into(),
                size: 48,
                padding: [1, 1, 1, 1],
                spacing: [2, 2],
            },
            common: Common {
                line_height: 57,
                base: 45,
                scale_w: 512,
                scale_h: 256,
                pages: 2,
            },
            pages: vec![
                Page {
                    id: 0,
                    file: "rt_0.png".into(),
                },
                Page {
                    id: 1,
                    file: "rt_1.png".into(),
                },
            ],
            chars: vec![
                CharRecord {
                    id: 33,
                    x: 2,
                    y: 2,
                    width: 9,
                    height: 57,
                    xoffset: 2,
                    yoffset: 0,
                    xadvance: 13,
                    page: 0,
                },
                CharRecord {
                    id: 32,
                    xadvance: 12,
                    page: 1,
                    ..Default::default()
                },
                CharRecord {
                    id: 1046,
                    x: 100000,
                    y: 3,
                    width: 40,
                    height: 57,
                    xoffset: -3,
                    yoffset: 0,
                    xadvance: 35,
                    page: 1,
                },
            ],
        };
        assert_eq!(FontDescriptor::parse(&font.to_fnt_string()).unwrap(), font);
    }
}
