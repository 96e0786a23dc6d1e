//! Fonts region.
//!
//! One blob per font:
//!
//! ```text
//! offset
//! 0        ascent               u8
//! 1        descent              u8
//! 2        encoding start       u8
//! 3        encoding end         u8
//! 4        per-encoding offsets u16 BE (bpp < 8) | u32 LE (bpp == 8)
//! ```
//!
//! followed by glyph records. A glyph record starts with dx; a first byte
//! of 255 marks an encoding with no glyph. Offsets are relative to the
//! start of the font blob. The u16 table entries are big-endian, unlike
//! everything else in the image.

use crate::build::assets::Assets;
use crate::build::data_buffer::DataBuffer;
use crate::build::helper::{NamingConvention, TAB, get_name};
use crate::diagnostics::BuildError;
use crate::project::Font;

const EMPTY_GLYPH_MARKER: u8 = 255;

pub fn fonts_enum(assets: &Assets) -> String {
    let mut entries = vec![format!("{}FONT_ID_NONE = 0", TAB)];
    entries.extend(assets.fonts.iter().enumerate().map(|(i, font)| {
        format!(
            "{}{} = {}",
            TAB,
            get_name("FONT_ID_", &font.name, NamingConvention::UnderscoreUpperCase),
            i + 1
        )
    }));
    format!("enum FontsEnum {{\n{}\n}};", entries.join(",\n"))
}

/// Fonts region: a sub-table with one entry per font. Master projects get
/// an empty region since the parent image already carries the fonts.
pub fn fonts_data<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
) -> Result<(), BuildError> {
    if assets.project.has_master_project() {
        return Ok(());
    }
    buffer.write_regions(assets.fonts.len(), |buffer, i| {
        let blob = font_data(assets.fonts[i])?;
        buffer.write_u8_array(&blob);
        Ok(())
    })
}

/// Encode one font as a standalone blob.
pub fn font_data(font: &Font) -> Result<Vec<u8>, BuildError> {
    let Some(start_encoding) = font.glyphs.iter().map(|g| g.encoding).min() else {
        return Ok(Vec::new());
    };
    let end_encoding = font.glyphs.iter().map(|g| g.encoding).max().unwrap_or(start_encoding);

    if start_encoding > u8::MAX as u32 || end_encoding > u8::MAX as u32 {
        return Err(BuildError::resource(format!(
            "glyph encodings {}..{} exceed the 8-bit range",
            start_encoding, end_encoding
        ))
        .for_entity(&font.name));
    }

    let count = (end_encoding - start_encoding + 1) as usize;
    let entry_size = if font.bpp == 8 { 4 } else { 2 };

    let mut blob = Vec::with_capacity(4 + count * entry_size);
    blob.push(font.ascent);
    blob.push(font.descent);
    blob.push(start_encoding as u8);
    blob.push(end_encoding as u8);
    blob.resize(4 + count * entry_size, 0);

    for encoding in start_encoding..=end_encoding {
        let entry_at = 4 + (encoding - start_encoding) as usize * entry_size;
        let offset = blob.len();

        if font.bpp == 8 {
            blob[entry_at..entry_at + 4].copy_from_slice(&(offset as u32).to_le_bytes());
        } else {
            if offset > u16::MAX as usize {
                return Err(BuildError::resource(
                    "font too large for 16-bit glyph offsets",
                )
                .for_entity(&font.name));
            }
            blob[entry_at..entry_at + 2].copy_from_slice(&(offset as u16).to_be_bytes());
        }

        let glyph = font.glyphs.iter().find(|g| g.encoding == encoding);
        match glyph {
            Some(glyph) if !glyph.pixels.is_empty() => {
                blob.push(glyph.dx as u8);
                blob.push(glyph.width);
                blob.push(glyph.height);
                blob.push(glyph.x as u8);
                blob.push(glyph.y as u8);
                blob.extend_from_slice(&glyph.pixels);
            }
            _ => blob.push(EMPTY_GLYPH_MARKER),
        }
    }

    Ok(blob)
}

#[cfg(test)]
mod fonts_tests {
    use super::*;
    use crate::project::Glyph;

    fn glyph(encoding: u32, pixels: Vec<u8>) -> Glyph {
        Glyph {
            encoding,
            dx: 6,
            x: 0,
            y: 1,
            width: 5,
            height: 7,
            pixels,
        }
    }

    #[test]
    fn header_and_offset_table() {
        let font = Font {
            name: "mono".to_string(),
            ascent: 10,
            descent: 3,
            bpp: 1,
            glyphs: vec![glyph(65, vec![0xAA; 7]), glyph(67, vec![0x55; 7])],
            always_build: false,
        };

        let blob = font_data(&font).unwrap();
        assert_eq!(&blob[..4], &[10, 3, 65, 67]);

        // three encodings, u16 BE entries
        let first = u16::from_be_bytes([blob[4], blob[5]]) as usize;
        assert_eq!(first, 4 + 3 * 2);
        assert_eq!(blob[first], 6); // dx
        assert_eq!(blob[first + 1], 5); // width
        assert_eq!(blob[first + 2], 7); // height

        // encoding 66 has no glyph
        let second = u16::from_be_bytes([blob[6], blob[7]]) as usize;
        assert_eq!(blob[second], EMPTY_GLYPH_MARKER);

        let third = u16::from_be_bytes([blob[8], blob[9]]) as usize;
        assert_eq!(third, second + 1);
        assert_eq!(blob[third], 6);
    }

    #[test]
    fn eight_bpp_uses_u32_le_entries() {
        let font = Font {
            name: "aa".to_string(),
            ascent: 8,
            descent: 2,
            bpp: 8,
            glyphs: vec![glyph(32, vec![0xFF; 35])],
            always_build: false,
        };

        let blob = font_data(&font).unwrap();
        let entry = u32::from_le_bytes(blob[4..8].try_into().unwrap()) as usize;
        assert_eq!(entry, 8);
        assert_eq!(blob[entry], 6);
        assert_eq!(blob.len(), 8 + 5 + 35);
    }

    #[test]
    fn empty_font_is_empty_blob() {
        let font = Font {
            name: "empty".to_string(),
            ascent: 0,
            descent: 0,
            bpp: 1,
            glyphs: Vec::new(),
            always_build: false,
        };
        assert!(font_data(&font).unwrap().is_empty());
    }
}
