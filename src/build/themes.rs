//! Themes and colors region.
//!
//! The region holds two arrays. First the themes, each one a name plus a
//! color table with one entry per project color. Then the literal colors
//! styles referenced directly, addressed past the end of the project color
//! range. Master projects write both arrays empty since the parent image
//! owns the color tables.

use crate::build::assets::Assets;
use crate::build::data_buffer::DataBuffer;
use crate::build::helper::{NamingConvention, TAB, get_name};
use crate::diagnostics::BuildError;
use crate::project::{Project, Theme};

pub fn themes_enum(assets: &Assets) -> String {
    let entries: Vec<String> = assets
        .project
        .themes
        .iter()
        .enumerate()
        .map(|(i, theme)| {
            format!(
                "{}{} = {}",
                TAB,
                get_name("THEME_ID_", &theme.name, NamingConvention::UnderscoreUpperCase),
                i
            )
        })
        .collect();
    format!("enum ThemesEnum {{\n{}\n}};", entries.join(",\n"))
}

pub fn colors_enum(assets: &Assets) -> String {
    let entries: Vec<String> = assets
        .project
        .colors
        .iter()
        .enumerate()
        .map(|(i, color)| {
            format!(
                "{}{} = {}",
                TAB,
                get_name("COLOR_ID_", &color.name, NamingConvention::UnderscoreUpperCase),
                i
            )
        })
        .collect();
    format!("enum ColorsEnum {{\n{}\n}};", entries.join(",\n"))
}

pub fn themes_data<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
) -> Result<(), BuildError> {
    if assets.project.has_master_project() {
        buffer.write_u32(0);
        buffer.write_u32(0);
        buffer.write_u32(0);
        buffer.write_u32(0);
        return Ok(());
    }

    buffer.write_array(assets.project.themes.as_slice(), |buffer, theme| {
        write_theme(assets.project, buffer, theme);
        Ok(())
    });

    buffer.write_array(assets.colors.as_slice(), |buffer, color| {
        buffer.write_u16(str_to_color16(assets.project, color));
        Ok(())
    });

    Ok(())
}

fn write_theme<'a>(project: &'a Project, buffer: &mut DataBuffer<'a>, theme: &'a Theme) {
    buffer.write_string_offset(&theme.name);
    buffer.write_array(theme.colors.as_slice(), |buffer, color| {
        buffer.write_u16(str_to_color16(project, color));
        Ok(())
    });
}

/// Parse a color into RGB565. Accepts "#rrggbb", "transparent" and project
/// color names; anything else encodes as 0.
pub fn str_to_color16(project: &Project, color: &str) -> u16 {
    resolve_color16(project, color, 32)
}

fn resolve_color16(project: &Project, color: &str, remaining: u32) -> u16 {
    if remaining == 0 {
        return 0;
    }

    if color == "transparent" {
        return 0xFFFF;
    }

    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() == 6 {
            if let Ok(rgb) = u32::from_str_radix(hex, 16) {
                let r = (rgb >> 16) & 0xFF;
                let g = (rgb >> 8) & 0xFF;
                let b = rgb & 0xFF;
                return (((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3)) as u16;
            }
        }
        return 0;
    }

    match project.colors.iter().find(|c| c.name == color) {
        Some(named) if named.color != color => resolve_color16(project, &named.color, remaining - 1),
        _ => 0,
    }
}

#[cfg(test)]
mod themes_tests {
    use super::*;
    use crate::project::StringEncoding;

    #[test]
    fn rgb565_packing() {
        let project = Project::default();
        assert_eq!(str_to_color16(&project, "#000000"), 0);
        assert_eq!(str_to_color16(&project, "#ffffff"), 0xFFFF);
        assert_eq!(str_to_color16(&project, "#ff0000"), 0xF800);
        assert_eq!(str_to_color16(&project, "#00ff00"), 0x07E0);
        assert_eq!(str_to_color16(&project, "#0000ff"), 0x001F);
        assert_eq!(str_to_color16(&project, "transparent"), 0xFFFF);
        assert_eq!(str_to_color16(&project, "no such color"), 0);
    }

    #[test]
    fn named_colors_resolve_through_the_project() {
        let project: Project = serde_json::from_str(
            r##"{ "colors": [{ "name": "accent", "color": "#ff0000" }] }"##,
        )
        .unwrap();
        assert_eq!(str_to_color16(&project, "accent"), 0xF800);
    }

    #[test]
    fn mutually_referencing_named_colors_encode_as_zero() {
        let project: Project = serde_json::from_str(
            r#"{
                "colors": [
                    { "name": "ping", "color": "pong" },
                    { "name": "pong", "color": "ping" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(str_to_color16(&project, "ping"), 0);
    }

    #[test]
    fn theme_tables_hold_one_entry_per_project_color() {
        let project: Project = serde_json::from_str(
            r##"{
                "colors": [
                    { "name": "fg", "color": "#ffffff" },
                    { "name": "bg", "color": "#000000" }
                ],
                "themes": [
                    { "name": "dark", "colors": ["#00ff00", "#0000ff"] }
                ]
            }"##,
        )
        .unwrap();
        let project = Box::leak(Box::new(project));

        let assets = Assets::collect(project, "Default").unwrap();
        let assets = Box::leak(Box::new(assets));
        let mut buffer = DataBuffer::new(StringEncoding::NulTerminated);
        buffer
            .write_regions(1, |buffer, _| themes_data(assets, buffer))
            .unwrap();
        let data = buffer.finalize().unwrap();

        let region = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
        let theme_count = u32::from_le_bytes(data[region..region + 4].try_into().unwrap());
        assert_eq!(theme_count, 1);

        let theme =
            region + u32::from_le_bytes(data[region + 4..region + 8].try_into().unwrap()) as usize;
        let colors_count = u32::from_le_bytes(data[theme + 4..theme + 8].try_into().unwrap());
        assert_eq!(colors_count, 2);

        let colors =
            region + u32::from_le_bytes(data[theme + 8..theme + 12].try_into().unwrap()) as usize;
        let first = u16::from_le_bytes(data[colors..colors + 2].try_into().unwrap());
        assert_eq!(first, 0x07E0);
    }
}
