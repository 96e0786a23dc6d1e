//! Styles region.
//!
//! One fixed 32-byte record per style. Color fields hold indices into the
//! color table written with the themes region; every other property is
//! resolved through the inherit chain before encoding, so the firmware
//! never sees inheritance.

use crate::build::assets::Assets;
use crate::build::data_buffer::DataBuffer;
use crate::build::helper::{NamingConvention, TAB, get_name};
use crate::diagnostics::BuildError;
use crate::project::{Alignment, Rect, Style, style_property};

pub const STYLE_FLAGS_HORZ_ALIGN_LEFT: u16 = 0;
pub const STYLE_FLAGS_HORZ_ALIGN_RIGHT: u16 = 1;
pub const STYLE_FLAGS_HORZ_ALIGN_CENTER: u16 = 2;

pub const STYLE_FLAGS_VERT_ALIGN_TOP: u16 = 0 << 3;
pub const STYLE_FLAGS_VERT_ALIGN_BOTTOM: u16 = 1 << 3;
pub const STYLE_FLAGS_VERT_ALIGN_CENTER: u16 = 2 << 3;

pub const STYLE_FLAGS_BLINK: u16 = 1 << 6;

pub fn styles_enum(assets: &Assets) -> String {
    let mut entries = vec![format!("{}STYLE_ID_NONE = 0", TAB)];
    entries.extend(assets.styles.iter().enumerate().map(|(i, style)| {
        format!(
            "{}{} = {}",
            TAB,
            get_name("STYLE_ID_", &style.name, NamingConvention::UnderscoreUpperCase),
            i + 1
        )
    }));
    format!("enum StylesEnum {{\n{}\n}};", entries.join(",\n"))
}

/// Styles region: an array of style records. Empty for master projects.
pub fn styles_data<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
) -> Result<(), BuildError> {
    if assets.project.has_master_project() {
        buffer.write_u32(0);
        buffer.write_u32(0);
        return Ok(());
    }
    buffer.write_array(assets.styles.as_slice(), |buffer, style| {
        write_style(assets, buffer, style);
        Ok(())
    });
    Ok(())
}

fn write_style<'a>(assets: &'a Assets<'a>, buffer: &mut DataBuffer<'a>, style: &'a Style) {
    let project = assets.project;

    let mut flags = match style_property(project, style, |s| s.align_horizontal.as_ref()) {
        Some(Alignment::Left) => STYLE_FLAGS_HORZ_ALIGN_LEFT,
        Some(Alignment::Right) => STYLE_FLAGS_HORZ_ALIGN_RIGHT,
        _ => STYLE_FLAGS_HORZ_ALIGN_CENTER,
    };
    flags |= match style_property(project, style, |s| s.align_vertical.as_ref()) {
        Some(Alignment::Top) => STYLE_FLAGS_VERT_ALIGN_TOP,
        Some(Alignment::Bottom) => STYLE_FLAGS_VERT_ALIGN_BOTTOM,
        _ => STYLE_FLAGS_VERT_ALIGN_CENTER,
    };
    if style_property(project, style, |s| s.blink.as_ref()) == Some(&true) {
        flags |= STYLE_FLAGS_BLINK;
    }
    buffer.write_u16(flags);

    let color_index = |get: fn(&Style) -> Option<&String>| {
        assets.color_index(style_property(project, style, get).map(String::as_str))
    };

    buffer.write_u16(color_index(|s| s.background_color.as_ref()));
    buffer.write_u16(color_index(|s| s.color.as_ref()));
    buffer.write_u16(color_index(|s| s.active_background_color.as_ref()));
    buffer.write_u16(color_index(|s| s.active_color.as_ref()));
    buffer.write_u16(color_index(|s| s.focus_background_color.as_ref()));
    buffer.write_u16(color_index(|s| s.focus_color.as_ref()));

    let border_size = style_property(project, style, |s| s.border_size.as_ref())
        .copied()
        .unwrap_or_default();
    write_rect(buffer, border_size);

    let border_radius = style_property(project, style, |s| s.border_radius.as_ref())
        .copied()
        .unwrap_or(0);
    buffer.write_u16(border_radius);

    buffer.write_u16(color_index(|s| s.border_color.as_ref()));

    let font_name = style_property(project, style, |s| s.font.as_ref());
    buffer.write_u8(assets.font_index(font_name.map(String::as_str)) as u8);

    let opacity = style_property(project, style, |s| s.opacity.as_ref())
        .copied()
        .unwrap_or(255);
    buffer.write_u8(opacity);

    let padding = style_property(project, style, |s| s.padding.as_ref())
        .copied()
        .unwrap_or_default();
    write_rect(buffer, padding);

    let margin = style_property(project, style, |s| s.margin.as_ref())
        .copied()
        .unwrap_or_default();
    write_rect(buffer, margin);
}

fn write_rect(buffer: &mut DataBuffer, rect: Rect) {
    buffer.write_u8(rect.top);
    buffer.write_u8(rect.right);
    buffer.write_u8(rect.bottom);
    buffer.write_u8(rect.left);
}
