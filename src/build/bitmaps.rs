//! Bitmaps region: a sub-table with one record per bitmap.

use crate::build::assets::Assets;
use crate::build::data_buffer::DataBuffer;
use crate::build::helper::{NamingConvention, TAB, get_name};
use crate::diagnostics::BuildError;

pub fn bitmaps_enum(assets: &Assets) -> String {
    let mut entries = vec![format!("{}BITMAP_ID_NONE = 0", TAB)];
    entries.extend(assets.bitmaps.iter().enumerate().map(|(i, bitmap)| {
        format!(
            "{}{} = {}",
            TAB,
            get_name("BITMAP_ID_", &bitmap.name, NamingConvention::UnderscoreUpperCase),
            i + 1
        )
    }));
    format!("enum BitmapsEnum {{\n{}\n}};", entries.join(",\n"))
}

pub fn bitmaps_data<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
) -> Result<(), BuildError> {
    buffer.write_regions(assets.bitmaps.len(), |buffer, i| {
        let bitmap = assets.bitmaps[i];
        let pixels = bitmap.raster()?;
        buffer.write_i16(bitmap.width);
        buffer.write_i16(bitmap.height);
        buffer.write_i16(bitmap.bpp);
        buffer.write_i16(0);
        buffer.write_u8_array(pixels);
        Ok(())
    })
}
