//! Name-list regions, present only in master project images.
//!
//! A resource image loaded on top of a parent firmware refers to the
//! parent's variables and actions by index, so the image carries the
//! names the parent uses to wire those indices up at load time.

use crate::build::assets::Assets;
use crate::build::data_buffer::DataBuffer;
use crate::diagnostics::BuildError;

pub fn action_names_data<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
) -> Result<(), BuildError> {
    buffer.write_array(assets.actions.as_slice(), |buffer, action| {
        buffer.write_string_offset(&action.name);
        Ok(())
    });
    Ok(())
}

pub fn variable_names_data<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
) -> Result<(), BuildError> {
    buffer.write_array(assets.variables.as_slice(), |buffer, variable| {
        buffer.write_string_offset(&variable.name);
        Ok(())
    });
    Ok(())
}
