//! Document region: pages and their widget trees.
//!
//! Every widget is one 20-byte base record followed by a variant payload
//! referenced by offset. Child widgets of one parent are written as a
//! contiguous run of base records so the firmware indexes them directly.

use crate::build::assets::Assets;
use crate::build::data_buffer::DataBuffer;
use crate::build::helper::{NamingConvention, TAB, get_name};
use crate::diagnostics::BuildError;
use crate::project::{BarGraphOrientation, GridFlow, ListType, Page, Widget, WidgetKind};

pub const WIDGET_TYPE_NONE: u8 = 0;
pub const WIDGET_TYPE_CONTAINER: u8 = 1;
pub const WIDGET_TYPE_LIST: u8 = 2;
pub const WIDGET_TYPE_GRID: u8 = 3;
pub const WIDGET_TYPE_SELECT: u8 = 4;
pub const WIDGET_TYPE_DISPLAY_DATA: u8 = 5;
pub const WIDGET_TYPE_TEXT: u8 = 6;
pub const WIDGET_TYPE_MULTILINE_TEXT: u8 = 7;
pub const WIDGET_TYPE_RECTANGLE: u8 = 8;
pub const WIDGET_TYPE_BITMAP: u8 = 9;
pub const WIDGET_TYPE_BUTTON: u8 = 10;
pub const WIDGET_TYPE_TOGGLE_BUTTON: u8 = 11;
pub const WIDGET_TYPE_BUTTON_GROUP: u8 = 12;
pub const WIDGET_TYPE_BAR_GRAPH: u8 = 14;
pub const WIDGET_TYPE_LAYOUT_VIEW: u8 = 15;
pub const WIDGET_TYPE_UP_DOWN: u8 = 17;
pub const WIDGET_TYPE_LIST_GRAPH: u8 = 18;
pub const WIDGET_TYPE_APP_VIEW: u8 = 19;
pub const WIDGET_TYPE_SCROLL_BAR: u8 = 20;
pub const WIDGET_TYPE_PROGRESS: u8 = 21;
pub const WIDGET_TYPE_CANVAS: u8 = 22;

pub const LIST_TYPE_VERTICAL: u8 = 1;
pub const LIST_TYPE_HORIZONTAL: u8 = 2;

pub const GRID_FLOW_ROW: u8 = 1;
pub const GRID_FLOW_COLUMN: u8 = 2;

pub const BAR_GRAPH_ORIENTATION_LEFT_RIGHT: u8 = 1;
pub const BAR_GRAPH_ORIENTATION_RIGHT_LEFT: u8 = 2;
pub const BAR_GRAPH_ORIENTATION_TOP_BOTTOM: u8 = 3;
pub const BAR_GRAPH_ORIENTATION_BOTTOM_TOP: u8 = 4;
pub const BAR_GRAPH_DO_NOT_DISPLAY_VALUE: u8 = 1 << 4;

const PAGE_FLAG_CLOSE_IF_TOUCHED_OUTSIDE: u8 = 2;
const CONTAINER_FLAG_SHADOW: u8 = 1;

/// `enum PagesEnum { ... };` for the generated declarations file.
pub fn pages_enum(assets: &Assets) -> String {
    let mut entries = vec![format!("{}PAGE_ID_NONE = 0", TAB)];
    entries.extend(assets.pages.iter().enumerate().map(|(i, page)| {
        format!(
            "{}{} = {}",
            TAB,
            get_name("PAGE_ID_", &page.name, NamingConvention::UnderscoreUpperCase),
            i + 1
        )
    }));
    format!("enum PagesEnum {{\n{}\n}};", entries.join(",\n"))
}

/// Document region: an array of page records.
pub fn document_data<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
) -> Result<(), BuildError> {
    buffer.write_array(assets.pages.as_slice(), |buffer, page| {
        write_page(assets, buffer, page)
    });
    Ok(())
}

/// A page is a container widget whose payload carries the page flags.
fn write_page<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
    page: &'a &'a Page,
) -> Result<(), BuildError> {
    buffer.write_u8(WIDGET_TYPE_CONTAINER);
    buffer.write_u8(0);
    buffer.write_u16(0); // data
    buffer.write_u16(0); // action
    buffer.write_i16(page.left);
    buffer.write_i16(page.top);
    buffer.write_i16(page.width);
    buffer.write_i16(page.height);
    buffer.write_u16(assets.style_index(page.style.as_deref()));

    let mut flags = 0;
    if page.close_page_if_touched_outside {
        flags |= PAGE_FLAG_CLOSE_IF_TOUCHED_OUTSIDE;
    }

    buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
        buffer.write_array(page.widgets.as_slice(), |buffer, widget| {
            write_widget(assets, buffer, widget)
        });
        buffer.write_u16(0); // overlay
        buffer.write_u8(flags);
        Ok(())
    }));
    Ok(())
}

pub fn write_widget<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
    widget: &'a Widget,
) -> Result<(), BuildError> {
    buffer.write_u8(widget_type(&widget.kind));
    buffer.write_u8(0);
    buffer.write_u16(assets.variable_index(widget.data.as_deref()));
    buffer.write_u16(assets.action_index(widget.action.as_deref()));
    buffer.write_i16(widget.left);
    buffer.write_i16(widget.top);
    buffer.write_i16(widget.width);
    buffer.write_i16(widget.height);
    buffer.write_u16(assets.style_index(widget.style.as_deref()));
    write_specific(assets, buffer, widget);
    Ok(())
}

fn widget_type(kind: &WidgetKind) -> u8 {
    match kind {
        WidgetKind::Container { .. } => WIDGET_TYPE_CONTAINER,
        WidgetKind::List { .. } => WIDGET_TYPE_LIST,
        WidgetKind::Grid { .. } => WIDGET_TYPE_GRID,
        WidgetKind::Select { .. } => WIDGET_TYPE_SELECT,
        WidgetKind::DisplayData { .. } => WIDGET_TYPE_DISPLAY_DATA,
        WidgetKind::Text { .. } => WIDGET_TYPE_TEXT,
        WidgetKind::MultilineText { .. } => WIDGET_TYPE_MULTILINE_TEXT,
        WidgetKind::Rectangle { .. } => WIDGET_TYPE_RECTANGLE,
        WidgetKind::Bitmap { .. } => WIDGET_TYPE_BITMAP,
        WidgetKind::Button { .. } => WIDGET_TYPE_BUTTON,
        WidgetKind::ToggleButton { .. } => WIDGET_TYPE_TOGGLE_BUTTON,
        WidgetKind::ButtonGroup { .. } => WIDGET_TYPE_BUTTON_GROUP,
        WidgetKind::BarGraph { .. } => WIDGET_TYPE_BAR_GRAPH,
        WidgetKind::UpDown { .. } => WIDGET_TYPE_UP_DOWN,
        WidgetKind::ListGraph { .. } => WIDGET_TYPE_LIST_GRAPH,
        WidgetKind::LayoutView { .. } => WIDGET_TYPE_LAYOUT_VIEW,
        WidgetKind::AppView => WIDGET_TYPE_APP_VIEW,
        WidgetKind::ScrollBar { .. } => WIDGET_TYPE_SCROLL_BAR,
        WidgetKind::Progress => WIDGET_TYPE_PROGRESS,
        WidgetKind::Canvas => WIDGET_TYPE_CANVAS,
    }
}

fn write_specific<'a>(assets: &'a Assets<'a>, buffer: &mut DataBuffer<'a>, widget: &'a Widget) {
    match &widget.kind {
        WidgetKind::Container {
            widgets,
            overlay,
            shadow,
        } => {
            let overlay_index = assets.variable_index(overlay.as_deref());
            let mut flags = 0;
            if overlay_index != 0 && *shadow {
                flags |= CONTAINER_FLAG_SHADOW;
            }
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_array(widgets.as_slice(), |buffer, child| {
                    write_widget(assets, buffer, child)
                });
                buffer.write_u16(overlay_index);
                buffer.write_u8(flags);
                Ok(())
            }));
        }
        WidgetKind::Select { widgets } => {
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_array(widgets.as_slice(), |buffer, child| {
                    write_widget(assets, buffer, child)
                });
                Ok(())
            }));
        }
        WidgetKind::List {
            list_type,
            item_widget,
            gap,
        } => {
            let list_type = match list_type {
                ListType::Vertical => LIST_TYPE_VERTICAL,
                ListType::Horizontal => LIST_TYPE_HORIZONTAL,
            };
            let gap = *gap;
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u8(list_type);
                write_item_widget(assets, buffer, item_widget.as_deref());
                buffer.write_u8(gap);
                Ok(())
            }));
        }
        WidgetKind::Grid {
            grid_flow,
            item_widget,
        } => {
            let grid_flow = match grid_flow {
                GridFlow::Row => GRID_FLOW_ROW,
                GridFlow::Column => GRID_FLOW_COLUMN,
            };
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u8(grid_flow);
                write_item_widget(assets, buffer, item_widget.as_deref());
                Ok(())
            }));
        }
        WidgetKind::DisplayData { display_option } => {
            let display_option = *display_option;
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u8(display_option);
                Ok(())
            }));
        }
        WidgetKind::Text {
            text,
            ignore_luminosity,
        } => {
            let mut flags = 0;
            if *ignore_luminosity {
                flags |= 1 << 0;
            }
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_string_offset(text.as_deref().unwrap_or(""));
                buffer.write_u8(flags);
                Ok(())
            }));
        }
        WidgetKind::MultilineText {
            text,
            first_line_indent,
            hanging_indent,
        } => {
            let first_line_indent = *first_line_indent;
            let hanging_indent = *hanging_indent;
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_string_offset(text.as_deref().unwrap_or(""));
                buffer.write_i16(first_line_indent);
                buffer.write_i16(hanging_indent);
                Ok(())
            }));
        }
        WidgetKind::Rectangle {
            invert_colors,
            ignore_luminosity,
        } => {
            let mut flags = 0;
            if *invert_colors {
                flags |= 1 << 0;
            }
            if *ignore_luminosity {
                flags |= 1 << 1;
            }
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u8(flags);
                Ok(())
            }));
        }
        WidgetKind::Bitmap { bitmap } => {
            let bitmap_index = assets.bitmap_index(bitmap.as_deref()) as u8;
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u8(bitmap_index);
                Ok(())
            }));
        }
        WidgetKind::Button {
            text,
            enabled,
            disabled_style,
        } => {
            let enabled_index = assets.variable_index(enabled.as_deref());
            let disabled_style_index = assets.style_index(disabled_style.as_deref());
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_string_offset(text.as_deref().unwrap_or(""));
                buffer.write_u16(enabled_index);
                buffer.write_u16(disabled_style_index);
                Ok(())
            }));
        }
        WidgetKind::ToggleButton { text1, text2 } => {
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_string_offset(text1.as_deref().unwrap_or(""));
                buffer.write_string_offset(text2.as_deref().unwrap_or(""));
                Ok(())
            }));
        }
        WidgetKind::ButtonGroup { selected_style } => {
            let selected_style_index = assets.style_index(selected_style.as_deref());
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u16(selected_style_index);
                Ok(())
            }));
        }
        WidgetKind::BarGraph {
            orientation,
            display_value,
            text_style,
            line1_data,
            line1_style,
            line2_data,
            line2_style,
        } => {
            let mut orientation = match orientation {
                BarGraphOrientation::LeftRight => BAR_GRAPH_ORIENTATION_LEFT_RIGHT,
                BarGraphOrientation::RightLeft => BAR_GRAPH_ORIENTATION_RIGHT_LEFT,
                BarGraphOrientation::TopBottom => BAR_GRAPH_ORIENTATION_TOP_BOTTOM,
                BarGraphOrientation::BottomTop => BAR_GRAPH_ORIENTATION_BOTTOM_TOP,
            };
            if !display_value {
                orientation |= BAR_GRAPH_DO_NOT_DISPLAY_VALUE;
            }
            let text_style_index = assets.style_index(text_style.as_deref());
            let line1_data_index = assets.variable_index(line1_data.as_deref());
            let line1_style_index = assets.style_index(line1_style.as_deref());
            let line2_data_index = assets.variable_index(line2_data.as_deref());
            let line2_style_index = assets.style_index(line2_style.as_deref());
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u8(orientation);
                buffer.write_u16(text_style_index);
                buffer.write_u16(line1_data_index);
                buffer.write_u16(line1_style_index);
                buffer.write_u16(line2_data_index);
                buffer.write_u16(line2_style_index);
                Ok(())
            }));
        }
        WidgetKind::UpDown {
            buttons_style,
            down_button_text,
            up_button_text,
        } => {
            let buttons_style_index = assets.style_index(buttons_style.as_deref());
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u16(buttons_style_index);
                buffer.write_string_offset(down_button_text.as_deref().unwrap_or("<"));
                buffer.write_string_offset(up_button_text.as_deref().unwrap_or(">"));
                Ok(())
            }));
        }
        WidgetKind::ListGraph {
            dwell_data,
            y1_data,
            y1_style,
            y2_data,
            y2_style,
            cursor_data,
            cursor_style,
        } => {
            let dwell_data_index = assets.variable_index(dwell_data.as_deref());
            let y1_data_index = assets.variable_index(y1_data.as_deref());
            let y1_style_index = assets.style_index(y1_style.as_deref());
            let y2_data_index = assets.variable_index(y2_data.as_deref());
            let y2_style_index = assets.style_index(y2_style.as_deref());
            let cursor_data_index = assets.variable_index(cursor_data.as_deref());
            let cursor_style_index = assets.style_index(cursor_style.as_deref());
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u16(dwell_data_index);
                buffer.write_u16(y1_data_index);
                buffer.write_u16(y1_style_index);
                buffer.write_u16(y2_data_index);
                buffer.write_u16(y2_style_index);
                buffer.write_u16(cursor_data_index);
                buffer.write_u16(cursor_style_index);
                Ok(())
            }));
        }
        WidgetKind::LayoutView { layout, context } => {
            let layout_index = match layout.as_deref() {
                Some(name) => assets.page_index(name) as i16,
                None => 0,
            };
            let context_index = assets.variable_index(context.as_deref());
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_i16(layout_index);
                buffer.write_u16(context_index);
                Ok(())
            }));
        }
        WidgetKind::ScrollBar {
            thumb_style,
            buttons_style,
            left_button_text,
            right_button_text,
        } => {
            let thumb_style_index = assets.style_index(thumb_style.as_deref());
            let buttons_style_index = assets.style_index(buttons_style.as_deref());
            buffer.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
                buffer.write_u16(thumb_style_index);
                buffer.write_u16(buttons_style_index);
                buffer.write_string_offset(left_button_text.as_deref().unwrap_or("<"));
                buffer.write_string_offset(right_button_text.as_deref().unwrap_or(">"));
                Ok(())
            }));
        }
        WidgetKind::AppView | WidgetKind::Progress | WidgetKind::Canvas => {
            // no payload
            buffer.write_u32(0);
        }
    }
}

fn write_item_widget<'a>(
    assets: &'a Assets<'a>,
    buffer: &mut DataBuffer<'a>,
    item_widget: Option<&'a Widget>,
) {
    buffer.write_object_offset(
        item_widget
            .map(|item| move |buffer: &mut DataBuffer<'a>| write_widget(assets, buffer, item)),
    );
}

#[cfg(test)]
mod widgets_tests {
    use super::*;
    use crate::project::{Project, StringEncoding};

    fn build_document(json: &str) -> Vec<u8> {
        let project: Project = serde_json::from_str(json).expect("test project");
        let project = Box::leak(Box::new(project));
        let assets = Assets::collect(project, "Default").unwrap();
        let assets = Box::leak(Box::new(assets));
        let mut buffer = DataBuffer::new(StringEncoding::NulTerminated);
        buffer
            .write_regions(1, |buffer, _| document_data(assets, buffer))
            .unwrap();
        buffer.finalize().unwrap()
    }

    fn read_u32(data: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(data[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn child_widgets_form_a_contiguous_run() {
        let data = build_document(
            r#"{
                "pages": [{
                    "name": "main",
                    "width": 480,
                    "height": 272,
                    "widgets": [
                        { "type": "Text", "left": 0, "text": "a" },
                        { "type": "Progress", "left": 10 },
                        { "type": "Canvas", "left": 20 }
                    ]
                }]
            }"#,
        );

        let region = read_u32(&data, 0) as usize;
        assert_eq!(read_u32(&data, region), 1); // one page

        let pages = region + read_u32(&data, region + 4) as usize;
        assert_eq!(data[pages], WIDGET_TYPE_CONTAINER);

        let payload = region + read_u32(&data, pages + 16) as usize;
        assert_eq!(read_u32(&data, payload), 3); // three children

        let children = region + read_u32(&data, payload + 4) as usize;
        // base records are 20 bytes each, back to back
        assert_eq!(data[children], WIDGET_TYPE_TEXT);
        assert_eq!(data[children + 20], WIDGET_TYPE_PROGRESS);
        assert_eq!(data[children + 40], WIDGET_TYPE_CANVAS);

        // x coordinate of the third child
        let x = i16::from_le_bytes(data[children + 46..children + 48].try_into().unwrap());
        assert_eq!(x, 20);

        // widgets without a payload carry offset 0
        assert_eq!(read_u32(&data, children + 36), 0);
    }

    #[test]
    fn text_payload_is_reachable_through_offsets() {
        let data = build_document(
            r#"{
                "pages": [{
                    "name": "main",
                    "widgets": [{ "type": "Text", "text": "hello" }]
                }]
            }"#,
        );

        let region = read_u32(&data, 0) as usize;
        let pages = region + read_u32(&data, region + 4) as usize;
        let page_payload = region + read_u32(&data, pages + 16) as usize;
        let children = region + read_u32(&data, page_payload + 4) as usize;
        let text_payload = region + read_u32(&data, children + 16) as usize;
        let text = region + read_u32(&data, text_payload) as usize;
        assert_eq!(&data[text..text + 6], b"hello\0");
    }
}
