//! Project document model.
//!
//! The editor owns the live, observable document; the build pipeline only
//! sees this read-only deserialized form for the duration of one build.
//! Field names match the JSON project format, so everything here derives
//! `Deserialize` and nothing in the build path mutates it.

use crate::diagnostics::BuildError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Project {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub styles: Vec<Style>,
    #[serde(default)]
    pub fonts: Vec<Font>,
    #[serde(default)]
    pub bitmaps: Vec<Bitmap>,
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub colors: Vec<ProjectColor>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub scpi: Option<Scpi>,

    // Imported projects, resolved from settings.general.imports by the loader.
    // Never present in the JSON itself.
    #[serde(skip)]
    pub imported: Vec<Project>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub build: BuildSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    #[serde(default)]
    pub project_type: ProjectType,

    // Path to the master project, when this project only layers resources
    // on top of a parent image. Presence alone gates several builders.
    #[serde(default)]
    pub master_project: Option<PathBuf>,

    #[serde(default)]
    pub imports: Vec<ImportDirective>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    #[default]
    Firmware,
    Resource,
    Applet,
}

impl ProjectType {
    /// Numeric tag written into the image header.
    pub fn as_number(self) -> u16 {
        match self {
            ProjectType::Firmware => 1,
            ProjectType::Resource => 2,
            ProjectType::Applet => 3,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDirective {
    pub project_file_path: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSettings {
    #[serde(default)]
    pub configurations: Vec<BuildConfiguration>,
    #[serde(default)]
    pub files: Vec<BuildFile>,
    #[serde(default)]
    pub destination_folder: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
    pub name: String,

    #[serde(default)]
    pub string_encoding: StringEncoding,
}

/// How strings land in the binary image. Must match what the firmware
/// loader expects, so it is a per-configuration knob rather than a constant.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StringEncoding {
    #[default]
    NulTerminated,
    LengthPrefixed,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFile {
    pub file_name: String,
    pub template: String,
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub name: String,

    #[serde(default)]
    pub left: i16,
    #[serde(default)]
    pub top: i16,
    #[serde(default)]
    pub width: i16,
    #[serde(default)]
    pub height: i16,

    #[serde(default)]
    pub style: Option<String>,

    #[serde(default)]
    pub close_page_if_touched_outside: bool,

    #[serde(default)]
    pub widgets: Vec<Widget>,

    // Build configurations this page belongs to; None means all of them
    #[serde(default)]
    pub used_in: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    #[serde(default)]
    pub left: i16,
    #[serde(default)]
    pub top: i16,
    #[serde(default)]
    pub width: i16,
    #[serde(default)]
    pub height: i16,

    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub style: Option<String>,

    #[serde(flatten)]
    pub kind: WidgetKind,
}

/// Closed set of widget variants, one encoder per variant.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum WidgetKind {
    Container {
        #[serde(default)]
        widgets: Vec<Widget>,
        #[serde(default)]
        overlay: Option<String>,
        #[serde(default)]
        shadow: bool,
    },
    List {
        #[serde(default)]
        list_type: ListType,
        #[serde(default)]
        item_widget: Option<Box<Widget>>,
        #[serde(default)]
        gap: u8,
    },
    Grid {
        #[serde(default)]
        grid_flow: GridFlow,
        #[serde(default)]
        item_widget: Option<Box<Widget>>,
    },
    Select {
        #[serde(default)]
        widgets: Vec<Widget>,
    },
    DisplayData {
        #[serde(default)]
        display_option: u8,
    },
    Text {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        ignore_luminosity: bool,
    },
    MultilineText {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        first_line_indent: i16,
        #[serde(default)]
        hanging_indent: i16,
    },
    Rectangle {
        #[serde(default)]
        invert_colors: bool,
        #[serde(default)]
        ignore_luminosity: bool,
    },
    Bitmap {
        #[serde(default)]
        bitmap: Option<String>,
    },
    Button {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        enabled: Option<String>,
        #[serde(default)]
        disabled_style: Option<String>,
    },
    ToggleButton {
        #[serde(default)]
        text1: Option<String>,
        #[serde(default)]
        text2: Option<String>,
    },
    ButtonGroup {
        #[serde(default)]
        selected_style: Option<String>,
    },
    BarGraph {
        #[serde(default)]
        orientation: BarGraphOrientation,
        #[serde(default = "default_true")]
        display_value: bool,
        #[serde(default)]
        text_style: Option<String>,
        #[serde(default)]
        line1_data: Option<String>,
        #[serde(default)]
        line1_style: Option<String>,
        #[serde(default)]
        line2_data: Option<String>,
        #[serde(default)]
        line2_style: Option<String>,
    },
    UpDown {
        #[serde(default)]
        buttons_style: Option<String>,
        #[serde(default)]
        down_button_text: Option<String>,
        #[serde(default)]
        up_button_text: Option<String>,
    },
    ListGraph {
        #[serde(default)]
        dwell_data: Option<String>,
        #[serde(default)]
        y1_data: Option<String>,
        #[serde(default)]
        y1_style: Option<String>,
        #[serde(default)]
        y2_data: Option<String>,
        #[serde(default)]
        y2_style: Option<String>,
        #[serde(default)]
        cursor_data: Option<String>,
        #[serde(default)]
        cursor_style: Option<String>,
    },
    LayoutView {
        #[serde(default)]
        layout: Option<String>,
        #[serde(default)]
        context: Option<String>,
    },
    AppView,
    ScrollBar {
        #[serde(default)]
        thumb_style: Option<String>,
        #[serde(default)]
        buttons_style: Option<String>,
        #[serde(default)]
        left_button_text: Option<String>,
        #[serde(default)]
        right_button_text: Option<String>,
    },
    Progress,
    Canvas,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ListType {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GridFlow {
    #[default]
    Row,
    Column,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BarGraphOrientation {
    #[default]
    LeftRight,
    RightLeft,
    TopBottom,
    BottomTop,
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub name: String,

    // Stable style id a parent firmware exposes; resource images built on
    // top of a master project reference styles through it.
    #[serde(default)]
    pub id: Option<u16>,

    #[serde(default)]
    pub inherit_from: Option<String>,

    #[serde(default)]
    pub align_horizontal: Option<Alignment>,
    #[serde(default)]
    pub align_vertical: Option<Alignment>,
    #[serde(default)]
    pub blink: Option<bool>,

    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub active_color: Option<String>,
    #[serde(default)]
    pub active_background_color: Option<String>,
    #[serde(default)]
    pub focus_color: Option<String>,
    #[serde(default)]
    pub focus_background_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,

    #[serde(default)]
    pub border_size: Option<Rect>,
    #[serde(default)]
    pub border_radius: Option<u16>,

    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub opacity: Option<u8>,

    #[serde(default)]
    pub padding: Option<Rect>,
    #[serde(default)]
    pub margin: Option<Rect>,

    #[serde(default)]
    pub always_build: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    #[serde(default)]
    pub top: u8,
    #[serde(default)]
    pub right: u8,
    #[serde(default)]
    pub bottom: u8,
    #[serde(default)]
    pub left: u8,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    pub name: String,

    #[serde(default)]
    pub ascent: u8,
    #[serde(default)]
    pub descent: u8,
    #[serde(default = "default_bpp")]
    pub bpp: u8,

    #[serde(default)]
    pub glyphs: Vec<Glyph>,

    #[serde(default)]
    pub always_build: bool,
}

fn default_bpp() -> u8 {
    1
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Glyph {
    pub encoding: u32,

    #[serde(default)]
    pub dx: i8,
    #[serde(default)]
    pub x: i8,
    #[serde(default)]
    pub y: i8,
    #[serde(default)]
    pub width: u8,
    #[serde(default)]
    pub height: u8,

    // Raster rows, already packed for the font's bpp.
    // Empty means the glyph has no bitmap and is encoded as absent.
    #[serde(default)]
    pub pixels: Vec<u8>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bitmap {
    pub name: String,

    pub width: i16,
    pub height: i16,
    #[serde(default = "default_bitmap_bpp")]
    pub bpp: i16,

    // Decoded raster bytes. Image decoding happens in the editor before the
    // document reaches the build pipeline.
    #[serde(default)]
    pub pixels: Vec<u8>,

    #[serde(default)]
    pub always_build: bool,
}

fn default_bitmap_bpp() -> i16 {
    16
}

impl Bitmap {
    /// Validate the raster against the declared dimensions.
    /// A mismatch means the external decode failed or was skipped.
    pub fn raster(&self) -> Result<&[u8], BuildError> {
        let expected = self.width as usize * self.height as usize * self.bpp as usize / 8;
        if self.pixels.len() != expected {
            return Err(BuildError::resource(format!(
                "bitmap raster is {} bytes, expected {} for {}x{} at {} bpp",
                self.pixels.len(),
                expected,
                self.width,
                self.height,
                self.bpp
            ))
            .for_entity(&self.name));
        }
        Ok(&self.pixels)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,

    // One color string per project color, overriding it for this theme
    #[serde(default)]
    pub colors: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectColor {
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,

    #[serde(default)]
    pub used_in: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,

    #[serde(default)]
    pub used_in: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scpi {
    #[serde(default)]
    pub subsystems: Vec<ScpiSubsystem>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScpiSubsystem {
    pub name: String,

    #[serde(default)]
    pub commands: Vec<ScpiCommand>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScpiCommand {
    // Dotted/colon SCPI syntax, e.g. "MEAS:VOLT?" or "*IDN?"
    pub name: String,
}

////////////////////////////////////////////////////////////////////////////////

impl Project {
    pub fn has_master_project(&self) -> bool {
        self.settings.general.master_project.is_some()
    }

    pub fn find_style(&self, name: &str) -> Option<&Style> {
        self.all_projects()
            .find_map(|p| p.styles.iter().find(|s| s.name == name))
    }

    pub fn find_font(&self, name: &str) -> Option<&Font> {
        self.all_projects()
            .find_map(|p| p.fonts.iter().find(|f| f.name == name))
    }

    pub fn find_bitmap(&self, name: &str) -> Option<&Bitmap> {
        self.all_projects()
            .find_map(|p| p.bitmaps.iter().find(|b| b.name == name))
    }

    /// The root project followed by every import, in declaration order.
    pub fn all_projects(&self) -> impl Iterator<Item = &Project> {
        std::iter::once(self).chain(self.imported.iter())
    }
}

/// Resolve a style property through the inherit chain.
/// Lookup stops at the first style that sets the property.
pub fn style_property<'a, T>(
    project: &'a Project,
    style: &'a Style,
    get: impl Fn(&'a Style) -> Option<&'a T>,
) -> Option<&'a T> {
    let mut current = Some(style);
    // Inherit chains are author-written, so guard against cycles
    let mut remaining = 32;
    while let Some(style) = current {
        if let Some(value) = get(style) {
            return Some(value);
        }
        remaining -= 1;
        if remaining == 0 {
            return None;
        }
        current = style
            .inherit_from
            .as_deref()
            .and_then(|parent| project.find_style(parent));
    }
    None
}

/// Load a project document and, recursively, the projects it imports.
pub fn load_project(path: &Path) -> Result<Project, BuildError> {
    let mut loading = Vec::new();
    load_project_guarded(path, &mut loading)
}

// `loading` holds the canonical paths on the current import chain, so a
// project importing one of its own ancestors fails instead of recursing.
fn load_project_guarded(path: &Path, loading: &mut Vec<PathBuf>) -> Result<Project, BuildError> {
    let canonical = fs::canonicalize(path)
        .map_err(|e| BuildError::file_error(path, format!("cannot read project file: {e}")))?;
    if loading.contains(&canonical) {
        return Err(BuildError::structural(format!(
            "import cycle through \"{}\"",
            path.display()
        )));
    }

    let source = fs::read_to_string(path)
        .map_err(|e| BuildError::file_error(path, format!("cannot read project file: {e}")))?;

    let mut project: Project = serde_json::from_str(&source)
        .map_err(|e| BuildError::file_error(path, format!("invalid project file: {e}")))?;

    loading.push(canonical);
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for import in &project.settings.general.imports {
        let import_path = base_dir.join(&import.project_file_path);
        let imported = load_project_guarded(&import_path, loading)?;
        project.imported.push(imported);
    }
    loading.pop();

    Ok(project)
}

#[cfg(test)]
mod project_tests {
    use super::*;

    #[test]
    fn widget_kind_deserializes_from_tagged_json() {
        let json = r#"{
            "type": "Text",
            "left": 4,
            "top": 8,
            "width": 64,
            "height": 16,
            "text": "hello",
            "style": "default"
        }"#;

        let widget: Widget = serde_json::from_str(json).expect("widget should deserialize");
        assert_eq!(widget.left, 4);
        match widget.kind {
            WidgetKind::Text { ref text, .. } => {
                assert_eq!(text.as_deref(), Some("hello"));
            }
            ref other => panic!("expected Text widget, got {:?}", other),
        }
    }

    #[test]
    fn style_property_follows_inherit_chain() {
        let project: Project = serde_json::from_str(
            r##"{
                "styles": [
                    { "name": "base", "color": "#ff0000" },
                    { "name": "child", "inheritFrom": "base" }
                ]
            }"##,
        )
        .expect("project should deserialize");

        let child = project.find_style("child").expect("child style exists");
        let color = style_property(&project, child, |s| s.color.as_ref());
        assert_eq!(color.map(String::as_str), Some("#ff0000"));
    }

    #[test]
    fn cyclic_imports_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.gui-project");
        let b = dir.path().join("b.gui-project");
        fs::write(
            &a,
            r#"{ "settings": { "general": { "imports": [{ "projectFilePath": "b.gui-project" }] } } }"#,
        )
        .unwrap();
        fs::write(
            &b,
            r#"{ "settings": { "general": { "imports": [{ "projectFilePath": "a.gui-project" }] } } }"#,
        )
        .unwrap();

        let err = match load_project(&a) {
            Ok(_) => panic!("cyclic imports should fail to load"),
            Err(err) => err,
        };
        assert_eq!(err.kind, crate::diagnostics::ErrorKind::Structural);
        assert!(err.msg.contains("import cycle"));
    }

    #[test]
    fn bitmap_raster_size_is_validated() {
        let bitmap = Bitmap {
            name: "logo".to_string(),
            width: 2,
            height: 2,
            bpp: 16,
            pixels: vec![0; 7],
            always_build: false,
        };

        let err = bitmap.raster().expect_err("short raster should fail");
        assert_eq!(err.kind, crate::diagnostics::ErrorKind::Resource);
    }
}
