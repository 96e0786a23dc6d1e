//! Asset collection.
//!
//! A build starts with one full walk of the document that gathers every
//! referenced style, font and bitmap into ordered tables. After `collect`
//! the tables never change; the builders only look indices up, so a missing
//! reference can never grow a table mid-build and shift ids under an
//! already-written record.
//!
//! Indices are 1-based. Index 0 is the reserved "none" id in every table.

use crate::build::helper::{NamingConvention, get_name};
use crate::diagnostics::{BuildError, BuildMessage};
use crate::project::{
    Action, Bitmap, Font, Page, Project, Style, Variable, Widget, WidgetKind, style_property,
};
use crate::settings::ASSETS_CAPACITY;
use rustc_hash::FxHashMap;
use std::sync::Mutex;

pub struct Assets<'a> {
    pub project: &'a Project,
    pub configuration: &'a str,

    // A project built on top of a master firmware binds variables, actions
    // and pages through the name tables at load time; their indices are
    // written negated, and styles resolve to the parent's stable ids.
    pub master: bool,

    pub pages: Vec<&'a Page>,
    pub styles: Vec<&'a Style>,
    pub fonts: Vec<&'a Font>,
    pub bitmaps: Vec<&'a Bitmap>,

    // Referenced in walk order so the name-list regions of a master project
    // image line up with the indices written into widget records.
    pub variables: Vec<&'a Variable>,
    pub actions: Vec<&'a Action>,

    // Literal colors used by styles that are not named project colors.
    // A color index addresses project colors first, then this list.
    pub colors: Vec<&'a str>,

    style_indices: FxHashMap<&'a str, usize>,
    font_indices: FxHashMap<&'a str, usize>,
    bitmap_indices: FxHashMap<&'a str, usize>,
    variable_indices: FxHashMap<&'a str, usize>,
    action_indices: FxHashMap<&'a str, usize>,

    // Builders run on worker threads with a shared `&Assets`, so warnings
    // raised during index lookups go through this lock.
    messages: Mutex<Vec<BuildMessage>>,
}

impl<'a> Assets<'a> {
    pub fn collect(project: &'a Project, configuration: &'a str) -> Result<Assets<'a>, BuildError> {
        let master = project.has_master_project();
        let mut assets = Assets {
            project,
            configuration,
            master,
            pages: Vec::with_capacity(ASSETS_CAPACITY),
            styles: Vec::with_capacity(ASSETS_CAPACITY),
            fonts: Vec::with_capacity(ASSETS_CAPACITY),
            bitmaps: Vec::with_capacity(ASSETS_CAPACITY),
            variables: Vec::with_capacity(ASSETS_CAPACITY),
            actions: Vec::with_capacity(ASSETS_CAPACITY),
            colors: Vec::new(),
            style_indices: FxHashMap::default(),
            font_indices: FxHashMap::default(),
            bitmap_indices: FxHashMap::default(),
            variable_indices: FxHashMap::default(),
            action_indices: FxHashMap::default(),
            messages: Mutex::new(Vec::new()),
        };

        for page in &project.pages {
            if !used_in_configuration(page.used_in.as_deref(), configuration) {
                continue;
            }
            assets.pages.push(page);
        }

        // The name tables of a resource image list every variable and
        // action in document order, referenced or not, so the parent
        // firmware can bind them by position at load time.
        if master {
            for p in project.all_projects() {
                for variable in &p.variables {
                    if used_in_configuration(variable.used_in.as_deref(), configuration) {
                        assets.variables.push(variable);
                        assets
                            .variable_indices
                            .insert(variable.name.as_str(), assets.variables.len());
                    }
                }
                for action in &p.actions {
                    if used_in_configuration(action.used_in.as_deref(), configuration) {
                        assets.actions.push(action);
                        assets
                            .action_indices
                            .insert(action.name.as_str(), assets.actions.len());
                    }
                }
            }
        }

        for p in project.all_projects() {
            for style in &p.styles {
                if style.always_build && !master {
                    assets.add_style(style);
                }
            }
            for font in &p.fonts {
                if font.always_build {
                    assets.add_font(font);
                }
            }
            for bitmap in &p.bitmaps {
                if bitmap.always_build {
                    assets.add_bitmap(bitmap);
                }
            }
        }

        for page in assets.pages.clone() {
            assets.collect_style_ref(page.style.as_deref());
            for widget in &page.widgets {
                assets.collect_widget(widget);
            }
        }

        assets.check_identifiers()?;
        assets.report_unused();

        Ok(assets)
    }

    fn collect_widget(&mut self, widget: &'a Widget) {
        self.collect_style_ref(widget.style.as_deref());
        self.collect_variable_ref(widget.data.as_deref());
        self.collect_action_ref(widget.action.as_deref());

        match &widget.kind {
            WidgetKind::Container {
                widgets, overlay, ..
            } => {
                self.collect_variable_ref(overlay.as_deref());
                for child in widgets {
                    self.collect_widget(child);
                }
            }
            WidgetKind::Select { widgets } => {
                for child in widgets {
                    self.collect_widget(child);
                }
            }
            WidgetKind::List { item_widget, .. } | WidgetKind::Grid { item_widget, .. } => {
                if let Some(item) = item_widget {
                    self.collect_widget(item);
                }
            }
            WidgetKind::Bitmap { bitmap } => {
                if let Some(name) = bitmap.as_deref() {
                    match self.project.find_bitmap(name) {
                        Some(bitmap) => self.add_bitmap(bitmap),
                        None => self.warn(format!("bitmap not found: {}", name)),
                    }
                }
            }
            WidgetKind::Button {
                enabled,
                disabled_style,
                ..
            } => {
                self.collect_variable_ref(enabled.as_deref());
                self.collect_style_ref(disabled_style.as_deref());
            }
            WidgetKind::ButtonGroup { selected_style } => {
                self.collect_style_ref(selected_style.as_deref());
            }
            WidgetKind::BarGraph {
                text_style,
                line1_data,
                line1_style,
                line2_data,
                line2_style,
                ..
            } => {
                self.collect_style_ref(text_style.as_deref());
                self.collect_variable_ref(line1_data.as_deref());
                self.collect_style_ref(line1_style.as_deref());
                self.collect_variable_ref(line2_data.as_deref());
                self.collect_style_ref(line2_style.as_deref());
            }
            WidgetKind::UpDown { buttons_style, .. } => {
                self.collect_style_ref(buttons_style.as_deref());
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
                self.collect_variable_ref(dwell_data.as_deref());
                self.collect_variable_ref(y1_data.as_deref());
                self.collect_style_ref(y1_style.as_deref());
                self.collect_variable_ref(y2_data.as_deref());
                self.collect_style_ref(y2_style.as_deref());
                self.collect_variable_ref(cursor_data.as_deref());
                self.collect_style_ref(cursor_style.as_deref());
            }
            WidgetKind::LayoutView { context, .. } => {
                self.collect_variable_ref(context.as_deref());
            }
            WidgetKind::ScrollBar {
                thumb_style,
                buttons_style,
                ..
            } => {
                self.collect_style_ref(thumb_style.as_deref());
                self.collect_style_ref(buttons_style.as_deref());
            }
            _ => {}
        }
    }

    fn collect_variable_ref(&mut self, name: Option<&str>) {
        let Some(name) = name else { return };
        if self.variable_indices.contains_key(name) {
            return;
        }
        let found = self.project.all_projects().find_map(|p| {
            p.variables
                .iter()
                .find(|v| v.name == name && used_in_configuration(v.used_in.as_deref(), self.configuration))
        });
        match found {
            Some(variable) => {
                self.variables.push(variable);
                self.variable_indices
                    .insert(variable.name.as_str(), self.variables.len());
            }
            None => self.warn(format!("variable not found: {}", name)),
        }
    }

    fn collect_action_ref(&mut self, name: Option<&str>) {
        let Some(name) = name else { return };
        if self.action_indices.contains_key(name) {
            return;
        }
        let found = self.project.all_projects().find_map(|p| {
            p.actions
                .iter()
                .find(|a| a.name == name && used_in_configuration(a.used_in.as_deref(), self.configuration))
        });
        match found {
            Some(action) => {
                self.actions.push(action);
                self.action_indices
                    .insert(action.name.as_str(), self.actions.len());
            }
            None => self.warn(format!("action not found: {}", name)),
        }
    }

    fn collect_style_ref(&mut self, name: Option<&str>) {
        let Some(name) = name else { return };
        // Master-project styles live in the parent firmware; none are
        // collected and references resolve to stable ids at write time.
        if self.master {
            return;
        }
        match self.project.find_style(name) {
            Some(style) => self.add_style(style),
            None => self.warn(format!("style not found: {}", name)),
        }
    }

    fn add_style(&mut self, style: &'a Style) {
        if self.style_indices.contains_key(style.name.as_str()) {
            return;
        }
        self.styles.push(style);
        self.style_indices
            .insert(style.name.as_str(), self.styles.len());

        // The whole inherit chain contributes properties, so the font a
        // style ends up using may be declared on an ancestor.
        if let Some(font_name) = style_property(self.project, style, |s| s.font.as_ref()) {
            match self.project.find_font(font_name) {
                Some(font) => self.add_font(font),
                None => self.warn(format!("font not found: {}", font_name)),
            }
        }
        let color_props: [Option<&'a String>; 7] = [
            style_property(self.project, style, |s| s.color.as_ref()),
            style_property(self.project, style, |s| s.background_color.as_ref()),
            style_property(self.project, style, |s| s.active_color.as_ref()),
            style_property(self.project, style, |s| s.active_background_color.as_ref()),
            style_property(self.project, style, |s| s.focus_color.as_ref()),
            style_property(self.project, style, |s| s.focus_background_color.as_ref()),
            style_property(self.project, style, |s| s.border_color.as_ref()),
        ];
        for color in color_props.into_iter().flatten() {
            self.register_color(color);
        }

        if let Some(parent) = style.inherit_from.as_deref() {
            match self.project.find_style(parent) {
                Some(parent) => self.add_style(parent),
                None => self.warn(format!("style not found: {}", parent)),
            }
        }
    }

    fn register_color(&mut self, color: &'a str) {
        if self.project.colors.iter().any(|c| c.name == color) {
            return;
        }
        if !self.colors.contains(&color) {
            self.colors.push(color);
        }
    }

    fn add_font(&mut self, font: &'a Font) {
        if self.font_indices.contains_key(font.name.as_str()) {
            return;
        }
        self.fonts.push(font);
        self.font_indices.insert(font.name.as_str(), self.fonts.len());
    }

    fn add_bitmap(&mut self, bitmap: &'a Bitmap) {
        if self.bitmap_indices.contains_key(bitmap.name.as_str()) {
            return;
        }
        self.bitmaps.push(bitmap);
        self.bitmap_indices
            .insert(bitmap.name.as_str(), self.bitmaps.len());
    }

    /// Index of a style by name, 0 when absent. Under a master project the
    /// reference resolves to the stable id the parent firmware assigned,
    /// walking the inherit chain when the named style carries none.
    pub fn style_index(&self, name: Option<&str>) -> u16 {
        if self.master {
            let Some(name) = name else { return 0 };
            let mut current = self.project.find_style(name);
            let mut remaining = 32;
            while let Some(style) = current {
                if let Some(id) = style.id {
                    return id;
                }
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
                current = style
                    .inherit_from
                    .as_deref()
                    .and_then(|parent| self.project.find_style(parent));
            }
            return 0;
        }
        self.lookup(name, &self.style_indices, "style")
    }

    pub fn font_index(&self, name: Option<&str>) -> u16 {
        self.lookup(name, &self.font_indices, "font")
    }

    pub fn bitmap_index(&self, name: Option<&str>) -> u16 {
        self.lookup(name, &self.bitmap_indices, "bitmap")
    }

    pub fn variable_index(&self, name: Option<&str>) -> u16 {
        self.negate_for_master(self.lookup(name, &self.variable_indices, "variable"))
    }

    pub fn action_index(&self, name: Option<&str>) -> u16 {
        self.negate_for_master(self.lookup(name, &self.action_indices, "action"))
    }

    // Negative indices tell the firmware to bind through the name tables
    // instead of the image's own asset tables.
    fn negate_for_master(&self, index: u16) -> u16 {
        if self.master { (-(index as i16)) as u16 } else { index }
    }

    /// Index into the color table written with the themes region. Project
    /// colors come first, literal colors after them. 0-based, since every
    /// style record stores a color slot whether set or not.
    pub fn color_index(&self, color: Option<&str>) -> u16 {
        let Some(color) = color else { return 0 };
        if let Some(i) = self.project.colors.iter().position(|c| c.name == color) {
            return i as u16;
        }
        match self.colors.iter().position(|c| *c == color) {
            Some(i) => (self.project.colors.len() + i) as u16,
            None => {
                self.warn_shared(format!("color not found: {}", color));
                0
            }
        }
    }

    /// Index of a page by name, 0 when absent. Pages are not deduplicated
    /// through a map since nothing references them more than once per record.
    pub fn page_index(&self, name: &str) -> u16 {
        match self.pages.iter().position(|p| p.name == name) {
            Some(i) => self.negate_for_master((i + 1) as u16),
            None => {
                self.warn_shared(format!("page not found: {}", name));
                0
            }
        }
    }

    fn lookup(&self, name: Option<&str>, indices: &FxHashMap<&str, usize>, kind: &str) -> u16 {
        let Some(name) = name else { return 0 };
        match indices.get(name) {
            Some(index) => *index as u16,
            None => {
                self.warn_shared(format!("{} not found: {}", kind, name));
                0
            }
        }
    }

    fn warn(&mut self, text: String) {
        if let Ok(messages) = self.messages.get_mut() {
            messages.push(BuildMessage::warning(text));
        }
    }

    fn warn_shared(&self, text: String) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(BuildMessage::warning(text));
        }
    }

    pub fn take_messages(&self) -> Vec<BuildMessage> {
        match self.messages.lock() {
            Ok(mut messages) => std::mem::take(&mut *messages),
            Err(_) => Vec::new(),
        }
    }

    /// Generated C identifiers must be unique per table. Distinct document
    /// names can collapse to the same identifier after sanitization.
    fn check_identifiers(&self) -> Result<(), BuildError> {
        check_unique("page", self.pages.iter().map(|p| p.name.as_str()))?;
        check_unique("style", self.styles.iter().map(|s| s.name.as_str()))?;
        check_unique("font", self.fonts.iter().map(|f| f.name.as_str()))?;
        check_unique("bitmap", self.bitmaps.iter().map(|b| b.name.as_str()))?;
        check_unique("theme", self.project.themes.iter().map(|t| t.name.as_str()))?;
        check_unique("color", self.project.colors.iter().map(|c| c.name.as_str()))?;
        Ok(())
    }

    fn report_unused(&mut self) {
        let mut unused = Vec::new();
        // Style and font tables stay empty under a master project, which
        // says nothing about whether the document uses them.
        if !self.master {
            for style in &self.project.styles {
                if !self.style_indices.contains_key(style.name.as_str()) {
                    unused.push(BuildMessage::info(format!("Unused style: {}", style.name)));
                }
            }
            for font in &self.project.fonts {
                if !self.font_indices.contains_key(font.name.as_str()) {
                    unused.push(BuildMessage::info(format!("Unused font: {}", font.name)));
                }
            }
        }
        for bitmap in &self.project.bitmaps {
            if !self.bitmap_indices.contains_key(bitmap.name.as_str()) {
                unused.push(BuildMessage::info(format!("Unused bitmap: {}", bitmap.name)));
            }
        }
        if let Ok(messages) = self.messages.get_mut() {
            messages.extend(unused);
        }
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), BuildError> {
    let mut seen: FxHashMap<String, &str> = FxHashMap::default();
    for name in names {
        let identifier = get_name("", name, NamingConvention::UnderscoreUpperCase);
        if let Some(first) = seen.insert(identifier, name) {
            return Err(BuildError::validation(format!(
                "{} names '{}' and '{}' map to the same identifier",
                kind, first, name
            ))
            .for_entity(name));
        }
    }
    Ok(())
}

pub fn used_in_configuration(used_in: Option<&[String]>, configuration: &str) -> bool {
    match used_in {
        None => true,
        Some(names) => names.iter().any(|n| n == configuration),
    }
}

#[cfg(test)]
mod assets_tests {
    use super::*;

    fn project_json(json: &str) -> Project {
        serde_json::from_str(json).expect("test project should deserialize")
    }

    #[test]
    fn indices_are_one_based_and_zero_means_none() {
        let project = project_json(
            r#"{
                "pages": [{
                    "name": "main",
                    "widgets": [
                        { "type": "Text", "style": "big" },
                        { "type": "Text", "style": "small" }
                    ]
                }],
                "styles": [
                    { "name": "big" },
                    { "name": "small" },
                    { "name": "never used" }
                ]
            }"#,
        );

        let assets = Assets::collect(&project, "Default").unwrap();
        assert_eq!(assets.style_index(Some("big")), 1);
        assert_eq!(assets.style_index(Some("small")), 2);
        assert_eq!(assets.style_index(None), 0);
        assert_eq!(assets.style_index(Some("missing")), 0);

        let unused: Vec<_> = assets
            .take_messages()
            .into_iter()
            .filter(|m| m.text.contains("Unused style"))
            .collect();
        assert_eq!(unused.len(), 1);
    }

    #[test]
    fn inherited_fonts_are_collected() {
        let project = project_json(
            r#"{
                "pages": [{
                    "name": "main",
                    "widgets": [{ "type": "Text", "style": "child" }]
                }],
                "styles": [
                    { "name": "base", "font": "mono" },
                    { "name": "child", "inheritFrom": "base" }
                ],
                "fonts": [{ "name": "mono" }]
            }"#,
        );

        let assets = Assets::collect(&project, "Default").unwrap();
        assert_eq!(assets.font_index(Some("mono")), 1);
        assert_eq!(assets.style_index(Some("base")), 2);
    }

    #[test]
    fn colliding_identifiers_are_rejected() {
        let project = project_json(
            r#"{
                "pages": [
                    { "name": "main page" },
                    { "name": "main-page" }
                ]
            }"#,
        );

        let err = match Assets::collect(&project, "Default") {
            Ok(_) => panic!("collision should fail the collect"),
            Err(err) => err,
        };
        assert_eq!(err.kind, crate::diagnostics::ErrorKind::Validation);
    }

    #[test]
    fn master_projects_bind_through_name_tables() {
        let project = project_json(
            r#"{
                "settings": { "general": { "masterProject": "parent.gui-project" } },
                "pages": [{
                    "name": "main",
                    "widgets": [
                        { "type": "DisplayData", "data": "current", "style": "child" },
                        { "type": "Button", "text": "go", "action": "confirm" }
                    ]
                }],
                "styles": [
                    { "name": "base", "id": 7 },
                    { "name": "child", "inheritFrom": "base" }
                ],
                "variables": [
                    { "name": "voltage" },
                    { "name": "current" }
                ],
                "actions": [{ "name": "confirm" }]
            }"#,
        );

        let assets = Assets::collect(&project, "Default").unwrap();

        // the name tables list every declaration in document order,
        // referenced or not
        assert_eq!(assets.variables.len(), 2);
        assert_eq!(assets.variables[0].name, "voltage");
        assert_eq!(assets.actions.len(), 1);

        // negated indices bind through the name tables at load time
        assert_eq!(assets.variable_index(Some("current")), (-2i16) as u16);
        assert_eq!(assets.action_index(Some("confirm")), (-1i16) as u16);

        // styles live in the parent firmware, referenced by stable id,
        // resolved through the inherit chain when needed
        assert!(assets.styles.is_empty());
        assert_eq!(assets.style_index(Some("child")), 7);
    }

    #[test]
    fn pages_filtered_by_configuration() {
        let project = project_json(
            r#"{
                "pages": [
                    { "name": "everywhere" },
                    { "name": "stm32 only", "usedIn": ["stm32"] }
                ]
            }"#,
        );

        let assets = Assets::collect(&project, "simulator").unwrap();
        assert_eq!(assets.pages.len(), 1);

        let assets = Assets::collect(&project, "stm32").unwrap();
        assert_eq!(assets.pages.len(), 2);
        assert_eq!(assets.page_index("stm32 only"), 2);
    }
}
