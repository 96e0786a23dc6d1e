//! Build orchestration.
//!
//! One `BuildSession` per build: collect assets, render the requested
//! text sections, serialize and compress the binary image, and return
//! everything keyed by section name together with the message tree.
//! A failed build returns the full message list with the error appended,
//! so reference warnings gathered before the failure still reach the
//! report. No sections are returned on failure.

use crate::build::assets::Assets;
use crate::build::bitmaps::{bitmaps_data, bitmaps_enum};
use crate::build::compress::{CompressionLevel, compress};
use crate::build::data_buffer::DataBuffer;
use crate::build::fonts::{fonts_data, fonts_enum};
use crate::build::helper::dump_data;
use crate::build::scpi::{check_scpi, scpi_commands_decl};
use crate::build::styles::{styles_data, styles_enum};
use crate::build::themes::{colors_enum, themes_data, themes_enum};
use crate::build::variables::{action_names_data, variable_names_data};
use crate::build::widgets::{document_data, pages_enum};
use crate::diagnostics::{BuildError, BuildMessage};
use crate::project::{Project, StringEncoding};
use crate::settings::{IMAGE_HEADER_TAG, IMAGE_VERSION_MAJOR, IMAGE_VERSION_MINOR};
use crate::timer_log;
use rayon::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionContent {
    Text(String),
    Binary(Vec<u8>),
}

pub struct BuildOutput {
    pub sections: BTreeMap<String, SectionContent>,
    pub messages: Vec<BuildMessage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildPhase {
    Collecting,
    Building,
    Finalizing,
    Done,
}

pub struct BuildSession<'a> {
    project: &'a Project,
    configuration: &'a str,

    // None builds every section, Some builds only the named ones
    section_names: Option<&'a [String]>,

    pub phase: BuildPhase,
}

const ENUM_SECTIONS: [(&str, fn(&Assets) -> String); 7] = [
    ("GUI_PAGES_ENUM", pages_enum),
    ("GUI_STYLES_ENUM", styles_enum),
    ("GUI_FONTS_ENUM", fonts_enum),
    ("GUI_BITMAPS_ENUM", bitmaps_enum),
    ("GUI_THEMES_ENUM", themes_enum),
    ("GUI_COLORS_ENUM", colors_enum),
    ("SCPI_COMMANDS_DECL", scpi_commands_decl),
];

const ASSET_SECTIONS: [&str; 5] = [
    "GUI_ASSETS_DECL",
    "GUI_ASSETS_DECL_COMPRESSED",
    "GUI_ASSETS_DEF",
    "GUI_ASSETS_DEF_COMPRESSED",
    "GUI_ASSETS_DATA",
];

impl<'a> BuildSession<'a> {
    pub fn new(
        project: &'a Project,
        configuration: &'a str,
        section_names: Option<&'a [String]>,
    ) -> BuildSession<'a> {
        BuildSession {
            project,
            configuration,
            section_names,
            phase: BuildPhase::Collecting,
        }
    }

    fn wants(&self, section: &str) -> bool {
        match self.section_names {
            None => true,
            Some(names) => names.iter().any(|n| n == section),
        }
    }

    pub fn run(&mut self) -> Result<BuildOutput, Vec<BuildMessage>> {
        let start = std::time::Instant::now();

        let assets = match Assets::collect(self.project, self.configuration) {
            Ok(assets) => assets,
            Err(error) => return Err(vec![BuildMessage::from_error(&error)]),
        };
        if let Err(error) = check_scpi(&assets) {
            return Err(Self::failure_report(&assets, error));
        }
        timer_log!(start, "asset collection");

        self.phase = BuildPhase::Building;

        let mut sections = BTreeMap::new();

        let enum_sections: Vec<(&str, SectionContent)> = ENUM_SECTIONS
            .par_iter()
            .filter(|(name, _)| self.wants(name))
            .map(|(name, builder)| (*name, SectionContent::Text(builder(&assets))))
            .collect();
        for (name, content) in enum_sections {
            crate::section_log!("section {} built", name);
            sections.insert(name.to_string(), content);
        }

        if ASSET_SECTIONS.iter().any(|name| self.wants(name)) {
            let image = match build_image(&assets, self.string_encoding()) {
                Ok(image) => image,
                Err(error) => return Err(Self::failure_report(&assets, error)),
            };
            timer_log!(start, "image serialization");

            let result = match compress(&image, CompressionLevel::Fast) {
                Ok(result) => result,
                Err(error) => return Err(Self::failure_report(&assets, error)),
            };
            let mut messages = assets.take_messages();
            messages.push(BuildMessage::info(format!(
                "Uncompressed size: {}",
                result.uncompressed_size
            )));
            messages.push(BuildMessage::info(format!(
                "Compressed size: {}",
                result.compressed.len() - 4
            )));

            let data = image_with_header(self.project, result.compressed);

            if self.wants("GUI_ASSETS_DECL") {
                sections.insert(
                    "GUI_ASSETS_DECL".to_string(),
                    SectionContent::Text(assets_decl(image.len())),
                );
            }
            if self.wants("GUI_ASSETS_DECL_COMPRESSED") {
                sections.insert(
                    "GUI_ASSETS_DECL_COMPRESSED".to_string(),
                    SectionContent::Text(assets_decl(data.len())),
                );
            }
            if self.wants("GUI_ASSETS_DEF") {
                sections.insert(
                    "GUI_ASSETS_DEF".to_string(),
                    SectionContent::Text(assets_def(&image)),
                );
            }
            if self.wants("GUI_ASSETS_DEF_COMPRESSED") {
                sections.insert(
                    "GUI_ASSETS_DEF_COMPRESSED".to_string(),
                    SectionContent::Text(assets_def(&data)),
                );
            }
            if self.wants("GUI_ASSETS_DATA") {
                sections.insert(
                    "GUI_ASSETS_DATA".to_string(),
                    SectionContent::Binary(data),
                );
            }

            self.phase = BuildPhase::Done;
            return Ok(BuildOutput { sections, messages });
        }

        self.phase = BuildPhase::Done;
        Ok(BuildOutput {
            sections,
            messages: assets.take_messages(),
        })
    }

    /// Everything collected so far, with the escaping error appended last.
    fn failure_report(assets: &Assets, error: BuildError) -> Vec<BuildMessage> {
        let mut messages = assets.take_messages();
        messages.push(BuildMessage::from_error(&error));
        messages
    }

    fn string_encoding(&self) -> StringEncoding {
        self.project
            .settings
            .build
            .configurations
            .iter()
            .find(|c| c.name == self.configuration)
            .map(|c| c.string_encoding)
            .unwrap_or_default()
    }
}

/// Serialize every region of the binary image. Master project images
/// carry two extra regions with the action and variable name lists.
pub fn build_image(assets: &Assets, encoding: StringEncoding) -> Result<Vec<u8>, BuildError> {
    let master = assets.project.has_master_project();
    let region_count = if master { 7 } else { 5 };

    let mut buffer = DataBuffer::new(encoding);
    buffer.write_regions(region_count, |buffer, i| match i {
        0 => document_data(assets, buffer),
        1 => styles_data(assets, buffer),
        2 => fonts_data(assets, buffer),
        3 => bitmaps_data(assets, buffer),
        4 => themes_data(assets, buffer),
        5 => action_names_data(assets, buffer),
        _ => variable_names_data(assets, buffer),
    })?;
    buffer.finalize()
}

/// Prepend the image header: tag, version, project type, then the
/// compressed payload whose first word is the decompressed size.
fn image_with_header(project: &Project, compressed: Vec<u8>) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + compressed.len());
    data.extend_from_slice(&IMAGE_HEADER_TAG);
    data.push(IMAGE_VERSION_MAJOR);
    data.push(IMAGE_VERSION_MINOR);
    data.extend_from_slice(&project.settings.general.project_type.as_number().to_le_bytes());
    data.extend_from_slice(&compressed);
    data
}

fn assets_decl(size: usize) -> String {
    format!("extern const uint8_t assets[{}];", size)
}

fn assets_def(data: &[u8]) -> String {
    let mut body = String::new();
    dump_data(data, &mut body);
    format!("// ASSETS DEFINITION\nconst uint8_t assets[{}] = {{\n{}}};", data.len(), body)
}

/// Validate without emitting anything: asset collection plus the checks
/// every builder front-loads.
pub fn check(project: &Project, configuration: &str) -> Vec<BuildMessage> {
    let assets = match Assets::collect(project, configuration) {
        Ok(assets) => assets,
        Err(error) => return vec![BuildMessage::from_error(&error)],
    };

    let mut messages = assets.take_messages();
    if let Err(error) = check_scpi(&assets) {
        messages.push(BuildMessage::from_error(&error));
    }
    for bitmap in &assets.bitmaps {
        if let Err(error) = bitmap.raster() {
            messages.push(BuildMessage::from_error(&error));
        }
    }
    messages
}

#[cfg(test)]
mod build_tests {
    use super::*;

    fn project() -> Project {
        serde_json::from_str(
            r##"{
                "pages": [{
                    "name": "main",
                    "width": 480,
                    "height": 272,
                    "widgets": [{ "type": "Text", "text": "hi", "style": "default" }]
                }],
                "styles": [{ "name": "default", "color": "#ffffff" }]
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn all_sections_present_by_default() {
        let project = project();
        let mut session = BuildSession::new(&project, "Default", None);
        let output = session.run().unwrap();

        assert!(output.sections.contains_key("GUI_PAGES_ENUM"));
        assert!(output.sections.contains_key("GUI_STYLES_ENUM"));
        assert!(output.sections.contains_key("GUI_ASSETS_DATA"));
        assert_eq!(session.phase, BuildPhase::Done);

        let sizes: Vec<_> = output
            .messages
            .iter()
            .filter(|m| m.text.starts_with("Uncompressed size:") || m.text.starts_with("Compressed size:"))
            .collect();
        assert_eq!(sizes.len(), 2);
    }

    #[test]
    fn section_filter_skips_the_image() {
        let project = project();
        let names = vec!["GUI_PAGES_ENUM".to_string()];
        let mut session = BuildSession::new(&project, "Default", Some(&names));
        let output = session.run().unwrap();

        assert_eq!(output.sections.len(), 1);
        let SectionContent::Text(text) = &output.sections["GUI_PAGES_ENUM"] else {
            panic!("expected text section");
        };
        assert!(text.contains("PAGE_ID_MAIN = 1"));
    }

    #[test]
    fn image_header_precedes_the_payload() {
        let project = project();
        let mut session = BuildSession::new(&project, "Default", None);
        let output = session.run().unwrap();

        let SectionContent::Binary(data) = &output.sections["GUI_ASSETS_DATA"] else {
            panic!("expected binary section");
        };
        assert_eq!(&data[0..4], b"~gui");
        assert_eq!(data[4], IMAGE_VERSION_MAJOR);
        assert_eq!(data[5], IMAGE_VERSION_MINOR);
        // firmware project type
        assert_eq!(u16::from_le_bytes([data[6], data[7]]), 1);

        let decompressed_size = u32::from_le_bytes(data[8..12].try_into().unwrap());
        assert!(decompressed_size > 0);
    }

    #[test]
    fn failed_builds_keep_their_diagnostics() {
        let project: Project = serde_json::from_str(
            r#"{
                "pages": [{
                    "name": "main",
                    "widgets": [
                        { "type": "Text", "text": "hi", "style": "missing" },
                        { "type": "Bitmap", "bitmap": "logo" }
                    ]
                }],
                "fonts": [{ "name": "spare" }],
                "bitmaps": [
                    { "name": "logo", "width": 4, "height": 4, "bpp": 16, "pixels": [1, 2] }
                ]
            }"#,
        )
        .unwrap();

        let mut session = BuildSession::new(&project, "Default", None);
        let report = match session.run() {
            Ok(_) => panic!("short raster should fail the build"),
            Err(report) => report,
        };

        assert!(report.iter().any(|m| m.text.contains("style not found: missing")));
        assert!(report.iter().any(|m| m.text.contains("Unused font: spare")));
        assert!(report.last().is_some_and(|m| m.text.contains("bitmap raster")));
    }

    #[test]
    fn builds_are_deterministic() {
        let project = project();
        let first = BuildSession::new(&project, "Default", None).run().unwrap();
        let second = BuildSession::new(&project, "Default", None).run().unwrap();
        assert_eq!(first.sections, second.sections);
    }
}
