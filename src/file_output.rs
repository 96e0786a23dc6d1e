//! Writes the generated artifacts to disk.
//!
//! Firmware projects list template files in their build settings; every
//! `//${assetc SECTION}` marker in a template is replaced with the text of
//! that section. Master projects skip templates entirely and write the raw
//! resource image next to the project file.

use crate::build::build::{BuildOutput, SectionContent};
use crate::diagnostics::{BuildError, BuildMessage};
use crate::project::Project;
use crate::settings::RESOURCE_FILE_EXTENSION;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};

const MARKER_START: &str = "//${assetc ";
const MARKER_END: char = '}';

/// Pull every section name out of a template.
pub fn marker_names(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(at) = rest.find(MARKER_START) {
        rest = &rest[at + MARKER_START.len()..];
        if let Some(end) = rest.find(MARKER_END) {
            names.push(rest[..end].to_string());
            rest = &rest[end + 1..];
        } else {
            break;
        }
    }
    names
}

/// Section names a build has to produce for this project. Master projects
/// only need the binary image.
pub fn section_names(project: &Project) -> Option<Vec<String>> {
    if project.has_master_project() {
        return Some(vec!["GUI_ASSETS_DATA".to_string()]);
    }

    if project.settings.build.files.is_empty() {
        // no templates means no way to narrow the build down
        return None;
    }

    let mut names = Vec::new();
    for file in &project.settings.build.files {
        for name in marker_names(&file.template) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Some(names)
}

/// Substitute every marker with its section text.
pub fn render_template(
    template: &str,
    output: &BuildOutput,
    messages: &mut Vec<BuildMessage>,
) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find(MARKER_START) {
        result.push_str(&rest[..at]);
        rest = &rest[at + MARKER_START.len()..];

        let Some(end) = rest.find(MARKER_END) else {
            result.push_str(MARKER_START);
            break;
        };
        let name = &rest[..end];
        rest = &rest[end + 1..];

        match output.sections.get(name) {
            Some(SectionContent::Text(text)) => result.push_str(text),
            Some(SectionContent::Binary(_)) => {
                messages.push(BuildMessage::warning(format!(
                    "section {} is binary and cannot go into a template",
                    name
                )));
            }
            None => {
                messages.push(BuildMessage::warning(format!(
                    "section {} was not built",
                    name
                )));
            }
        }
    }
    result.push_str(rest);
    result
}

/// Write all generated files for one build. `outputs` maps configuration
/// names to their build results.
pub fn generate_files(
    project: &Project,
    project_path: &Path,
    outputs: &FxHashMap<String, BuildOutput>,
    selected_configuration: &str,
) -> Result<Vec<BuildMessage>, BuildError> {
    let destination = destination_folder(project, project_path);
    fs::create_dir_all(&destination)
        .map_err(|e| BuildError::file_error(&destination, format!("cannot create: {e}")))?;

    let mut messages = Vec::new();

    if project.has_master_project() {
        let output = selected_output(outputs, selected_configuration)?;
        let file_name = resource_file_name(project_path);
        let path = destination.join(file_name);
        let Some(SectionContent::Binary(data)) = output.sections.get("GUI_ASSETS_DATA") else {
            return Err(BuildError::structural(
                "master project build produced no binary image",
            ));
        };
        fs::write(&path, data)
            .map_err(|e| BuildError::file_error(&path, format!("cannot write: {e}")))?;
        messages.push(BuildMessage::info(format!(
            "File \"{}\" builded",
            path.display()
        )));
        return Ok(messages);
    }

    for file in &project.settings.build.files {
        if file.file_name.contains("<configuration>") {
            for configuration in &project.settings.build.configurations {
                let Some(output) = outputs.get(configuration.name.as_str()) else {
                    continue;
                };
                let file_name = file.file_name.replace("<configuration>", &configuration.name);
                write_template(&destination.join(file_name), &file.template, output, &mut messages)?;
            }
        } else {
            let output = selected_output(outputs, selected_configuration)?;
            write_template(&destination.join(&file.file_name), &file.template, output, &mut messages)?;
        }
    }

    Ok(messages)
}

fn write_template(
    path: &Path,
    template: &str,
    output: &BuildOutput,
    messages: &mut Vec<BuildMessage>,
) -> Result<(), BuildError> {
    let content = render_template(template, output, messages);
    fs::write(path, content)
        .map_err(|e| BuildError::file_error(path, format!("cannot write: {e}")))?;
    messages.push(BuildMessage::info(format!(
        "File \"{}\" builded",
        path.display()
    )));
    Ok(())
}

fn selected_output<'o>(
    outputs: &'o FxHashMap<String, BuildOutput>,
    selected_configuration: &str,
) -> Result<&'o BuildOutput, BuildError> {
    outputs.get(selected_configuration).ok_or_else(|| {
        BuildError::structural(format!(
            "no build output for configuration '{}'",
            selected_configuration
        ))
    })
}

fn destination_folder(project: &Project, project_path: &Path) -> PathBuf {
    let base = project_path.parent().unwrap_or_else(|| Path::new("."));
    match &project.settings.build.destination_folder {
        Some(folder) => base.join(folder),
        None => base.to_path_buf(),
    }
}

fn resource_file_name(project_path: &Path) -> String {
    let stem = project_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("assets");
    format!("{}.{}", stem, RESOURCE_FILE_EXTENSION)
}

#[cfg(test)]
mod file_output_tests {
    use super::*;
    use std::collections::BTreeMap;

    fn output_with(name: &str, text: &str) -> BuildOutput {
        let mut sections = BTreeMap::new();
        sections.insert(name.to_string(), SectionContent::Text(text.to_string()));
        BuildOutput {
            sections,
            messages: Vec::new(),
        }
    }

    #[test]
    fn markers_are_discovered() {
        let template = "#pragma once\n//${assetc GUI_PAGES_ENUM}\n//${assetc GUI_STYLES_ENUM}\n";
        assert_eq!(marker_names(template), ["GUI_PAGES_ENUM", "GUI_STYLES_ENUM"]);
    }

    #[test]
    fn template_substitution() {
        let output = output_with("GUI_PAGES_ENUM", "enum PagesEnum {\n};");
        let mut messages = Vec::new();
        let rendered = render_template(
            "// header\n//${assetc GUI_PAGES_ENUM}\n// footer\n",
            &output,
            &mut messages,
        );
        assert_eq!(rendered, "// header\nenum PagesEnum {\n};\n// footer\n");
        assert!(messages.is_empty());
    }

    #[test]
    fn missing_section_leaves_a_warning() {
        let output = output_with("GUI_PAGES_ENUM", "x");
        let mut messages = Vec::new();
        let rendered = render_template("//${assetc NOPE}", &output, &mut messages);
        assert_eq!(rendered, "");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn files_are_written_with_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("demo.gui-project");

        let project: Project = serde_json::from_str(
            r#"{
                "settings": {
                    "build": {
                        "files": [{
                            "fileName": "gui.h",
                            "template": "//${assetc GUI_PAGES_ENUM}\n"
                        }]
                    }
                }
            }"#,
        )
        .unwrap();

        let mut outputs = FxHashMap::default();
        outputs.insert(
            "Default".to_string(),
            output_with("GUI_PAGES_ENUM", "enum PagesEnum {\n};"),
        );

        let messages = generate_files(&project, &project_path, &outputs, "Default").unwrap();
        assert!(messages.iter().any(|m| m.text.contains("gui.h")));

        let written = fs::read_to_string(dir.path().join("gui.h")).unwrap();
        assert_eq!(written, "enum PagesEnum {\n};\n");
    }
}
