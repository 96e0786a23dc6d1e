use std::path::PathBuf;

pub const PROJECT_FILE_EXTENSION: &str = "gui-project";

// Resource image header. The firmware loader checks the tag and version
// before decompressing anything, so these must match the loader exactly.
pub const IMAGE_HEADER_TAG: [u8; 4] = *b"~gui";
pub const IMAGE_VERSION_MAJOR: u8 = 3;
pub const IMAGE_VERSION_MINOR: u8 = 0;

// Extension for the raw resource image written by master-project builds
pub const RESOURCE_FILE_EXTENSION: &str = "res";

// A rough guess at how many assets a typical project carries per kind,
// just to avoid the first few reallocations during collection.
pub const ASSETS_CAPACITY: usize = 32;

#[derive(Clone, Debug)]
pub struct Config {
    pub project_path: PathBuf,

    // Name of the build configuration to use.
    // When empty, the first configuration in the project is used.
    pub configuration: String,

    // Run collection and validation only, write nothing
    pub check_only: bool,
}

impl Config {
    pub fn new(project_path: PathBuf) -> Self {
        Config {
            project_path,
            configuration: String::new(),
            check_only: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project_path: PathBuf::from("project.gui-project"),
            configuration: String::new(),
            check_only: false,
        }
    }
}
