pub mod settings;

pub mod cli;
pub mod diagnostics;
pub mod file_output;
pub mod logging;
pub mod project;

pub mod build {
    pub mod assets;
    pub mod bitmaps;
    #[allow(clippy::module_inception)]
    pub mod build;
    pub mod compress;
    pub mod data_buffer;
    pub mod fonts;
    pub mod helper;
    pub mod scpi;
    pub mod styles;
    pub mod themes;
    pub mod variables;
    pub mod widgets;
}

pub use build::build::{BuildOutput, BuildPhase, BuildSession, SectionContent, check};
pub use diagnostics::{BuildError, BuildMessage, ErrorKind, Severity};
pub use project::{Project, load_project};
