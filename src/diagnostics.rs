use colour::{e_red_ln, grey_ln, yellow_ln};
use std::fmt;
use std::path::Path;

/// Everything that can stop a build section from producing output.
///
/// The orchestrator converts these into [`BuildMessage`]s so the caller
/// (editor output panel, CLI) sees one message tree instead of a panic.
#[derive(Debug)]
pub struct BuildError {
    pub msg: String,

    pub kind: ErrorKind,

    // Name of the document entity this error points at, when there is one.
    // Used to locate the offending node in the editor.
    pub entity: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    // Bad document content: duplicate identifiers, unresolved offsets
    Validation,

    // An external resource could not be materialized (bitmap raster, font glyphs)
    Resource,

    // The document itself is inconsistent in a way no section can recover from,
    // e.g. a master-project reference that resolves to nothing
    Structural,

    File,
    Compression,
}

impl BuildError {
    pub fn validation(msg: impl Into<String>) -> BuildError {
        BuildError {
            msg: msg.into(),
            kind: ErrorKind::Validation,
            entity: None,
        }
    }

    pub fn resource(msg: impl Into<String>) -> BuildError {
        BuildError {
            msg: msg.into(),
            kind: ErrorKind::Resource,
            entity: None,
        }
    }

    pub fn structural(msg: impl Into<String>) -> BuildError {
        BuildError {
            msg: msg.into(),
            kind: ErrorKind::Structural,
            entity: None,
        }
    }

    pub fn file_error(path: &Path, msg: impl Into<String>) -> BuildError {
        BuildError {
            msg: format!("{}: {}", path.display(), msg.into()),
            kind: ErrorKind::File,
            entity: None,
        }
    }

    pub fn compression_unavailable() -> BuildError {
        BuildError {
            msg: "compression backend unavailable (built without the 'lz4' feature)"
                .to_string(),
            kind: ErrorKind::Compression,
            entity: None,
        }
    }

    pub fn for_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "{} ({})", self.msg, entity),
            None => write!(f, "{}", self.msg),
        }
    }
}

pub fn error_kind_to_str(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "Validation Error",
        ErrorKind::Resource => "Resource Error",
        ErrorKind::Structural => "Structural Error",
        ErrorKind::File => "File Error",
        ErrorKind::Compression => "Compression Error",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry in the build report. Children carry per-entity detail under a
/// section-level summary, which is how the output panel nests diagnostics.
#[derive(Clone, Debug)]
pub struct BuildMessage {
    pub severity: Severity,
    pub text: String,
    pub children: Vec<BuildMessage>,
}

impl BuildMessage {
    pub fn info(text: impl Into<String>) -> BuildMessage {
        BuildMessage {
            severity: Severity::Info,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn warning(text: impl Into<String>) -> BuildMessage {
        BuildMessage {
            severity: Severity::Warning,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn error(text: impl Into<String>) -> BuildMessage {
        BuildMessage {
            severity: Severity::Error,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<BuildMessage>) -> Self {
        self.children = children;
        self
    }

    pub fn from_error(error: &BuildError) -> BuildMessage {
        BuildMessage::error(format!(
            "{}: {}",
            error_kind_to_str(error.kind),
            error
        ))
    }
}

pub fn print_messages(messages: &[BuildMessage]) {
    print_messages_indented(messages, 0);
}

fn print_messages_indented(messages: &[BuildMessage], depth: usize) {
    for message in messages {
        let indent = "    ".repeat(depth);
        match message.severity {
            Severity::Info => grey_ln!("{}{}", indent, message.text),
            Severity::Warning => yellow_ln!("{}WARNING: {}", indent, message.text),
            Severity::Error => e_red_ln!("{}ERROR: {}", indent, message.text),
        }
        print_messages_indented(&message.children, depth + 1);
    }
}

fn count_severity(messages: &[BuildMessage], severity: Severity) -> usize {
    messages
        .iter()
        .map(|m| {
            let own = usize::from(m.severity == severity);
            own + count_severity(&m.children, severity)
        })
        .sum()
}

/// One-line summary printed after every check, in the
/// "N errors and M warnings detected" form the output panel expects.
pub fn check_summary(messages: &[BuildMessage]) -> String {
    let errors = count_severity(messages, Severity::Error);
    let warnings = count_severity(messages, Severity::Warning);

    let error_part = match errors {
        0 => "No error".to_string(),
        1 => "1 error".to_string(),
        n => format!("{} errors", n),
    };

    let warning_part = match warnings {
        0 => "no warning".to_string(),
        1 => "1 warning".to_string(),
        n => format!("{} warnings", n),
    };

    format!("{} and {} detected", error_part, warning_part)
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    #[test]
    fn summary_counts_nested_messages() {
        let messages = vec![
            BuildMessage::error("section failed").with_children(vec![
                BuildMessage::error("bad style"),
                BuildMessage::warning("unused font"),
            ]),
            BuildMessage::info("Uncompressed size: 120"),
        ];

        assert_eq!(check_summary(&messages), "2 errors and 1 warning detected");
    }

    #[test]
    fn summary_with_clean_report() {
        assert_eq!(check_summary(&[]), "No error and no warning detected");
    }
}
