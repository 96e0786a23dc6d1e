//! SCPI command table generation.
//!
//! The only builder with no binary output. It walks subsystems and their
//! commands and emits a preprocessor command table plus one function name
//! per command for the firmware to implement.

use crate::build::assets::Assets;
use crate::build::helper::TAB;
use crate::diagnostics::BuildError;

/// Derive the handler function name from a command's SCPI syntax.
///
/// `"MEAS:VOLT?"` becomes `scpi_cmd_measVolt_Q`: trailing `?` maps to a
/// `_Q` suffix, numeric placeholders like `<n>` map to `#`, optional
/// brackets drop, a leading `*` becomes a `core` segment, and the colon
/// separated segments camel-case together.
pub fn command_function_name(syntax: &str) -> String {
    let (body, is_query) = match syntax.strip_suffix('?') {
        Some(body) => (body, true),
        None => (syntax, false),
    };

    let mut cleaned = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '[' | ']' => {}
            '<' => {
                // placeholder like <n>, collapses to a number marker
                while let Some(c) = chars.next() {
                    if c == '>' {
                        break;
                    }
                }
                cleaned.push('#');
            }
            '*' => cleaned.push_str("core:"),
            _ => cleaned.push(ch),
        }
    }

    let mut name = String::from("scpi_cmd_");
    for (i, segment) in cleaned.split(':').filter(|s| !s.is_empty()).enumerate() {
        let segment = segment.replace('#', "");
        let lower = segment.to_ascii_lowercase();
        if i == 0 {
            name.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                name.push(first.to_ascii_uppercase());
                name.push_str(chars.as_str());
            }
        }
    }

    if is_query {
        name.push_str("_Q");
    }
    name
}

/// `#define SCPI_COMMANDS` block, one `SCPI_COMMAND(syntax, handler)`
/// entry per command, in document order.
pub fn scpi_commands_decl(assets: &Assets) -> String {
    let Some(scpi) = assets.project.scpi.as_ref() else {
        return String::new();
    };

    let mut lines = vec!["#define SCPI_COMMANDS \\".to_string()];
    for subsystem in &scpi.subsystems {
        for command in &subsystem.commands {
            lines.push(format!(
                "{}SCPI_COMMAND(\"{}\", {}) \\",
                TAB,
                command.name,
                command_function_name(&command.name)
            ));
        }
    }

    let mut text = lines.join("\n");
    // the last entry must not continue the macro
    if text.ends_with(" \\") {
        text.truncate(text.len() - 2);
    }
    text
}

/// Duplicate handler names mean two commands would collide in C.
pub fn check_scpi(assets: &Assets) -> Result<(), BuildError> {
    let Some(scpi) = assets.project.scpi.as_ref() else {
        return Ok(());
    };

    let mut seen: Vec<(String, &str)> = Vec::new();
    for subsystem in &scpi.subsystems {
        for command in &subsystem.commands {
            let name = command_function_name(&command.name);
            if let Some((_, first)) = seen.iter().find(|(n, _)| *n == name) {
                return Err(BuildError::validation(format!(
                    "commands '{}' and '{}' map to the same handler {}",
                    first, command.name, name
                ))
                .for_entity(&command.name));
            }
            seen.push((name, &command.name));
        }
    }
    Ok(())
}
