use crate::build::build::{BuildOutput, BuildSession};
use crate::diagnostics::{check_summary, print_messages, BuildMessage};
use crate::file_output::{generate_files, section_names};
use crate::project::{Project, load_project};
use crate::settings::{Config, PROJECT_FILE_EXTENSION};
use colour::{e_red_ln, green_ln_bold, grey_ln, red_ln};
use rustc_hash::FxHashMap;
use std::env;
use std::path::PathBuf;
use std::time::Instant;

enum Command {
    Build(PathBuf),
    Check(PathBuf),
    Help,
}

#[derive(PartialEq, Debug)]
pub enum Flag {
    Configuration(String),
    HideWarnings,
}

pub fn start_cli() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help(false);
        return;
    }

    let command = match get_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            red_ln!("{}", e);
            print_help(true);
            return;
        }
    };

    let flags = get_flags(&args);

    match command {
        Command::Help => {
            print_help(true);
        }

        Command::Build(path) => {
            let start = Instant::now();
            let config = config_from_flags(path, &flags, false);

            match build_project(&config) {
                Ok(messages) => {
                    print_report(&messages, &flags);

                    let duration = start.elapsed();
                    grey_ln!("------------------------------------");
                    print!("\nAssets built in: ");
                    green_ln_bold!("{:?}", duration);
                }
                Err(messages) => {
                    e_red_ln!("Errors while building assets: \n");
                    print_report(&messages, &flags);
                }
            }
        }

        Command::Check(path) => {
            let config = config_from_flags(path, &flags, true);
            match load_project(&config.project_path) {
                Ok(project) => {
                    let configuration = selected_configuration(&project, &config);
                    let messages = crate::build::build::check(&project, &configuration);
                    print_report(&messages, &flags);
                }
                Err(error) => {
                    e_red_ln!("{}", error);
                }
            }
        }
    }
}

fn config_from_flags(project_path: PathBuf, flags: &[Flag], check_only: bool) -> Config {
    let mut config = Config::new(project_path);
    config.check_only = check_only;
    for flag in flags {
        if let Flag::Configuration(name) = flag {
            config.configuration = name.clone();
        }
    }
    config
}

/// Build every needed configuration and write the generated files.
pub fn build_project(config: &Config) -> Result<Vec<BuildMessage>, Vec<BuildMessage>> {
    let project = match load_project(&config.project_path) {
        Ok(project) => project,
        Err(error) => return Err(vec![BuildMessage::from_error(&error)]),
    };

    let selected = selected_configuration(&project, config);
    let names = section_names(&project);

    let mut outputs: FxHashMap<String, BuildOutput> = FxHashMap::default();
    let mut messages = Vec::new();

    for configuration in configurations_to_build(&project, &selected) {
        let mut session = BuildSession::new(&project, &configuration, names.as_deref());
        match session.run() {
            Ok(output) => {
                messages.extend(output.messages.iter().cloned());
                outputs.insert(configuration, output);
            }
            Err(report) => {
                messages.extend(report);
                return Err(messages);
            }
        }
    }

    if config.check_only {
        return Ok(messages);
    }

    match generate_files(&project, &config.project_path, &outputs, &selected) {
        Ok(file_messages) => messages.extend(file_messages),
        Err(error) => {
            messages.push(BuildMessage::from_error(&error));
            return Err(messages);
        }
    }

    Ok(messages)
}

/// Which configurations this build touches. Templates with a
/// `<configuration>` placeholder in their file name need all of them.
fn configurations_to_build(project: &Project, selected: &str) -> Vec<String> {
    let per_configuration = project
        .settings
        .build
        .files
        .iter()
        .any(|f| f.file_name.contains("<configuration>"));

    if per_configuration {
        project
            .settings
            .build
            .configurations
            .iter()
            .map(|c| c.name.clone())
            .collect()
    } else {
        vec![selected.to_string()]
    }
}

fn selected_configuration(project: &Project, config: &Config) -> String {
    if !config.configuration.is_empty() {
        return config.configuration.clone();
    }

    project
        .settings
        .build
        .configurations
        .first()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Default".to_string())
}

fn print_report(messages: &[BuildMessage], flags: &[Flag]) {
    let visible: Vec<BuildMessage> = if flags.contains(&Flag::HideWarnings) {
        messages
            .iter()
            .filter(|m| m.severity != crate::diagnostics::Severity::Warning)
            .cloned()
            .collect()
    } else {
        messages.to_vec()
    };

    print_messages(&visible);
    grey_ln!("{}", check_summary(messages));
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str);

    match command {
        Some("help") => Ok(Command::Help),

        Some("build") => match args.get(1).map(String::as_str) {
            Some(path) if !path.starts_with("--") => Ok(Command::Build(PathBuf::from(path))),
            _ => Err(format!(
                "build needs a path to a .{} file",
                PROJECT_FILE_EXTENSION
            )),
        },

        Some("check") => match args.get(1).map(String::as_str) {
            Some(path) if !path.starts_with("--") => Ok(Command::Check(PathBuf::from(path))),
            _ => Err(format!(
                "check needs a path to a .{} file",
                PROJECT_FILE_EXTENSION
            )),
        },

        Some(other) => Err(format!("Invalid command: {} is not a command", other)),
        None => Ok(Command::Help),
    }
}

fn get_flags(args: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();

    for arg in args {
        if let Some(name) = arg.strip_prefix("--config=") {
            flags.push(Flag::Configuration(name.to_string()));
        } else if arg == "--hide-warnings" {
            flags.push(Flag::HideWarnings);
        }
    }

    flags
}

fn print_help(commands_only: bool) {
    if !commands_only {
        grey_ln!("------------------------------------");
        green_ln_bold!("assetc");
        println!("Usage: assetc <command> <args>");
    }
    green_ln_bold!("Commands:");
    println!("  build <path>   - Builds the asset image and generated files for a project");
    println!("  check <path>   - Validates a project without writing anything");
    println!("  help           - Shows this message");
    println!();
    green_ln_bold!("Flags:");
    println!("  --config=<name>   - Build configuration to use (defaults to the first one)");
    println!("  --hide-warnings   - Only print errors and info messages");
}
