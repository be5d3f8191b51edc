use std::path::PathBuf;

use {anyhow::Result, courier_config::Severity};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn check(path: Option<&PathBuf>, show: bool) -> Result<()> {
    let path = path.cloned().or_else(courier_config::find_config_file);
    let config = match &path {
        Some(path) => {
            eprintln!("Checking {}\n", path.display());
            courier_config::load_config(path)?
        },
        None => {
            eprintln!("No config file found; checking defaults.\n");
            courier_config::CourierConfig::default()
        },
    };

    let result = courier_config::validate(&config);
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let count = |severity| {
        result
            .diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if show {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    if result.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}
