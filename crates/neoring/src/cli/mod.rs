//! CLI subcommands: run the runtime, inspect config, check payloads.

mod check;
mod config_cmd;
mod run;

use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use neoring_lib::config::Config;
pub(super) use neoring_lib::error::Result;
pub(super) use neoring_lib::led;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Load the config from `custom_path`, or from the platform default.
///
/// Parse problems are logged and fall back to defaults.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    match custom_path {
        Some(path) => {
            let (config, warnings) = Config::load_from(path);
            for w in &warnings {
                log::warn!("{w}");
            }
            config
        }
        None => Config::load(),
    }
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub errors: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct CheckOutput {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub hex: String,
    pub action: &'static str,
    pub time: u16,
    pub length: usize,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the ring runtime, reading `<topic> <payload>` lines from stdin
    Run {
        /// Refuse every broker connect (exercises the fail-stop path)
        #[arg(long)]
        offline: bool,
    },

    /// Show current configuration and file path
    Config,

    /// Parse a set-color payload and show what it would do
    Check {
        /// JSON payload, e.g. '{"r":255,"g":0,"b":0,"time":500}'
        payload: String,
    },
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Run { offline } => {
            if json {
                log::warn!("--json is not supported for `run` (ignored)");
            }
            run::cmd_run(&load_config(config_path), offline)
        }
        Command::Config => config_cmd::cmd_config(json, config_path),
        Command::Check { payload } => check::cmd_check(&payload, json),
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn kv_width_top_only() {
        let w = kv_width(&["Short:", "Longer key:"], &[]);
        // "Longer key:" = 11 + PADDING = 13
        assert_eq!(w, 13);
    }

    #[test]
    fn kv_width_indent_drives_width() {
        let w = kv_width(&["A:"], &["read_timeout_ms:"]);
        // 16 + PADDING + 2 = 20
        assert_eq!(w, 20);
    }

    #[test]
    fn values_align_across_levels() {
        let w = kv_width(&["Top:"], &["Indent:"]);
        let top = format_kv("Top:", "V", w);
        let indent = format!("  {:<width$}{}", "Indent:", "V", width = w - 2);
        assert_eq!(top.find('V'), indent.find('V'));
    }

    #[test]
    fn format_kv_exact_width() {
        assert_eq!(format_kv("ExactWidth:", "val", 10), "ExactWidth:val");
    }

    #[test]
    fn kv_width_empty_both() {
        assert_eq!(kv_width(&[], &[]), 0);
    }
}

#[cfg(test)]
mod json_output_tests {
    use super::*;

    #[test]
    fn config_output_complete() {
        let output = ConfigOutput {
            config_file: Some("/home/user/.config/neoring/config.toml".into()),
            config_file_exists: true,
            settings: Config::default(),
            errors: vec![],
        };
        let json = serde_json::to_string_pretty(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(parsed["config_file"].is_string());
        assert_eq!(parsed["config_file_exists"], true);
        assert_eq!(parsed["settings"]["topics"]["status"], "neoring/status");
        assert_eq!(parsed["settings"]["timing"]["max_connect_attempts"], 3);
        assert!(parsed["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn config_output_missing_path_is_null() {
        let output = ConfigOutput {
            config_file: None,
            config_file_exists: false,
            settings: Config::default(),
            errors: vec![],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed["config_file"].is_null());
    }

    #[test]
    fn check_output_has_expected_fields() {
        let output = CheckOutput {
            r: 1,
            g: 2,
            b: 3,
            hex: "#010203".into(),
            action: "fade",
            time: 40,
            length: 30,
        };
        let json = serde_json::to_value(&output).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 7, "CheckOutput should have 7 fields");
        assert_eq!(json["action"], "fade");
    }
}

#[cfg(test)]
mod load_config_tests {
    use super::*;

    #[test]
    fn custom_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ring.toml");
        std::fs::write(&path, "[ring]\npixel_count = 3\n").unwrap();
        assert_eq!(load_config(Some(&path)).ring.pixel_count, 3);
    }

    #[test]
    fn missing_custom_path_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml")));
        assert_eq!(config, Config::default());
    }
}
