//! `config` subcommand: show current configuration and file path.

use std::path::Path;

use super::{Config, ConfigOutput, Result, kv, kv_indent, kv_width, led};

/// Shown in place of a configured broker password.
const REDACTED: &str = "********";

/// Copy of `config` that is safe to print.
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if !shown.broker.password.is_empty() {
        shown.broker.password = REDACTED.into();
    }
    shown
}

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let errors: Vec<String> = match config.validate() {
        Ok(()) => vec![],
        Err(errs) => errs.iter().map(|e| e.to_string()).collect(),
    };

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: redacted(&config),
            errors,
        };
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| neoring_lib::NeoringError::Config(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "host:",
            "client_id:",
            "get_color:",
            "set_color:",
            "read_timeout_ms:",
            "post_enqueue_yield_ms:",
            "max_connect_attempts:",
            "initial_color:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Broker:");
    let b = &config.broker;
    kv_indent("host:", format_args!("{}:{}", b.host, b.port), w);
    kv_indent("client_id:", &b.client_id, w);
    if !b.username.is_empty() {
        kv_indent("username:", &b.username, w);
    }
    println!();

    println!("Topics:");
    kv_indent("get_color:", &config.topics.get_color, w);
    kv_indent("set_color:", &config.topics.set_color, w);
    kv_indent("status:", &config.topics.status, w);
    println!();

    println!("Timing (ms):");
    let t = &config.timing;
    kv_indent("read_timeout_ms:", t.read_timeout_ms, w);
    kv_indent("post_enqueue_yield_ms:", t.post_enqueue_yield_ms, w);
    kv_indent("fast_interval_ms:", t.fast_interval_ms, w);
    kv_indent("slow_interval_ms:", t.slow_interval_ms, w);
    kv_indent("retry_backoff_ms:", t.retry_backoff_ms, w);
    kv_indent("settle_ms:", t.settle_ms, w);
    kv_indent("max_connect_attempts:", t.max_connect_attempts, w);
    println!();

    println!("Ring:");
    kv_indent("pixel_count:", config.ring.pixel_count, w);
    let color_display = match led::parse_color(&config.ring.initial_color) {
        Ok(c) => format!("{} -> {}", config.ring.initial_color, led::format_color(c)),
        Err(_) => format!("{} (invalid)", config.ring.initial_color),
    };
    kv_indent("initial_color:", &color_display, w);

    if !errors.is_empty() {
        println!();
        println!("Problems:");
        for e in &errors {
            println!("  {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_config_with_missing_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.toml");
        assert!(cmd_config(false, Some(&path)).is_ok());
        assert!(cmd_config(true, Some(&path)).is_ok());
    }

    #[test]
    fn redacted_hides_password_only() {
        let mut c = Config::default();
        c.broker.username = "ring".into();
        c.broker.password = "hunter2".into();
        let shown = redacted(&c);
        assert_eq!(shown.broker.password, REDACTED);
        assert_eq!(shown.broker.username, "ring");
        assert_eq!(c.broker.password, "hunter2");
    }

    #[test]
    fn redacted_leaves_empty_password_empty() {
        assert_eq!(redacted(&Config::default()).broker.password, "");
    }

    #[test]
    fn cmd_config_with_invalid_values_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[timing]\nmax_connect_attempts = 0\n").unwrap();
        assert!(cmd_config(false, Some(&path)).is_ok());
    }
}
