//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use owo_colors::OwoColorize;
use serde::Serialize;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Colored text for people
    #[default]
    Human,
    /// One pretty-printed JSON document on stdout
    Json,
    /// Results only, no status lines
    Quiet,
}

impl OutputMode {
    /// Select the mode from the global flags; `--json` wins over `--quiet`
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        }
    }

    /// Whether status lines and progress bars are shown
    pub fn is_interactive(&self) -> bool {
        *self == OutputMode::Human
    }

    /// Print `value` as JSON in JSON mode, otherwise run `human`
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> serde_json::Result<()> {
        match self {
            OutputMode::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            _ => human(),
        }
        Ok(())
    }
}

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print an indented `label: value` line
    pub fn field(label: &str, value: &str) {
        println!("  {} {}", format!("{}:", label).dimmed(), value);
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_output_mode_from_flags() {
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Human);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Json);
        assert_eq!(OutputMode::from_flags(false, true), OutputMode::Quiet);
        assert!(!OutputMode::Quiet.is_interactive());
    }

    #[test]
    fn test_emit_runs_human_outside_json() {
        let mut called = false;
        OutputMode::Human
            .emit(&serde_json::json!({}), || called = true)
            .unwrap();
        assert!(called);

        let mut called = false;
        OutputMode::Json
            .emit(&serde_json::json!({"a": 1}), || called = true)
            .unwrap();
        assert!(!called);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs_f32(5.5)), "5.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "contact", "contacts"), "1 contact");
        assert_eq!(format_count(5, "contact", "contacts"), "5 contacts");
    }
}
