//! Progress indicators
//!
//! Provides progress bars for multi-file operations.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar for file processing
///
/// Returns a hidden bar when `visible` is false (quiet or JSON output).
pub fn file_progress(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({eta}) {msg}")
        .map(|s| s.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with a success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with an error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_progress_hidden() {
        let pb = file_progress(10, false);
        assert!(pb.is_hidden());
        pb.inc(5);
        assert_eq!(pb.position(), 5);
        finish_success(&pb, "done");
    }

    #[test]
    fn test_file_progress_visible() {
        let pb = file_progress(3, true);
        assert_eq!(pb.length(), Some(3));
        pb.inc(3);
        finish_error(&pb, "failed");
        assert!(pb.is_finished());
    }
}
