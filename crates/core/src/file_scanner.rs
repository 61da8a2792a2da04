//! File scanning utilities
//!
//! Finds vCard files under a directory tree.

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default vCard file extensions
pub const VCARD_EXTENSIONS: &[&str] = &["vcf", "vcard"];

/// File scanner with configurable filters
pub struct FileScanner {
    root: PathBuf,
    extensions: Vec<String>,
    exclude_patterns: Vec<glob::Pattern>,
}

impl FileScanner {
    /// Create a new file scanner rooted at the given path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Build a scanner from the `[scan]` configuration section
    pub fn from_config(root: impl Into<PathBuf>, config: &ScanConfig) -> Result<Self> {
        let extensions: Vec<&str> = config.extensions.iter().map(String::as_str).collect();
        let exclude: Vec<&str> = config.exclude.iter().map(String::as_str).collect();
        FileScanner::new(root).with_extensions(&extensions).exclude(&exclude)
    }

    /// Filter by file extensions, compared case-insensitively (e.g., "vcf")
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|s| s.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Add glob patterns to exclude
    pub fn exclude(mut self, patterns: &[&str]) -> Result<Self> {
        for pattern in patterns {
            let compiled = glob::Pattern::new(pattern).map_err(|e| {
                Error::invalid_config_value("scan.exclude", pattern).with_source(e)
            })?;
            self.exclude_patterns.push(compiled);
        }
        Ok(self)
    }

    /// Scan and return matching files, sorted by path
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(Error::new(
                crate::ErrorCode::DirectoryNotFound,
                format!("Directory not found: {}", self.root.display()),
            ));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            if !self.extensions.is_empty() {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                if !self.extensions.iter().any(|e| *e == ext) {
                    continue;
                }
            }

            if self.should_exclude(path) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    fn should_exclude(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative) || pattern.matches_path(path))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
}

/// Scan for vCard files in a directory
pub fn scan_vcard_files(root: &Path) -> Result<Vec<PathBuf>> {
    FileScanner::new(root).with_extensions(VCARD_EXTENSIONS).scan()
}

/// Get file size in bytes
pub fn file_size(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.vcf"), "BEGIN:VCARD\r\nEND:VCARD\r\n").unwrap();
        fs::write(dir.path().join("B.VCF"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("backup")).unwrap();
        fs::write(dir.path().join("backup").join("old.vcard"), "").unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join(".hidden").join("secret.vcf"), "").unwrap();
        dir
    }

    #[test]
    fn test_file_scanner_with_extensions() {
        let scanner = FileScanner::new("/tmp").with_extensions(&[".VCF", "vcard"]);
        assert_eq!(scanner.extensions, vec!["vcf", "vcard"]);
    }

    #[test]
    fn test_scan_vcard_files() {
        let dir = tree();
        let files = scan_vcard_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["B.VCF", "a.vcf", "old.vcard"]);
    }

    #[test]
    fn test_scan_exclude() {
        let dir = tree();
        let files = FileScanner::new(dir.path())
            .with_extensions(VCARD_EXTENSIONS)
            .exclude(&["backup/**"])
            .unwrap()
            .scan()
            .unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| !p.to_string_lossy().contains("backup")));
    }

    #[test]
    fn test_scan_from_config() {
        let dir = tree();
        let config = ScanConfig {
            extensions: vec!["txt".into()],
            exclude: vec![],
        };
        let files = FileScanner::from_config(dir.path(), &config).unwrap().scan().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(file_size(&files[0]).unwrap(), 0);
    }

    #[test]
    fn test_invalid_pattern_and_missing_root() {
        assert!(FileScanner::new("/tmp").exclude(&["[unclosed"]).is_err());
        let err = scan_vcard_files(Path::new("/nonexistent/dir")).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::DirectoryNotFound);
    }
}
