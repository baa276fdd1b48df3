//! Utility functions for filename normalization, string truncation, and
//! file system checks.

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Normalize a company name into a filesystem-safe output basename.
///
/// Spaces and path separators become underscores; any other character that
/// commonly upsets filesystems is dropped. Two companies whose names
/// normalize to the same basename would overwrite each other's outputs, so
/// the pipeline rejects such collisions before scraping starts.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(safe_basename("Acme Corp"), "Acme_Corp");
/// assert_eq!(safe_basename("A/B Testing, Inc."), "A_B_Testing,_Inc.");
/// ```
pub fn safe_basename(name: &str) -> String {
    name.trim()
        .replace([' ', '/', '\\'], "_")
        .replace(|c: char| matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'), "")
}

/// Truncate a string to `max` characters for tabular previews.
///
/// The master CSV keeps extraction fields reviewable by bounding each cell;
/// anything longer than `max` characters is cut at a char boundary.
pub fn truncate_preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if missing, then performs a write test by creating
/// and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Small sync write probe; simpler error surface than async here.
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_basename_spaces_and_slashes() {
        assert_eq!(safe_basename("Acme Corp"), "Acme_Corp");
        assert_eq!(safe_basename("A/B Testing"), "A_B_Testing");
        assert_eq!(safe_basename("  Edge Co  "), "Edge_Co");
    }

    #[test]
    fn test_safe_basename_drops_reserved_chars() {
        assert_eq!(safe_basename("What? Co: \"Best\""), "What_Co_Best");
    }

    #[test]
    fn test_truncate_preview_bounds_length() {
        let long = "x".repeat(800);
        assert_eq!(truncate_preview(&long, 500).chars().count(), 500);
        assert_eq!(truncate_preview("short", 500), "short");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = format!("{}/a/b", dir.path().display());
        ensure_writable_dir(&nested).await.unwrap();
        assert!(std::path::Path::new(&nested).is_dir());
    }
}
