// Locates JUnit XML report files; listing only, no parsing
use anyhow::{Context, Result};
use gradekit_common::config::REPORT_EXTENSION;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// List report file names directly inside `dir`.
///
/// A missing directory yields an empty list. Subdirectories are not
/// searched. Names are sorted so repeated scans of an unchanged directory
/// come back in the same order.
pub async fn scan_reports(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Report directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to list {}", dir.display()));
        }
    };

    let suffix = format!(".{}", REPORT_EXTENSION);
    let mut files = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(&suffix) {
            continue;
        }
        // Follows symlinks, so a linked report still counts
        let is_file = tokio::fs::metadata(entry.path())
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(name);
        }
    }

    files.sort();
    debug!(dir = %dir.display(), count = files.len(), "Scanned report directory");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = scan_reports(&dir.path().join("target/surefire-reports"))
            .await
            .unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_only_xml_files_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("TEST-b.xml"), "<testsuite/>").unwrap();
        fs::write(dir.path().join("TEST-a.xml"), "<testsuite/>").unwrap();
        fs::write(dir.path().join("b.txt"), "summary").unwrap();
        fs::write(dir.path().join("a.xml.bak"), "old").unwrap();

        let files = scan_reports(dir.path()).await.unwrap();
        assert_eq!(files, vec!["TEST-a.xml".to_string(), "TEST-b.xml".to_string()]);
    }

    #[tokio::test]
    async fn test_subdirectories_are_not_searched() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested.xml")).unwrap();
        fs::create_dir(dir.path().join("old")).unwrap();
        fs::write(dir.path().join("old/TEST-x.xml"), "<testsuite/>").unwrap();

        let files = scan_reports(dir.path()).await.unwrap();
        assert!(files.is_empty());
    }
}
