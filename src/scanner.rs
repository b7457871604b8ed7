use anyhow::{Context, Result};
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Extensions of metadata snapshot files
const SNAPSHOT_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// File scanner for locating metadata snapshots.
///
/// The `FileScanner` recursively walks a directory to find every `.json`, `.yaml` and `.yml`
/// file. It skips `target` and hidden directories (those starting with `.`). When the root is
/// a single file, that file is the whole result.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./storage/api-metadata"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} snapshot files", result.files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a scan.
pub struct ScanResult {
    /// Snapshot files, sorted by path
    pub files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all snapshot files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        let metadata = std::fs::metadata(&self.root_path)
            .with_context(|| format!("Metadata path not found: {}", self.root_path.display()))?;
        if metadata.is_file() {
            return Ok(ScanResult {
                files: vec![self.root_path.clone()],
                warnings: Vec::new(),
            });
        }

        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let is_snapshot = path
                        .extension()
                        .and_then(|s| s.to_str())
                        .is_some_and(|ext| SNAPSHOT_EXTENSIONS.contains(&ext));

                    if path.is_file() && is_snapshot {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        files.sort();
        Ok(ScanResult { files, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file_names(result: &ScanResult) -> Vec<String> {
        result
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_normal_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("routes.yaml"), "routes: []").unwrap();
        fs::write(root.join("types.json"), "{}").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(file_names(&result), vec!["routes.yaml", "types.json"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();

        assert!(result.files.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_nested_directories_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("b/nested/handlers.yml"), "").unwrap();
        fs::write(root.join("a/routes.yaml"), "").unwrap();
        fs::write(root.join("types.json"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        let relative: Vec<PathBuf> = result
            .files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a/routes.yaml"),
                PathBuf::from("b/nested/handlers.yml"),
                PathBuf::from("types.json"),
            ]
        );
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target/cache.json"), "{}").unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/config.yaml"), "").unwrap();
        fs::write(root.join("routes.yaml"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(file_names(&result), vec!["routes.yaml"]);
    }

    #[test]
    fn test_scan_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("snapshot.txt");
        fs::write(&file, "").unwrap();

        let result = FileScanner::new(file.clone()).scan().unwrap();

        assert_eq!(result.files, vec![file]);
    }

    #[test]
    fn test_scan_missing_root() {
        let result = FileScanner::new(PathBuf::from("/nonexistent/metadata")).scan();

        assert!(result.is_err());
        assert!(result
            .err()
            .unwrap()
            .to_string()
            .contains("Metadata path not found"));
    }
}
