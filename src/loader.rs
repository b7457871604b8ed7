use crate::error::Error;
use crate::metadata::MetadataSnapshot;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Loader for metadata snapshot files exported by the host application.
///
/// `.json` files are decoded as JSON, everything else as YAML.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::loader::SnapshotLoader;
/// use std::path::Path;
///
/// let loaded = SnapshotLoader::load_file(Path::new("metadata/routes.yaml")).unwrap();
/// println!("Loaded {} routes", loaded.snapshot.routes.len());
/// ```
pub struct SnapshotLoader;

/// A successfully decoded snapshot file
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub path: PathBuf,
    pub snapshot: MetadataSnapshot,
}

impl SnapshotLoader {
    /// Loads a single snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not decode as a snapshot.
    pub fn load_file(path: &Path) -> Result<LoadedSnapshot> {
        debug!("Loading snapshot: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let decoded = if is_json {
            serde_json::from_str::<MetadataSnapshot>(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<MetadataSnapshot>(&content).map_err(|e| e.to_string())
        };

        let snapshot = decoded.map_err(|message| Error::Snapshot {
            file: path.to_path_buf(),
            message,
        })?;

        debug!(
            "Loaded {}: {} routes, {} handlers, {} types",
            path.display(),
            snapshot.routes.len(),
            snapshot.handlers.len(),
            snapshot.types.len()
        );

        Ok(LoadedSnapshot {
            path: path.to_path_buf(),
            snapshot,
        })
    }

    /// Loads multiple snapshot files, continuing even if some fail.
    ///
    /// Failures are logged as warnings and returned in place.
    pub fn load_files(paths: &[PathBuf]) -> Vec<Result<LoadedSnapshot>> {
        debug!("Loading {} snapshot files", paths.len());

        let results: Vec<Result<LoadedSnapshot>> = paths
            .iter()
            .map(|path| {
                Self::load_file(path).inspect_err(|e| {
                    warn!("Failed to load {}: {:#}", path.display(), e);
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Loading complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }

    /// Merge loaded snapshots in order into one
    pub fn merge(loaded: impl IntoIterator<Item = LoadedSnapshot>) -> MetadataSnapshot {
        loaded
            .into_iter()
            .fold(MetadataSnapshot::default(), |mut merged, next| {
                merged.merge(next.snapshot);
                merged
            })
    }
}
