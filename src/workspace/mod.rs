//! Per-job scratch directories
//!
//! A [`JobWorkspace`] owns one uniquely named directory under the temp root.
//! All files of a job live inside it and are removed with it, either through
//! [`JobWorkspace::cleanup`] or, on any other exit path, when it is dropped.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::model::JobPaths;
use crate::error::CircleResult;

/// Name prefix of every job directory
pub const JOB_DIR_PREFIX: &str = "circle-job-";

const INPUT_STEM: &str = "input";
const DEFAULT_INPUT_EXT: &str = "mp4";
const INTERMEDIATE_NAME: &str = "square.mp4";
const MASK_NAME: &str = "mask.png";
const OUTPUT_NAME: &str = "circle.mp4";

/// Scoped temporary directory of one job
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
    paths: JobPaths,
}

impl JobWorkspace {
    /// Create a fresh job directory under `root`, creating `root` if needed.
    ///
    /// `input_ext` names the extension of the downloaded source; anything
    /// that is not short and alphanumeric falls back to `mp4`.
    pub fn create(root: &Path, input_ext: Option<&str>) -> CircleResult<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(JOB_DIR_PREFIX)
            .tempdir_in(root)?;

        let ext = input_ext
            .filter(|ext| !ext.is_empty() && ext.len() <= 8)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or(DEFAULT_INPUT_EXT);
        let base = dir.path();
        let paths = JobPaths {
            input: base.join(format!("{}.{}", INPUT_STEM, ext)),
            intermediate: base.join(INTERMEDIATE_NAME),
            mask: base.join(MASK_NAME),
            output: base.join(OUTPUT_NAME),
        };
        debug!("Created job workspace {}", base.display());
        Ok(Self { dir, paths })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    /// Remove the directory now; failures are logged, never returned
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed job workspace {}", path.display()),
            Err(e) => warn!("Failed to remove job workspace {}: {}", path.display(), e),
        }
    }
}

/// Delete leftover job directories under `root` older than `max_age`.
///
/// Returns the number of directories removed. Entries that are not job
/// directories are left alone.
pub fn sweep_stale(root: &Path, max_age: Duration) -> usize {
    if !root.is_dir() {
        return 0;
    }
    let now = SystemTime::now();
    let stale: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(JOB_DIR_PREFIX))
        })
        .filter(|entry| {
            entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age >= max_age)
        })
        .map(|entry| entry.into_path())
        .collect();

    let mut removed = 0;
    for dir in stale {
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove stale workspace {}: {}", dir.display(), e),
        }
    }
    if removed > 0 {
        info!("Removed {} stale job workspace(s) from {}", removed, root.display());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_role_paths_live_inside_workspace() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), Some("mov")).unwrap();
        let paths = ws.paths();

        assert!(ws.path().starts_with(root.path()));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(JOB_DIR_PREFIX));
        for path in [&paths.input, &paths.intermediate, &paths.mask, &paths.output] {
            assert_eq!(path.parent().unwrap(), ws.path());
        }
        assert_eq!(paths.input.file_name().unwrap(), "input.mov");
        assert_eq!(paths.output.file_name().unwrap(), "circle.mp4");
    }

    #[test]
    fn test_suspicious_extension_falls_back() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), Some("../x")).unwrap();
        assert_eq!(ws.paths().input.file_name().unwrap(), "input.mp4");
        let ws = JobWorkspace::create(root.path(), None).unwrap();
        assert_eq!(ws.paths().input.file_name().unwrap(), "input.mp4");
    }

    #[test]
    fn test_workspaces_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = JobWorkspace::create(root.path(), None).unwrap();
        let b = JobWorkspace::create(root.path(), None).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_cleanup_removes_files() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), None).unwrap();
        fs::write(&ws.paths().input, b"source").unwrap();
        fs::write(&ws.paths().output, b"circle").unwrap();
        let dir = ws.path().to_path_buf();

        ws.cleanup();
        assert!(!dir.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let ws = JobWorkspace::create(root.path(), None).unwrap();
            fs::write(&ws.paths().intermediate, b"square").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_drop_during_unwind_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let ws = JobWorkspace::create(&root_path, None).unwrap();
            fs::write(&ws.paths().input, b"source").unwrap();
            panic!("encode blew up");
        });
        assert!(result.is_err());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_makes_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let ws = JobWorkspace::create(&nested, None).unwrap();
        assert!(ws.path().starts_with(&nested));
    }

    #[test]
    fn test_sweep_removes_only_old_job_dirs() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("circle-job-old")).unwrap();
        fs::write(root.path().join("circle-job-old").join("input.mp4"), b"x").unwrap();
        fs::create_dir(root.path().join("keep-me")).unwrap();
        fs::write(root.path().join("circle-job-file"), b"not a dir").unwrap();

        assert_eq!(sweep_stale(root.path(), Duration::ZERO), 1);
        assert!(!root.path().join("circle-job-old").exists());
        assert!(root.path().join("keep-me").exists());
        assert!(root.path().join("circle-job-file").exists());
    }

    #[test]
    fn test_sweep_spares_fresh_dirs() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::create(root.path(), None).unwrap();
        assert_eq!(sweep_stale(root.path(), Duration::from_secs(3600)), 0);
        assert!(ws.path().exists());
        assert_eq!(sweep_stale(&root.path().join("absent"), Duration::ZERO), 0);
    }
}
