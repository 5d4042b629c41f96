//! Scoped workload directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A workload directory that starts empty and is removed when dropped.
///
/// Every run gets a reproducible baseline regardless of what the previous
/// run left behind, and teardown happens on success, failure and timeout
/// alike.
#[derive(Debug)]
pub struct WorkloadDir {
    path: PathBuf,
}

impl WorkloadDir {
    /// Wipe any leftover state at `path` and create it fresh.
    pub fn prepare(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkloadDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to tear down workload directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_wipes_and_drop_removes() {
        let root = tempfile::tempdir().unwrap();
        let db = root.path().join("db");
        fs::create_dir_all(&db).unwrap();
        fs::write(db.join("LOG"), "stale").unwrap();

        {
            let dir = WorkloadDir::prepare(&db).unwrap();
            assert!(dir.path().exists());
            assert!(!dir.path().join("LOG").exists());
            fs::write(dir.path().join("000001.sst"), "data").unwrap();
        }
        assert!(!db.exists());
    }
}
