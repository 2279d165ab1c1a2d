// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scoped scratch directories for job attempts

use std::fs;
use std::path::{Path, PathBuf};

/// A per-attempt scratch directory, removed on drop.
///
/// Creation is idempotent per job id, so a redelivered attempt reuses and
/// then cleans the same location.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(root: &Path, job_id: &str) -> std::io::Result<Self> {
        let path = root.join(job_id);
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %err, "scratch cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_exists_while_held_and_vanishes_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path;
        {
            let scratch = ScratchDir::create(root.path(), "job-1").unwrap();
            path = scratch.path().to_path_buf();
            fs::write(scratch.path().join("tmp.bin"), b"x").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
