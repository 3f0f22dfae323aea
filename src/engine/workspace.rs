// SYNOID Chaos Scoped Workspace
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Per-render temp directory. Every intermediate lives here and the directory
// goes away when the workspace is dropped, whatever path the render took.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "synoid_chaos_";

pub struct ScopedWorkspace {
    dir: TempDir,
    next_id: AtomicUsize,
}

impl ScopedWorkspace {
    /// Create a uniquely named workspace under `parent` (system temp dir if `None`).
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        debug!("[WORKSPACE] Created {:?}", dir.path());
        Ok(Self {
            dir,
            next_id: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fresh artifact path, unique within this workspace.
    pub fn artifact(&self, label: &str) -> PathBuf {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.dir.path().join(format!("{:04}_{}.mp4", id, label))
    }

    /// Remove the workspace now and report failures instead of swallowing them.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            warn!("[WORKSPACE] Cleanup of {:?} failed: {}", path, e);
            e
        })
    }
}

/// Best-effort removal of intermediate files that are no longer referenced.
pub fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("[WORKSPACE] Could not remove {:?}: {}", path, e);
            }
        }
    }
}
