// SYNOID Chaos Asset Resolver
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Turns an asset reference (file or directory) into one concrete file.
// An empty or missing directory is not an error: the caller degrades the step.

use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions considered usable as overlay or injection assets.
pub const ASSET_EXTENSIONS: [&str; 9] = ["mp3", "wav", "m4a", "ogg", "mp4", "webm", "gif", "png", "jpg"];

pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `reference` (joined to the assets root when relative).
    pub fn resolve<R: Rng + ?Sized>(&self, reference: &Path, rng: &mut R) -> Option<PathBuf> {
        let path = if reference.is_absolute() {
            reference.to_path_buf()
        } else {
            self.root.join(reference)
        };
        resolve_asset(&path, rng)
    }
}

/// Pick a file: `path` itself if it is a file, otherwise a uniformly random
/// matching file directly inside the directory.
pub fn resolve_asset<R: Rng + ?Sized>(path: &Path, rng: &mut R) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    if !path.is_dir() {
        warn!("[ASSETS] Asset reference does not exist: {:?}", path);
        return None;
    }

    let mut candidates = scan_assets(path);
    if candidates.is_empty() {
        warn!("[ASSETS] No usable assets in {:?}", path);
        return None;
    }
    // read_dir order is platform dependent; sort so seeded picks are reproducible.
    candidates.sort();
    let chosen = candidates.choose(rng).cloned();
    debug!("[ASSETS] Picked {:?} from {} candidates", chosen, candidates.len());
    chosen
}

/// Non-recursive scan of `dir` for files with a known asset extension.
pub fn scan_assets(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_asset_extension(p))
        .collect()
}

fn has_asset_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ASSET_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
