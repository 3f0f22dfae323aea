// SYNOID Chaos Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Engine settings come from the environment (a .env file is honoured by the
// binary). Projects are JSON files holding input, output and the timeline.

use crate::error::{ChaosError, Result};
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default project file name, next to where the tool is run.
pub const DEFAULT_PROJECT_FILE: &str = "config.json";

/// Canonical encode parameters shared by every segment the engine produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
}

impl Default for CanonicalFormat {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            sample_rate: 44_100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// Root that relative asset references are resolved against.
    pub assets_dir: PathBuf,
    /// Parent of per-render workspaces; system temp dir when `None`.
    pub work_dir: Option<PathBuf>,
    /// Duration cap for preview renders.
    pub preview_seconds: f64,
    pub probe_timeout_secs: u64,
    pub canonical: CanonicalFormat,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            assets_dir: PathBuf::from("assets"),
            work_dir: None,
            preview_seconds: 6.0,
            probe_timeout_secs: 10,
            canonical: CanonicalFormat::default(),
        }
    }
}

impl EngineSettings {
    /// Defaults overridden by `SYNOID_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(v) = lookup("SYNOID_FFMPEG") {
            settings.ffmpeg = PathBuf::from(v);
        }
        if let Some(v) = lookup("SYNOID_FFPROBE") {
            settings.ffprobe = PathBuf::from(v);
        }
        if let Some(v) = lookup("SYNOID_ASSETS_DIR") {
            settings.assets_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SYNOID_WORK_DIR") {
            settings.work_dir = Some(PathBuf::from(v));
        }
        if let Some(secs) = lookup("SYNOID_PREVIEW_SECONDS").and_then(|v| v.parse::<f64>().ok()) {
            if secs > 0.0 {
                settings.preview_seconds = secs;
            }
        }
        settings
    }
}

/// Persisted project: what to render and how.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub input: String,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub timeline: Timeline,
}

fn default_output() -> String {
    "output.mp4".to_string()
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ChaosError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let project: ProjectFile = serde_json::from_str(&json)
            .map_err(|e| ChaosError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        info!(
            "[CONFIG] Loaded project {:?} ({} effects)",
            path,
            project.timeline.len()
        );
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ChaosError::Config(format!("serialization error: {}", e)))?;
        fs::write(path, json)?;
        info!("[CONFIG] Project saved: {:?}", path);
        Ok(())
    }
}

/// Load a bare timeline (JSON array) or a full project file and return its timeline.
pub fn load_timeline(path: &Path) -> Result<Timeline> {
    let json = fs::read_to_string(path)
        .map_err(|e| ChaosError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    if let Ok(timeline) = Timeline::from_json(&json) {
        return Ok(timeline);
    }
    serde_json::from_str::<ProjectFile>(&json)
        .map(|p| p.timeline)
        .map_err(|e| ChaosError::Config(format!("{} is neither a timeline nor a project: {}", path.display(), e)))
}
