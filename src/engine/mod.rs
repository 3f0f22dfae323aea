// SYNOID Chaos Media Transform Engine
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The engine is the only thing that touches codecs. The pipeline talks to it
// through structured commands; the ffmpeg adapter turns those into argv.

pub mod ffmpeg;
pub mod workspace;

use crate::error::EngineFailure;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use ffmpeg::FfmpegEngine;
pub use workspace::ScopedWorkspace;

/// Encode quality for plain transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityProfile {
    /// Fast and lossy, optionally capped in duration.
    Preview { max_seconds: Option<f64> },
    Final,
}

impl QualityProfile {
    pub fn preset(&self) -> &'static str {
        match self {
            Self::Preview { .. } => "veryfast",
            Self::Final => "fast",
        }
    }

    pub fn crf(&self) -> u8 {
        match self {
            Self::Preview { .. } => 28,
            Self::Final => 23,
        }
    }

    pub fn max_seconds(&self) -> Option<f64> {
        match self {
            Self::Preview { max_seconds } => *max_seconds,
            Self::Final => None,
        }
    }
}

/// One engine invocation. Every command writes exactly one artifact at `output`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Transform {
        input: PathBuf,
        output: PathBuf,
        video_filter: Option<String>,
        audio_filter: Option<String>,
        profile: QualityProfile,
    },
    /// Re-encodes to canonical parameters so sibling segments stay concat-compatible.
    ExtractSegment {
        input: PathBuf,
        output: PathBuf,
        start: f64,
        duration: f64,
    },
    /// Stream-copy concatenation. Fails when inputs disagree on codec parameters.
    ConcatCopy { inputs: Vec<PathBuf>, output: PathBuf },
    /// Filter-graph concatenation tolerant of mismatched inputs.
    ConcatReencode { inputs: Vec<PathBuf>, output: PathBuf },
    Overlay {
        base: PathBuf,
        overlay: PathBuf,
        filter: String,
        output: PathBuf,
    },
    MixAudio {
        base: PathBuf,
        overlay: PathBuf,
        delay_ms: u32,
        output: PathBuf,
    },
    Reverse { input: PathBuf, output: PathBuf },
}

impl EngineCommand {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Transform { .. } => "transform",
            Self::ExtractSegment { .. } => "extract_segment",
            Self::ConcatCopy { .. } => "concat_copy",
            Self::ConcatReencode { .. } => "concat_reencode",
            Self::Overlay { .. } => "overlay",
            Self::MixAudio { .. } => "mix_audio",
            Self::Reverse { .. } => "reverse",
        }
    }

    pub fn output(&self) -> &Path {
        match self {
            Self::Transform { output, .. }
            | Self::ExtractSegment { output, .. }
            | Self::ConcatCopy { output, .. }
            | Self::ConcatReencode { output, .. }
            | Self::Overlay { output, .. }
            | Self::MixAudio { output, .. }
            | Self::Reverse { output, .. } => output,
        }
    }
}

/// Media Transform Engine contract consumed by the pipeline.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Duration in seconds; `0.0` when it cannot be determined.
    async fn probe(&self, path: &Path) -> f64;

    /// Run one command to completion.
    async fn execute(&self, command: &EngineCommand) -> Result<(), EngineFailure>;
}
