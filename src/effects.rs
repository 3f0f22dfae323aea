// SYNOID Chaos Effect Catalog
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Closed set of effects. Each kind describes itself as a filter pair, an asset
// reference, or a structural (segment reassembly) operation. Describing is pure:
// the same (kind, level, params, preview) always yields the same descriptor.

use crate::error::{ChaosError, Result};
use crate::timeline::{EffectParams, Timeline};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Sample rate assumed by the pitch filters.
const PITCH_BASE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Reverse,
    SpeedWarp,
    InvertColors,
    Mirror,
    RainbowOverlay,
    AddRandomSound,
    Earrape,
    Chorus,
    Vibrato,
    PitchShift,
    LowQuality,
    FrameShuffle,
    InjectMeme,
    StutterLoop,
    ConcatDeluxe,
    RandomClipShuffle,
    RandomCuts,
    ChaosTimeline,
}

impl EffectKind {
    pub const ALL: [EffectKind; 18] = [
        Self::Reverse,
        Self::SpeedWarp,
        Self::InvertColors,
        Self::Mirror,
        Self::RainbowOverlay,
        Self::AddRandomSound,
        Self::Earrape,
        Self::Chorus,
        Self::Vibrato,
        Self::PitchShift,
        Self::LowQuality,
        Self::FrameShuffle,
        Self::InjectMeme,
        Self::StutterLoop,
        Self::ConcatDeluxe,
        Self::RandomClipShuffle,
        Self::RandomCuts,
        Self::ChaosTimeline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Reverse => "Reverse",
            Self::SpeedWarp => "SpeedWarp",
            Self::InvertColors => "InvertColors",
            Self::Mirror => "Mirror",
            Self::RainbowOverlay => "RainbowOverlay",
            Self::AddRandomSound => "AddRandomSound",
            Self::Earrape => "Earrape",
            Self::Chorus => "Chorus",
            Self::Vibrato => "Vibrato",
            Self::PitchShift => "PitchShift",
            Self::LowQuality => "LowQuality",
            Self::FrameShuffle => "FrameShuffle",
            Self::InjectMeme => "InjectMeme",
            Self::StutterLoop => "StutterLoop",
            Self::ConcatDeluxe => "ConcatDeluxe",
            Self::RandomClipShuffle => "RandomClipShuffle",
            Self::RandomCuts => "RandomCuts",
            Self::ChaosTimeline => "ChaosTimeline",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Reverse => "Reverse video & audio",
            Self::SpeedWarp => "Speed up or slow down",
            Self::InvertColors => "Invert colors",
            Self::Mirror => "Mirror horizontally",
            Self::RainbowOverlay => "Overlay a rainbow (requires assets)",
            Self::AddRandomSound => "Add random sound from assets/sounds",
            Self::Earrape => "Extremely amplify audio",
            Self::Chorus => "Chorus-like audio effect",
            Self::Vibrato => "Vibrato / small pitch bend",
            Self::PitchShift => "Pitch shift audio",
            Self::LowQuality => "Make video low quality / blocky",
            Self::FrameShuffle => "Smear frames together (experimental)",
            Self::InjectMeme => "Overlay meme image/gif (assets/memes)",
            Self::StutterLoop => "Repeat a short slice in place",
            Self::ConcatDeluxe => "Split, duplicate, reverse & reorder segments",
            Self::RandomClipShuffle => "Montage of random clips in random order",
            Self::RandomCuts => "Rapid-fire micro cuts",
            Self::ChaosTimeline => "Per-segment random filters",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ChaosError::UnknownEffect(name.to_string()))
    }

    /// Build the descriptor for this effect at the given level.
    pub fn describe(self, level: u8, params: &EffectParams, preview: bool) -> EffectDescriptor {
        let lvl = level.clamp(1, 10);
        match self {
            Self::Reverse => EffectDescriptor::filters(Some("reverse".into()), Some("areverse".into())),
            Self::SpeedWarp => {
                let factor = speed_factor(lvl);
                EffectDescriptor::filters(Some(format!("setpts=PTS/{:.4}", factor)), Some(atempo_filter(factor)))
            }
            Self::InvertColors => EffectDescriptor::video("negate"),
            Self::Mirror => EffectDescriptor::video("hflip"),
            Self::RainbowOverlay => EffectDescriptor {
                video_filter: Some("overlay=10:10".into()),
                audio_filter: None,
                extras: Extras::Asset(asset_reference(params, "rainbow.png")),
            },
            Self::AddRandomSound => EffectDescriptor {
                video_filter: None,
                audio_filter: None,
                extras: Extras::Asset(asset_reference(params, "sounds")),
            },
            Self::Earrape => EffectDescriptor::audio(format!("volume={}", amplification_gain(lvl))),
            Self::Chorus => {
                let delay = 40 + lvl as u32 * 5;
                let decay = 0.2 + lvl as f64 * 0.05;
                EffectDescriptor::audio(format!(
                    "aecho=0.8:0.9:{}|{}:{:.2}|{:.3}",
                    delay,
                    delay * 2,
                    decay,
                    decay * 0.7
                ))
            }
            Self::Vibrato => EffectDescriptor::audio(pitch_filter((lvl as f64 - 5.0) * 0.5)),
            Self::PitchShift => EffectDescriptor::audio(pitch_filter((lvl as f64 - 5.0) * 1.2)),
            Self::LowQuality => EffectDescriptor::video("scale=iw/2:ih/2,scale=iw*2:ih*2,format=yuv420p"),
            Self::FrameShuffle => EffectDescriptor::video("tblend=all_mode=average,framestep=1"),
            Self::InjectMeme => EffectDescriptor {
                video_filter: Some("overlay=W-w-10:10".into()),
                audio_filter: None,
                extras: Extras::Asset(asset_reference(params, "memes")),
            },
            Self::StutterLoop => {
                let mut op: StutterParams = typed_params(self, params);
                if !params.contains_key("repeat") {
                    op.repeat = 2 + lvl as usize / 3;
                }
                EffectDescriptor::structural(StructuralOp::StutterLoop(op))
            }
            Self::ConcatDeluxe => {
                let op: ConcatDeluxeParams = typed_params(self, params);
                EffectDescriptor::structural(StructuralOp::ConcatDeluxe(op))
            }
            Self::RandomClipShuffle => {
                let mut op: ClipShuffleParams = typed_params(self, params);
                if preview {
                    op.clip_count = op.clip_count.min(4);
                    op.max_len = op.max_len.min(1.0);
                    op.min_len = op.min_len.min(op.max_len);
                }
                EffectDescriptor::structural(StructuralOp::RandomClipShuffle(op))
            }
            Self::RandomCuts => {
                let mut op: RandomCutsParams = typed_params(self, params);
                if preview {
                    op.cuts = op.cuts.min(12);
                    op.max_len = op.max_len.min(0.15);
                    op.min_len = op.min_len.min(op.max_len);
                }
                EffectDescriptor::structural(StructuralOp::RandomCuts(op))
            }
            Self::ChaosTimeline => {
                let mut op: ChaosTimelineParams = typed_params(self, params);
                if preview {
                    op.segments = op.segments.min(6);
                }
                EffectDescriptor::structural(StructuralOp::ChaosTimeline(op))
            }
        }
    }
}

/// Look up `name` in the catalog and describe it.
pub fn describe(name: &str, level: u8, params: &EffectParams, preview: bool) -> Result<EffectDescriptor> {
    Ok(EffectKind::from_name(name)?.describe(level, params, preview))
}

/// Names in `timeline` that the catalog does not know, in timeline order.
pub fn validate_timeline(timeline: &Timeline) -> Vec<String> {
    timeline
        .effects
        .iter()
        .filter(|inst| EffectKind::from_name(&inst.name).is_err())
        .map(|inst| inst.name.clone())
        .collect()
}

/// What an effect asks the pipeline to do.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectDescriptor {
    pub video_filter: Option<String>,
    pub audio_filter: Option<String>,
    pub extras: Extras,
}

impl EffectDescriptor {
    fn filters(video_filter: Option<String>, audio_filter: Option<String>) -> Self {
        Self {
            video_filter,
            audio_filter,
            extras: Extras::None,
        }
    }

    fn video(filter: &str) -> Self {
        Self::filters(Some(filter.to_string()), None)
    }

    fn audio(filter: String) -> Self {
        Self::filters(None, Some(filter))
    }

    fn structural(op: StructuralOp) -> Self {
        Self {
            video_filter: None,
            audio_filter: None,
            extras: Extras::Structural(op),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extras {
    None,
    /// A file, or a directory to pick a random file from. Relative paths are
    /// resolved against the assets root.
    Asset(PathBuf),
    Structural(StructuralOp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuralOp {
    ConcatDeluxe(ConcatDeluxeParams),
    RandomClipShuffle(ClipShuffleParams),
    RandomCuts(RandomCutsParams),
    ChaosTimeline(ChaosTimelineParams),
    StutterLoop(StutterParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatDeluxeParams {
    pub parts: usize,
}

impl Default for ConcatDeluxeParams {
    fn default() -> Self {
        Self { parts: 6 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipShuffleParams {
    pub clip_count: usize,
    pub min_len: f64,
    pub max_len: f64,
}

impl Default for ClipShuffleParams {
    fn default() -> Self {
        Self {
            clip_count: 8,
            min_len: 0.5,
            max_len: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomCutsParams {
    pub cuts: usize,
    pub min_len: f64,
    pub max_len: f64,
}

impl Default for RandomCutsParams {
    fn default() -> Self {
        Self {
            cuts: 40,
            min_len: 0.04,
            max_len: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosTimelineParams {
    pub segments: usize,
}

impl Default for ChaosTimelineParams {
    fn default() -> Self {
        Self { segments: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StutterParams {
    pub repeat: usize,
    pub segment_ms: u64,
}

impl Default for StutterParams {
    fn default() -> Self {
        Self {
            repeat: 3,
            segment_ms: 120,
        }
    }
}

/// Decode a typed parameter record from the free-form params, falling back to
/// defaults when the params do not fit the record.
fn typed_params<T: DeserializeOwned + Default>(kind: EffectKind, params: &EffectParams) -> T {
    let map: serde_json::Map<String, serde_json::Value> = params.clone().into_iter().collect();
    serde_json::from_value(serde_json::Value::Object(map)).unwrap_or_else(|e| {
        warn!("[EFFECTS] Ignoring malformed params for {}: {}", kind.name(), e);
        T::default()
    })
}

fn asset_reference(params: &EffectParams, default: &str) -> PathBuf {
    params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Map level 1..=10 linearly onto a tempo factor 0.5..=3.0.
pub fn speed_factor(level: u8) -> f64 {
    let lvl = level.clamp(1, 10) as f64;
    0.5 + (lvl - 1.0) * (2.5 / 9.0)
}

/// Split `factor` into atempo stages that each stay within [0.5, 2.0].
pub fn atempo_chain(factor: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut rest = factor;
    if rest > 2.0 {
        while rest > 2.0 {
            stages.push(2.0);
            rest /= 2.0;
        }
        if rest != 1.0 {
            stages.push(rest);
        }
    } else if rest < 0.5 {
        while rest < 0.5 {
            stages.push(0.5);
            rest /= 0.5;
        }
        if rest != 1.0 {
            stages.push(rest);
        }
    } else {
        stages.push(rest);
    }
    stages
}

fn atempo_filter(factor: f64) -> String {
    atempo_chain(factor)
        .iter()
        .map(|f| format!("atempo={:.3}", f))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn amplification_gain(level: u8) -> f64 {
    1.0 + level.clamp(1, 10) as f64 * 3.0
}

/// Resample-based pitch shift with the duration compensated back by atempo.
pub fn pitch_filter(semitones: f64) -> String {
    let rate = 2f64.powf(semitones / 12.0);
    format!(
        "asetrate={base}*{rate:.5},aresample={base},atempo={inv:.5}",
        base = PITCH_BASE_RATE,
        rate = rate,
        inv = 1.0 / rate
    )
}
