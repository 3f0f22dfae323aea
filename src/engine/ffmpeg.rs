// SYNOID Chaos FFmpeg Adapter
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Implements the engine contract on top of the ffmpeg/ffprobe binaries.
// Commands become argument vectors; nothing goes through a shell.

use super::{EngineCommand, MediaEngine, QualityProfile};
use crate::config::{CanonicalFormat, EngineSettings};
use crate::error::EngineFailure;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// How many trailing stderr lines are kept as the failure diagnostic.
const DIAGNOSTIC_LINES: usize = 20;

pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    probe_timeout: Duration,
    canonical: CanonicalFormat,
}

impl FfmpegEngine {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg.clone(),
            ffprobe: settings.ffprobe.clone(),
            probe_timeout: Duration::from_secs(settings.probe_timeout_secs),
            canonical: settings.canonical.clone(),
        }
    }

    /// Returns `true` when `ffmpeg -version` runs successfully.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn run(&self, operation: &'static str, args: Vec<OsString>) -> Result<(), EngineFailure> {
        debug!("[ENGINE] {} {:?}", operation, args);
        let output = Command::new(&self.ffmpeg)
            .args(["-y", "-nostdin", "-hide_banner", "-loglevel", "error"])
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineFailure::new(operation, None, format!("failed to launch {:?}: {}", self.ffmpeg, e)))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(EngineFailure::new(operation, output.status.code(), stderr_tail(&stderr)))
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> f64 {
        let probe = Command::new(&self.ffprobe)
            .kill_on_drop(true)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(safe_arg_path(path))
            .output();

        let output = match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("[ENGINE] ffprobe could not run on {:?}: {}", path, e);
                return 0.0;
            }
            Err(_) => {
                warn!("[ENGINE] ffprobe timed out on {:?}", path);
                return 0.0;
            }
        };
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn execute(&self, command: &EngineCommand) -> Result<(), EngineFailure> {
        let operation = command.operation();
        if let EngineCommand::ConcatCopy { inputs, output } = command {
            let manifest = concat_manifest_path(output);
            tokio::fs::write(&manifest, create_concat_manifest(inputs))
                .await
                .map_err(|e| EngineFailure::new(operation, None, format!("cannot write concat manifest: {}", e)))?;
            let result = self.run(operation, build_args(command, &self.canonical)).await;
            let _ = tokio::fs::remove_file(&manifest).await;
            return result;
        }
        let result = self.run(operation, build_args(command, &self.canonical)).await;
        if result.is_ok() {
            info!("[ENGINE] {} -> {:?}", operation, command.output());
        }
        result
    }
}

/// Translate a command into ffmpeg arguments (without the global `-y` prefix).
pub fn build_args(command: &EngineCommand, canonical: &CanonicalFormat) -> Vec<OsString> {
    let mut args = ArgList::default();
    match command {
        EngineCommand::Transform {
            input,
            output,
            video_filter,
            audio_filter,
            profile,
        } => {
            args.push("-i").path(input);
            if let Some(vf) = video_filter {
                args.push("-vf").push(vf);
            }
            if let Some(af) = audio_filter {
                args.push("-af").push(af);
            }
            if let Some(max) = profile.max_seconds() {
                args.push("-t").push(format!("{:.3}", max));
            }
            args.video_codec(*profile).push("-c:a").push("aac");
            args.path(output);
        }
        EngineCommand::ExtractSegment {
            input,
            output,
            start,
            duration,
        } => {
            args.push("-ss").push(format!("{:.3}", start));
            args.push("-i").path(input);
            args.push("-t").push(format!("{:.3}", duration));
            args.canonical(canonical);
            args.path(output);
        }
        EngineCommand::ConcatCopy { output, .. } => {
            args.push("-f").push("concat").push("-safe").push("0");
            args.push("-i").path(&concat_manifest_path(output));
            args.push("-c").push("copy");
            args.path(output);
        }
        EngineCommand::ConcatReencode { inputs, output } => {
            for input in inputs {
                args.push("-i").path(input);
            }
            args.push("-filter_complex").push(concat_filter_graph(inputs.len(), canonical));
            args.push("-map").push("[outv]").push("-map").push("[outa]");
            args.canonical(canonical);
            args.path(output);
        }
        EngineCommand::Overlay {
            base,
            overlay,
            filter,
            output,
        } => {
            args.push("-i").path(base);
            args.push("-i").path(overlay);
            args.push("-filter_complex").push(format!("[0:v][1:v]{}[vout]", filter));
            args.push("-map").push("[vout]").push("-map").push("0:a?");
            args.video_codec(QualityProfile::Final).push("-c:a").push("copy");
            args.path(output);
        }
        EngineCommand::MixAudio {
            base,
            overlay,
            delay_ms,
            output,
        } => {
            args.push("-i").path(base);
            args.push("-i").path(overlay);
            args.push("-filter_complex").push(format!(
                "[1:a]adelay={d}|{d}[s1];[0:a][s1]amix=inputs=2:duration=first:dropout_transition=3[aout]",
                d = delay_ms
            ));
            args.push("-map").push("0:v").push("-map").push("[aout]");
            args.push("-c:v").push("copy").push("-c:a").push("aac").push("-b:a").push("192k");
            args.path(output);
        }
        EngineCommand::Reverse { input, output } => {
            args.push("-i").path(input);
            args.push("-vf").push("reverse").push("-af").push("areverse");
            args.canonical(canonical);
            args.path(output);
        }
    }
    args.0
}

#[derive(Default)]
struct ArgList(Vec<OsString>);

impl ArgList {
    fn push(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.0.push(arg.into());
        self
    }

    fn path(&mut self, path: &Path) -> &mut Self {
        self.0.push(safe_arg_path(path).into_os_string());
        self
    }

    fn video_codec(&mut self, profile: QualityProfile) -> &mut Self {
        self.push("-c:v")
            .push("libx264")
            .push("-preset")
            .push(profile.preset())
            .push("-crf")
            .push(profile.crf().to_string())
    }

    fn canonical(&mut self, canonical: &CanonicalFormat) -> &mut Self {
        self.video_codec(QualityProfile::Final)
            .push("-pix_fmt")
            .push("yuv420p")
            .push("-r")
            .push(canonical.fps.to_string())
            .push("-c:a")
            .push("aac")
            .push("-ar")
            .push(canonical.sample_rate.to_string())
            .push("-ac")
            .push("2")
    }
}

/// Keep relative paths that start with '-' from being read as options.
pub fn safe_arg_path(path: &Path) -> PathBuf {
    if path.is_relative() && path.to_string_lossy().starts_with('-') {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Manifest for the concat demuxer, one `file '<path>'` line per input.
pub fn create_concat_manifest(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let absolute = if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().map(|cwd| cwd.join(p)).unwrap_or_else(|_| p.clone())
            };
            format!("file '{}'", absolute.to_string_lossy().replace('\'', "'\\''"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn concat_manifest_path(output: &Path) -> PathBuf {
    output.with_extension("concat.txt")
}

/// Concat filter that first normalizes every input to the canonical format.
pub fn concat_filter_graph(count: usize, canonical: &CanonicalFormat) -> String {
    let (w, h) = (canonical.width, canonical.height);
    let mut graph = String::new();
    let mut pads = String::new();
    for i in 0..count {
        graph.push_str(&format!(
            "[{i}:v:0]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}];",
            i = i,
            w = w,
            h = h,
            fps = canonical.fps
        ));
        graph.push_str(&format!(
            "[{i}:a:0]aresample={rate},aformat=channel_layouts=stereo[a{i}];",
            i = i,
            rate = canonical.sample_rate
        ));
        pads.push_str(&format!("[v{i}][a{i}]", i = i));
    }
    graph.push_str(&format!("{}concat=n={}:v=1:a=1[outv][outa]", pads, count));
    graph
}

fn parse_duration(stdout: &str) -> f64 {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0)
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_LINES);
    lines[start..].join("\n")
}
