// In-memory stand-in for ffmpeg. A "video" is a text file holding
// `<duration>:<codec tag>`; every command reads and writes that format so
// durations can be checked without real media.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use synoid_chaos::engine::{EngineCommand, MediaEngine};
use synoid_chaos::EngineFailure;

/// Tag written by commands that re-encode to the canonical format.
pub const CANONICAL_TAG: &str = "canon";

#[derive(Default)]
pub struct FakeEngine {
    commands: Mutex<Vec<EngineCommand>>,
    fail_on: Option<&'static str>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command whose operation name equals `operation` fails.
    pub fn failing_on(operation: &'static str) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_on: Some(operation),
        }
    }

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.commands().iter().map(|c| c.operation()).collect()
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn probe(&self, path: &Path) -> f64 {
        read_media(path).map(|(d, _)| d).unwrap_or(0.0)
    }

    async fn execute(&self, command: &EngineCommand) -> Result<(), EngineFailure> {
        self.commands.lock().unwrap().push(command.clone());
        let op = command.operation();
        if self.fail_on == Some(op) {
            return Err(EngineFailure::new(op, Some(1), "Invalid data found when processing input"));
        }

        let (duration, tag) = match command {
            EngineCommand::Transform { input, profile, .. } => {
                let (d, tag) = read_or_fail(op, input)?;
                let d = profile.max_seconds().map_or(d, |cap| d.min(cap));
                (d, tag)
            }
            EngineCommand::ExtractSegment {
                input, start, duration, ..
            } => {
                let (d, _) = read_or_fail(op, input)?;
                let available = (d - start).max(0.0);
                (duration.min(available), CANONICAL_TAG.to_string())
            }
            EngineCommand::ConcatCopy { inputs, .. } => {
                let media = inputs
                    .iter()
                    .map(|p| read_or_fail(op, p))
                    .collect::<Result<Vec<_>, _>>()?;
                let first_tag = media[0].1.clone();
                if media.iter().any(|(_, t)| *t != first_tag) {
                    return Err(EngineFailure::new(op, Some(1), "codec parameters do not match"));
                }
                (media.iter().map(|(d, _)| d).sum::<f64>(), first_tag)
            }
            EngineCommand::ConcatReencode { inputs, .. } => {
                let mut total = 0.0;
                for p in inputs {
                    total += read_or_fail(op, p)?.0;
                }
                (total, CANONICAL_TAG.to_string())
            }
            EngineCommand::Overlay { base, .. } | EngineCommand::MixAudio { base, .. } => read_or_fail(op, base)?,
            EngineCommand::Reverse { input, .. } => read_or_fail(op, input)?,
        };

        write_media(command.output(), duration, &tag);
        Ok(())
    }
}

pub fn write_media(path: &Path, duration: f64, tag: &str) {
    std::fs::write(path, format!("{}:{}", duration, tag)).unwrap();
}

pub fn read_media(path: &Path) -> Option<(f64, String)> {
    let text = std::fs::read_to_string(path).ok()?;
    let (duration, tag) = text.trim().split_once(':')?;
    Some((duration.parse().ok()?, tag.to_string()))
}

fn read_or_fail(op: &'static str, path: &PathBuf) -> Result<(f64, String), EngineFailure> {
    read_media(path).ok_or_else(|| EngineFailure::new(op, Some(1), format!("{}: No such file", path.display())))
}

/// Number of entries left in `dir`.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
