// SYNOID Chaos Segment Reassembly
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Structural effects: cut the working file into segments, mangle the segment
// list, and stitch it back together. Segments are extracted with canonical
// codec parameters so the fast stream-copy concat usually works; when it does
// not, concatenation silently falls back to a re-encoding filter graph.

use crate::effects::{
    ChaosTimelineParams, ClipShuffleParams, ConcatDeluxeParams, RandomCutsParams, StructuralOp, StutterParams,
};
use crate::engine::workspace::discard;
use crate::engine::{EngineCommand, MediaEngine, QualityProfile, ScopedWorkspace};
use crate::error::{ChaosError, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Shortest segment ever extracted, in seconds.
const MIN_SEGMENT_SECS: f64 = 0.02;

const DUPLICATE_BELOW: f64 = 0.12;
const REVERSE_BELOW: f64 = 0.22;
const SHUFFLE_CHANCE: f64 = 0.3;

/// Per-segment looks for ChaosTimeline, weighted out of 100. `None` keeps the segment.
const CHAOS_FILTERS: [(Option<&str>, u32); 7] = [
    (None, 40),
    (Some("negate"), 10),
    (Some("hflip"), 10),
    (Some("vflip"), 10),
    (Some("hue=h=180:s=4"), 10),
    (Some("edgedetect=mode=colormix"), 10),
    (Some("scale=iw/2:ih/2,scale=iw*2:ih*2,format=yuv420p"), 10),
];

pub struct SegmentReassembler<'a> {
    engine: &'a dyn MediaEngine,
    workspace: &'a ScopedWorkspace,
}

impl<'a> SegmentReassembler<'a> {
    pub fn new(engine: &'a dyn MediaEngine, workspace: &'a ScopedWorkspace) -> Self {
        Self { engine, workspace }
    }

    /// Run one structural operation on `source` and return the new artifact.
    pub async fn apply<R: Rng + ?Sized>(&self, op: &StructuralOp, source: &Path, rng: &mut R) -> Result<PathBuf> {
        match op {
            StructuralOp::ConcatDeluxe(p) => self.concat_deluxe(source, p, rng).await,
            StructuralOp::RandomClipShuffle(p) => self.random_clip_shuffle(source, p, rng).await,
            StructuralOp::RandomCuts(p) => self.random_cuts(source, p, rng).await,
            StructuralOp::ChaosTimeline(p) => self.chaos_timeline(source, p, rng).await,
            StructuralOp::StutterLoop(p) => self.stutter_loop(source, p, rng).await,
        }
    }

    /// Join `parts` in order. Tries a stream copy first and re-encodes if the
    /// inputs turn out to be incompatible.
    pub async fn concatenate(&self, parts: &[PathBuf]) -> Result<PathBuf> {
        match parts {
            [] => {
                return Err(ChaosError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "no segments to concatenate",
                )))
            }
            [only] => return Ok(only.clone()),
            _ => {}
        }

        let output = self.workspace.artifact("concat");
        let copy = EngineCommand::ConcatCopy {
            inputs: parts.to_vec(),
            output: output.clone(),
        };
        match self.engine.execute(&copy).await {
            Ok(()) => {
                debug!("[REASSEMBLY] Stream-copy concat of {} parts", parts.len());
                Ok(output)
            }
            Err(failure) => {
                warn!(
                    "[REASSEMBLY] Stream-copy concat rejected ({}), re-encoding {} parts",
                    failure,
                    parts.len()
                );
                discard(&[output]);
                let output = self.workspace.artifact("concat_reencode");
                self.engine
                    .execute(&EngineCommand::ConcatReencode {
                        inputs: parts.to_vec(),
                        output: output.clone(),
                    })
                    .await?;
                Ok(output)
            }
        }
    }

    pub async fn extract_segment(&self, source: &Path, start: f64, duration: f64) -> Result<PathBuf> {
        let output = self.workspace.artifact("segment");
        self.engine
            .execute(&EngineCommand::ExtractSegment {
                input: source.to_path_buf(),
                output: output.clone(),
                start,
                duration,
            })
            .await?;
        Ok(output)
    }

    pub async fn reverse(&self, source: &Path) -> Result<PathBuf> {
        let output = self.workspace.artifact("reversed");
        self.engine
            .execute(&EngineCommand::Reverse {
                input: source.to_path_buf(),
                output: output.clone(),
            })
            .await?;
        Ok(output)
    }

    /// Equal contiguous segments, each kept, doubled or reversed, then maybe shuffled.
    pub async fn concat_deluxe<R: Rng + ?Sized>(
        &self,
        source: &Path,
        params: &ConcatDeluxeParams,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let duration = self.probe_duration(source).await?;
        // No more parts than fit at the minimum segment length.
        let max_parts = ((duration / MIN_SEGMENT_SECS) as usize).max(2);
        let parts = params.parts.clamp(2, max_parts);
        let seg_len = duration / parts as f64;
        info!("[REASSEMBLY] ConcatDeluxe: {} parts of {:.3}s", parts, seg_len);

        let mut intermediates = Vec::with_capacity(parts);
        let mut sequence = Vec::with_capacity(parts * 2);
        for i in 0..parts {
            let segment = self.extract_segment(source, i as f64 * seg_len, seg_len).await?;
            intermediates.push(segment.clone());

            let roll: f64 = rng.gen();
            if roll < DUPLICATE_BELOW {
                sequence.push(segment.clone());
                sequence.push(segment);
            } else if roll < REVERSE_BELOW {
                let reversed = self.reverse(&segment).await?;
                intermediates.push(reversed.clone());
                sequence.push(reversed);
            } else {
                sequence.push(segment);
            }
        }

        if rng.gen::<f64>() < SHUFFLE_CHANCE {
            debug!("[REASSEMBLY] ConcatDeluxe: shuffling {} entries", sequence.len());
            sequence.shuffle(rng);
        }

        let output = self.concatenate(&sequence).await?;
        Ok(finish(output, intermediates))
    }

    pub async fn random_clip_shuffle<R: Rng + ?Sized>(
        &self,
        source: &Path,
        params: &ClipShuffleParams,
        rng: &mut R,
    ) -> Result<PathBuf> {
        info!(
            "[REASSEMBLY] RandomClipShuffle: {} clips of {:.2}-{:.2}s",
            params.clip_count, params.min_len, params.max_len
        );
        self.random_clips(source, params.clip_count, params.min_len, params.max_len, rng)
            .await
    }

    pub async fn random_cuts<R: Rng + ?Sized>(
        &self,
        source: &Path,
        params: &RandomCutsParams,
        rng: &mut R,
    ) -> Result<PathBuf> {
        info!(
            "[REASSEMBLY] RandomCuts: {} cuts of {:.2}-{:.2}s",
            params.cuts, params.min_len, params.max_len
        );
        self.random_clips(source, params.cuts, params.min_len, params.max_len, rng)
            .await
    }

    /// `count` independent (possibly overlapping) clips in shuffled order.
    async fn random_clips<R: Rng + ?Sized>(
        &self,
        source: &Path,
        count: usize,
        min_len: f64,
        max_len: f64,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let duration = self.probe_duration(source).await?;
        let min_len = min_len.max(MIN_SEGMENT_SECS).min(duration);
        let max_len = max_len.max(min_len).min(duration);

        let mut clips = Vec::with_capacity(count.max(1));
        for _ in 0..count.max(1) {
            let len = uniform(rng, min_len, max_len);
            let start = uniform(rng, 0.0, duration - len);
            clips.push(self.extract_segment(source, start, len).await?);
        }

        let intermediates = clips.clone();
        clips.shuffle(rng);
        let output = self.concatenate(&clips).await?;
        Ok(finish(output, intermediates))
    }

    /// Contiguous pieces in original order, each with a weighted random look.
    pub async fn chaos_timeline<R: Rng + ?Sized>(
        &self,
        source: &Path,
        params: &ChaosTimelineParams,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let duration = self.probe_duration(source).await?;
        let segments = params.segments.max(1);
        // Rounded up to the millisecond; the last piece absorbs the overrun.
        let piece = ((duration / segments as f64) * 1000.0).ceil() / 1000.0;
        info!("[REASSEMBLY] ChaosTimeline: {} pieces of ~{:.3}s", segments, piece);

        let mut intermediates = Vec::with_capacity(segments * 2);
        let mut sequence = Vec::with_capacity(segments);
        for i in 0..segments {
            let start = i as f64 * piece;
            let remaining = duration - start;
            if remaining <= 1e-6 {
                break;
            }
            let segment = self.extract_segment(source, start, piece.min(remaining)).await?;
            intermediates.push(segment.clone());

            match pick_chaos_filter(rng) {
                Some(filter) => {
                    debug!("[REASSEMBLY] ChaosTimeline piece {}: {}", i, filter);
                    let styled = self.workspace.artifact("chaos");
                    self.engine
                        .execute(&EngineCommand::Transform {
                            input: segment,
                            output: styled.clone(),
                            video_filter: Some(filter.to_string()),
                            audio_filter: None,
                            profile: QualityProfile::Final,
                        })
                        .await?;
                    intermediates.push(styled.clone());
                    sequence.push(styled);
                }
                None => sequence.push(segment),
            }
        }

        let output = self.concatenate(&sequence).await?;
        Ok(finish(output, intermediates))
    }

    /// Splice `repeat` copies of a short slice in at a random point.
    pub async fn stutter_loop<R: Rng + ?Sized>(
        &self,
        source: &Path,
        params: &StutterParams,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let duration = self.probe_duration(source).await?;
        let slice = (params.segment_ms as f64 / 1000.0).max(MIN_SEGMENT_SECS).min(duration);
        let at = uniform(rng, 0.0, duration - slice);
        let repeat = params.repeat.max(1);
        info!("[REASSEMBLY] StutterLoop: {}x {:.3}s at {:.2}s", repeat, slice, at);

        let mut intermediates = Vec::with_capacity(3);
        let mut sequence = Vec::with_capacity(repeat + 2);
        if at > MIN_SEGMENT_SECS {
            let head = self.extract_segment(source, 0.0, at).await?;
            intermediates.push(head.clone());
            sequence.push(head);
        }
        let stutter = self.extract_segment(source, at, slice).await?;
        intermediates.push(stutter.clone());
        sequence.extend(std::iter::repeat(stutter).take(repeat));
        let tail = self.extract_segment(source, at, duration - at).await?;
        intermediates.push(tail.clone());
        sequence.push(tail);

        let output = self.concatenate(&sequence).await?;
        Ok(finish(output, intermediates))
    }

    async fn probe_duration(&self, source: &Path) -> Result<f64> {
        let duration = self.engine.probe(source).await;
        if duration <= 0.0 {
            return Err(ChaosError::DurationUnavailable(source.to_path_buf()));
        }
        Ok(duration)
    }
}

/// Drop per-segment files once they have been stitched into `output`.
fn finish(output: PathBuf, mut intermediates: Vec<PathBuf>) -> PathBuf {
    intermediates.retain(|p| *p != output);
    discard(&intermediates);
    output
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        lo
    } else {
        lo + rng.gen::<f64>() * (hi - lo)
    }
}

fn pick_chaos_filter<R: Rng + ?Sized>(rng: &mut R) -> Option<&'static str> {
    match WeightedIndex::new(CHAOS_FILTERS.iter().map(|(_, w)| *w)) {
        Ok(dist) => CHAOS_FILTERS[dist.sample(rng)].0,
        Err(_) => None,
    }
}
