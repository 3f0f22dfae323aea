mod common;

use common::{entries, read_media, write_media, FakeEngine, CANONICAL_TAG};
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::VecDeque;
use std::path::PathBuf;
use synoid_chaos::effects::{
    ChaosTimelineParams, ClipShuffleParams, ConcatDeluxeParams, EffectKind, Extras, RandomCutsParams, StructuralOp,
    StutterParams,
};
use synoid_chaos::engine::{EngineCommand, ScopedWorkspace};
use synoid_chaos::reassembly::SegmentReassembler;
use synoid_chaos::timeline::EffectParams;
use synoid_chaos::ChaosError;
use tempfile::TempDir;

fn source(dir: &TempDir, name: &str, duration: f64) -> PathBuf {
    let path = dir.path().join(name);
    write_media(&path, duration, "h264_src");
    path
}

/// Every `gen::<f64>()` returns just under 1.0, so each segment is kept and the
/// shuffle roll never fires. Not usable where `gen_range` is drawn.
fn keep_everything_rng() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

/// Replays scripted `gen::<f64>()` values, then falls back to a seeded generator.
struct ScriptedRng {
    script: VecDeque<u64>,
    fallback: StdRng,
}

impl ScriptedRng {
    fn new(rolls: &[f64]) -> Self {
        // rand's Standard f64 keeps the top 53 bits of next_u64.
        let script = rolls.iter().map(|r| ((r * (1u64 << 53) as f64) as u64) << 11).collect();
        Self {
            script,
            fallback: StdRng::seed_from_u64(0),
        }
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.fallback.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.script.pop_front().unwrap_or_else(|| self.fallback.next_u64())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fallback.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fallback.try_fill_bytes(dest)
    }
}

fn extracted(commands: &[EngineCommand]) -> Vec<(PathBuf, f64)> {
    commands
        .iter()
        .filter_map(|c| match c {
            EngineCommand::ExtractSegment { output, duration, .. } => Some((output.clone(), *duration)),
            _ => None,
        })
        .collect()
}

fn concat_inputs(commands: &[EngineCommand]) -> Vec<PathBuf> {
    commands
        .iter()
        .find_map(|c| match c {
            EngineCommand::ConcatCopy { inputs, .. } => Some(inputs.clone()),
            _ => None,
        })
        .expect("no concat issued")
}

#[tokio::test]
async fn test_concat_deluxe_keeps_order_when_nothing_fires() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "eight.mp4", 8.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let op = StructuralOp::ConcatDeluxe(ConcatDeluxeParams { parts: 4 });
    let output = reassembler.apply(&op, &input, &mut keep_everything_rng()).await.unwrap();

    let commands = engine.commands();
    let mut segments = Vec::new();
    for (i, cmd) in commands.iter().take(4).enumerate() {
        match cmd {
            EngineCommand::ExtractSegment {
                start, duration, output, ..
            } => {
                assert_eq!(*start, i as f64 * 2.0);
                assert_eq!(*duration, 2.0);
                segments.push(output.clone());
            }
            other => panic!("expected extraction, got {:?}", other),
        }
    }
    match &commands[4] {
        EngineCommand::ConcatCopy { inputs, .. } => assert_eq!(inputs, &segments),
        other => panic!("expected stream-copy concat, got {:?}", other),
    }
    assert_eq!(commands.len(), 5);

    let (duration, _) = read_media(&output).unwrap();
    assert!((duration - 8.0).abs() < 1e-9);
    // Only the stitched result is left in the workspace.
    assert_eq!(entries(ws.path()), 1);
}

#[tokio::test]
async fn test_random_clip_shuffle_total_length() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "twenty.mp4", 20.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let params = ClipShuffleParams {
        clip_count: 5,
        min_len: 1.0,
        max_len: 1.0,
    };
    let mut rng = StdRng::seed_from_u64(5);
    let output = reassembler.random_clip_shuffle(&input, &params, &mut rng).await.unwrap();

    let extractions = engine.operations().iter().filter(|op| **op == "extract_segment").count();
    assert_eq!(extractions, 5);
    let (duration, _) = read_media(&output).unwrap();
    assert!((duration - 5.0).abs() < 1e-9, "got {}", duration);
}

#[tokio::test]
async fn test_random_cuts_uses_default_count() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "ten.mp4", 10.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let mut rng = StdRng::seed_from_u64(9);
    let output = reassembler
        .random_cuts(&input, &RandomCutsParams::default(), &mut rng)
        .await
        .unwrap();

    for cmd in engine.commands() {
        if let EngineCommand::ExtractSegment { start, duration, .. } = cmd {
            assert!((0.04..=0.25).contains(&duration));
            assert!(start >= 0.0 && start + duration <= 10.0 + 1e-9);
        }
    }
    let extractions = engine.operations().iter().filter(|op| **op == "extract_segment").count();
    assert_eq!(extractions, 40);
    let (duration, _) = read_media(&output).unwrap();
    assert!((1.6..=10.0).contains(&duration));
}

#[tokio::test]
async fn test_concat_falls_back_to_reencode_on_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.mp4");
    let b = dir.path().join("b.mp4");
    write_media(&a, 1.5, "h264_720p");
    write_media(&b, 2.5, "vp9_1080p");

    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let output = reassembler.concatenate(&[a, b]).await.unwrap();
    assert_eq!(engine.operations(), vec!["concat_copy", "concat_reencode"]);
    let (duration, tag) = read_media(&output).unwrap();
    assert!((duration - 4.0).abs() < 1e-9);
    assert_eq!(tag, CANONICAL_TAG);
}

#[tokio::test]
async fn test_concat_reencode_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.mp4");
    let b = dir.path().join("b.mp4");
    write_media(&a, 1.0, "x");
    write_media(&b, 1.0, "y");

    let engine = FakeEngine::failing_on("concat_reencode");
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let err = reassembler.concatenate(&[a, b]).await.unwrap_err();
    assert!(matches!(err, ChaosError::Transform(_)));
    assert!(err.to_string().contains("Invalid data found"));
}

#[tokio::test]
async fn test_concat_edge_cases() {
    let dir = tempfile::tempdir().unwrap();
    let only = source(&dir, "only.mp4", 3.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    assert!(matches!(reassembler.concatenate(&[]).await, Err(ChaosError::Io(_))));
    assert_eq!(reassembler.concatenate(&[only.clone()]).await.unwrap(), only);
    assert!(engine.commands().is_empty());
}

#[tokio::test]
async fn test_unprobeable_source_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.mp4");
    std::fs::write(&input, b"not a video").unwrap();

    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let op = StructuralOp::ChaosTimeline(ChaosTimelineParams::default());
    let err = reassembler
        .apply(&op, &input, &mut StdRng::seed_from_u64(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ChaosError::DurationUnavailable(p) if p == input));
    assert!(engine.commands().is_empty());
}

#[tokio::test]
async fn test_chaos_timeline_preserves_duration() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "ten.mp4", 10.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let params = ChaosTimelineParams { segments: 3 };
    let output = reassembler
        .chaos_timeline(&input, &params, &mut StdRng::seed_from_u64(3))
        .await
        .unwrap();

    let starts: Vec<f64> = engine
        .commands()
        .iter()
        .filter_map(|c| match c {
            EngineCommand::ExtractSegment { start, .. } => Some(*start),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 3);
    assert!(starts.windows(2).all(|w| w[0] < w[1]), "pieces out of order: {:?}", starts);

    let (duration, _) = read_media(&output).unwrap();
    assert!((duration - 10.0).abs() < 1e-6, "got {}", duration);
    assert_eq!(entries(ws.path()), 1);
}

#[tokio::test]
async fn test_stutter_loop_adds_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "four.mp4", 4.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let params = StutterParams {
        repeat: 3,
        segment_ms: 200,
    };
    let output = reassembler
        .stutter_loop(&input, &params, &mut StdRng::seed_from_u64(11))
        .await
        .unwrap();

    let (duration, _) = read_media(&output).unwrap();
    assert!((duration - 4.6).abs() < 0.03, "got {}", duration);
}

#[tokio::test]
async fn test_concat_deluxe_duplicates_and_reverses() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "eight.mp4", 8.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    // First segment doubled, second reversed, no shuffle.
    let mut rng = ScriptedRng::new(&[0.05, 0.15, 0.9]);
    let output = reassembler
        .concat_deluxe(&input, &ConcatDeluxeParams { parts: 2 }, &mut rng)
        .await
        .unwrap();

    let commands = engine.commands();
    assert_eq!(
        engine.operations(),
        vec!["extract_segment", "extract_segment", "reverse", "concat_copy"]
    );
    let segments = extracted(&commands);
    let reversed = match &commands[2] {
        EngineCommand::Reverse { input, output } => {
            assert_eq!(input, &segments[1].0);
            output.clone()
        }
        other => panic!("expected reverse, got {:?}", other),
    };
    assert_eq!(
        concat_inputs(&commands),
        vec![segments[0].0.clone(), segments[0].0.clone(), reversed]
    );

    let (duration, _) = read_media(&output).unwrap();
    assert!((duration - 12.0).abs() < 1e-9, "got {}", duration);
    assert_eq!(entries(ws.path()), 1);
}

#[tokio::test]
async fn test_concat_deluxe_shuffle_keeps_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "eight.mp4", 8.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    // Third segment doubled, then the shuffle roll fires.
    let mut rng = ScriptedRng::new(&[0.9, 0.9, 0.05, 0.9, 0.1]);
    let output = reassembler
        .concat_deluxe(&input, &ConcatDeluxeParams { parts: 4 }, &mut rng)
        .await
        .unwrap();

    let commands = engine.commands();
    let segments: Vec<PathBuf> = extracted(&commands).into_iter().map(|(p, _)| p).collect();
    assert_eq!(segments.len(), 4);
    assert!(!engine.operations().contains(&"reverse"));

    let mut expected = vec![
        segments[0].clone(),
        segments[1].clone(),
        segments[2].clone(),
        segments[2].clone(),
        segments[3].clone(),
    ];
    let mut joined = concat_inputs(&commands);
    expected.sort();
    joined.sort();
    assert_eq!(joined, expected);

    let (duration, _) = read_media(&output).unwrap();
    assert!((duration - 10.0).abs() < 1e-9, "got {}", duration);
}

#[tokio::test]
async fn test_concat_deluxe_limits_parts_on_short_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "blip.mp4", 1.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let output = reassembler
        .concat_deluxe(&input, &ConcatDeluxeParams { parts: 1000 }, &mut keep_everything_rng())
        .await
        .unwrap();

    let segments = extracted(&engine.commands());
    assert!(segments.len() >= 2 && segments.len() <= 50, "{} segments", segments.len());
    for (_, len) in &segments {
        assert!(*len >= 0.02 - 1e-12, "segment of {}s", len);
    }
    let (duration, _) = read_media(&output).unwrap();
    assert!((duration - 1.0).abs() < 1e-9, "got {}", duration);
}

async fn preview_clip_lengths(kind: EffectKind) -> Vec<f64> {
    let dir = tempfile::tempdir().unwrap();
    let input = source(&dir, "twenty.mp4", 20.0);
    let engine = FakeEngine::new();
    let ws = ScopedWorkspace::create(None).unwrap();
    let reassembler = SegmentReassembler::new(&engine, &ws);

    let params: EffectParams = serde_json::from_str(r#"{"min_len": 2.0, "max_len": 3.0}"#).unwrap();
    let op = match kind.describe(5, &params, true).extras {
        Extras::Structural(op) => op,
        other => panic!("expected structural op, got {:?}", other),
    };
    reassembler
        .apply(&op, &input, &mut StdRng::seed_from_u64(21))
        .await
        .unwrap();
    extracted(&engine.commands()).into_iter().map(|(_, len)| len).collect()
}

#[tokio::test]
async fn test_preview_clip_shuffle_respects_cap_with_long_min_len() {
    let lengths = preview_clip_lengths(EffectKind::RandomClipShuffle).await;
    assert_eq!(lengths.len(), 4);
    assert!(lengths.iter().all(|len| *len <= 1.0), "{:?}", lengths);
}

#[tokio::test]
async fn test_preview_random_cuts_respects_cap_with_long_min_len() {
    let lengths = preview_clip_lengths(EffectKind::RandomCuts).await;
    assert_eq!(lengths.len(), 12);
    assert!(lengths.iter().all(|len| *len <= 0.15), "{:?}", lengths);
}
