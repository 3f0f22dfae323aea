// SYNOID Chaos Pipeline - Effect Timeline Executor
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Resolves a timeline and drives the resulting steps one after another
// through the media engine, threading a single working artifact. A render
// either writes the output or fails without leaving anything behind.

use crate::assets::AssetResolver;
use crate::config::EngineSettings;
use crate::effects::{EffectDescriptor, EffectKind, Extras};
use crate::engine::{EngineCommand, MediaEngine, QualityProfile, ScopedWorkspace};
use crate::error::{ChaosError, Result};
use crate::reassembly::SegmentReassembler;
use crate::timeline::{ResolvedStep, Timeline};
use rand::Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound of the random delay before an injected sound, in milliseconds.
const MAX_INJECT_DELAY_MS: u32 = 2000;

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// What to render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub timeline: Timeline,
    /// Fast, duration-capped render with reduced structural effects.
    pub preview: bool,
}

impl RenderRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, timeline: Timeline) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            timeline,
            preview: false,
        }
    }

    pub fn preview(mut self) -> Self {
        self.preview = true;
        self
    }
}

/// Outcome of a successful render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary {
    pub output: PathBuf,
    /// Steps that fired, in order.
    pub applied: Vec<ResolvedStep>,
    /// Steps that fired but were not recognised by the catalog.
    pub skipped: Vec<String>,
}

pub struct PipelineExecutor {
    engine: Arc<dyn MediaEngine>,
    assets: AssetResolver,
    work_dir: Option<PathBuf>,
    preview_seconds: f64,
    progress_callback: Option<ProgressCallback>,
}

impl PipelineExecutor {
    pub fn new(engine: Arc<dyn MediaEngine>, settings: &EngineSettings) -> Self {
        Self {
            engine,
            assets: AssetResolver::new(settings.assets_dir.clone()),
            work_dir: settings.work_dir.clone(),
            preview_seconds: settings.preview_seconds,
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Render `request`, drawing every random decision from `rng`.
    pub async fn render<R: Rng + ?Sized>(&self, request: &RenderRequest, rng: &mut R) -> Result<RenderSummary> {
        if !request.input.is_file() {
            return Err(ChaosError::InputNotFound(request.input.clone()));
        }

        let steps = request.timeline.resolve(rng);
        self.report_progress(&format!(
            "{} of {} effects fired",
            steps.len(),
            request.timeline.len()
        ));

        if steps.is_empty() {
            copy_to_output(&request.input, &request.output).await?;
            self.report_progress("No effects applied; output is a copy of the input");
            return Ok(RenderSummary {
                output: request.output.clone(),
                applied: steps,
                skipped: Vec::new(),
            });
        }

        let workspace = ScopedWorkspace::create(self.work_dir.as_deref())?;
        let result = self.run_steps(request, &steps, &workspace, rng).await;
        if let Err(e) = workspace.close() {
            warn!("[PIPELINE] Workspace cleanup warning: {}", e);
        }

        let skipped = result?;
        self.report_progress("Render complete!");
        Ok(RenderSummary {
            output: request.output.clone(),
            applied: steps,
            skipped,
        })
    }

    async fn run_steps<R: Rng + ?Sized>(
        &self,
        request: &RenderRequest,
        steps: &[ResolvedStep],
        workspace: &ScopedWorkspace,
        rng: &mut R,
    ) -> Result<Vec<String>> {
        let mut working = request.input.clone();
        let mut skipped = Vec::new();

        for (i, step) in steps.iter().enumerate() {
            let kind = match EffectKind::from_name(&step.name) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!("[PIPELINE] Skipping step {}: {}", i + 1, e);
                    skipped.push(step.name.clone());
                    continue;
                }
            };
            self.report_progress(&format!(
                "Step {}/{}: {} (level {})",
                i + 1,
                steps.len(),
                step.name,
                step.level
            ));
            let descriptor = kind.describe(step.level, &step.params, request.preview);
            working = self.apply_step(&working, descriptor, request.preview, workspace, rng).await?;
        }

        copy_to_output(&working, &request.output).await?;
        Ok(skipped)
    }

    async fn apply_step<R: Rng + ?Sized>(
        &self,
        working: &Path,
        descriptor: EffectDescriptor,
        preview: bool,
        workspace: &ScopedWorkspace,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let EffectDescriptor {
            video_filter,
            audio_filter,
            extras,
        } = descriptor;

        match extras {
            Extras::Structural(op) => {
                SegmentReassembler::new(self.engine.as_ref(), workspace)
                    .apply(&op, working, rng)
                    .await
            }
            Extras::Asset(reference) => {
                let Some(asset) = self.assets.resolve(&reference, rng) else {
                    warn!("[PIPELINE] Asset {:?} unavailable, step is a no-op", reference);
                    return Ok(working.to_path_buf());
                };
                let output = workspace.artifact("asset");
                let command = match video_filter {
                    Some(filter) => EngineCommand::Overlay {
                        base: working.to_path_buf(),
                        overlay: asset,
                        filter,
                        output: output.clone(),
                    },
                    None => EngineCommand::MixAudio {
                        base: working.to_path_buf(),
                        overlay: asset,
                        delay_ms: rng.gen_range(0..=MAX_INJECT_DELAY_MS),
                        output: output.clone(),
                    },
                };
                self.engine.execute(&command).await?;
                Ok(output)
            }
            Extras::None => {
                if video_filter.is_none() && audio_filter.is_none() {
                    return Ok(working.to_path_buf());
                }
                let output = workspace.artifact("step");
                self.engine
                    .execute(&EngineCommand::Transform {
                        input: working.to_path_buf(),
                        output: output.clone(),
                        video_filter,
                        audio_filter,
                        profile: self.profile(preview),
                    })
                    .await?;
                Ok(output)
            }
        }
    }

    fn profile(&self, preview: bool) -> QualityProfile {
        if preview {
            QualityProfile::Preview {
                max_seconds: Some(self.preview_seconds),
            }
        } else {
            QualityProfile::Final
        }
    }

    fn report_progress(&self, msg: &str) {
        info!("[PIPELINE] {}", msg);
        if let Some(ref callback) = self.progress_callback {
            callback(msg);
        }
    }
}

/// Copy the final artifact into place, removing any partial file on failure.
async fn copy_to_output(working: &Path, output: &Path) -> Result<()> {
    if working == output {
        return Ok(());
    }
    if let Err(e) = tokio::fs::copy(working, output).await {
        let _ = tokio::fs::remove_file(output).await;
        return Err(e.into());
    }
    Ok(())
}
