// SYNOID Chaos Library Root
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod assets;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod reassembly;
pub mod render_queue;
pub mod timeline;

pub use error::{ChaosError, EngineFailure, Result};
pub use pipeline::{PipelineExecutor, RenderRequest, RenderSummary};
pub use timeline::{EffectInstance, Timeline};
