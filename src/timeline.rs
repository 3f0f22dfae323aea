// SYNOID Chaos Timeline
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// A Timeline is the declarative list of probabilistic effects for a render.
// Resolution samples it once per render into the concrete steps that fire.

use crate::effects::EffectKind;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Free-form effect parameters, as persisted in the timeline record.
pub type EffectParams = BTreeMap<String, serde_json::Value>;

fn default_probability() -> u8 {
    100
}

fn default_max_level() -> u8 {
    5
}

fn default_enabled() -> bool {
    true
}

/// One entry of a Timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInstance {
    pub name: String,
    /// Chance to fire, 0-100.
    #[serde(default = "default_probability")]
    pub probability: u8,
    /// Upper bound of the sampled intensity, 1-10.
    #[serde(default = "default_max_level")]
    pub max_level: u8,
    #[serde(default)]
    pub params: EffectParams,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl EffectInstance {
    pub fn new(name: &str, probability: u8, max_level: u8) -> Self {
        Self {
            name: name.to_string(),
            probability,
            max_level,
            params: EffectParams::new(),
            enabled: true,
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A timeline entry that was sampled to apply, with a concrete level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedStep {
    pub name: String,
    pub level: u8,
    pub params: EffectParams,
}

/// Ordered effect list. Order is significant and names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    pub effects: Vec<EffectInstance>,
}

impl Timeline {
    pub fn new(effects: Vec<EffectInstance>) -> Self {
        Self { effects }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Build a timeline of `count` catalog effects with random probability (30-100)
    /// and max level (1-10).
    pub fn random<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut effects = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(kind) = EffectKind::ALL.choose(rng) {
                let probability = rng.gen_range(30..=100);
                let max_level = rng.gen_range(1..=10);
                effects.push(EffectInstance::new(kind.name(), probability, max_level));
            }
        }
        Self { effects }
    }

    /// Sample which effects fire for this render, preserving timeline order.
    ///
    /// The comparison is inclusive, so `probability = 0` still fires once in 101 draws.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<ResolvedStep> {
        let mut applied = Vec::new();
        for inst in &self.effects {
            if !inst.enabled {
                continue;
            }
            let roll: u8 = rng.gen_range(0..=100);
            if roll > inst.probability {
                debug!("[TIMELINE] {} rolled {} > {}, not applied", inst.name, roll, inst.probability);
                continue;
            }
            let level = rng.gen_range(1..=inst.max_level.max(1));
            applied.push(ResolvedStep {
                name: inst.name.clone(),
                level,
                params: inst.params.clone(),
            });
        }
        applied
    }
}
