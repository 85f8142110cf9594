//! Per-target exponential pose filter
//!
//! Raw marker poses jitter frame to frame; content placed directly on them
//! shivers. Each target owns one smoother that blends the published
//! transform toward the raw sample with a constant per-tick factor. The
//! factor is deliberately not delta-scaled — a constant blend trades
//! perfect delta-independence for simplicity, and the frame delta is
//! clamped upstream so a stalled tick cannot replay as one giant step.
//!
//! Seeding: the first sample after a Lost→Found transition is assigned
//! outright, never blended, so content does not visibly fly in from the
//! smoother's stale position. While the target is inactive the smoother is
//! not updated at all — no stale extrapolation can leak into rendering.

use waymark_common::Transform;

/// External pose provider, one per target
///
/// Found/Lost transitions arrive separately through the engine handle; this
/// trait is queried once per tick, and only while its target is engaged and
/// tracked.
pub trait PoseSource: Send + Sync + 'static {
    /// Current raw world transform of the tracked marker
    fn world_transform(&self) -> Transform;
}

/// Exponential smoother for one target's world transform
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    alpha: f32,
    smoothed: Transform,
    seeded: bool,
}

impl PoseSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            smoothed: Transform::IDENTITY,
            seeded: false,
        }
    }

    /// Assign the raw pose outright (Lost→Found transition)
    pub fn seed(&mut self, raw: Transform) {
        self.smoothed = raw;
        self.seeded = true;
    }

    /// Mark the smoother unseeded so the next sample assigns instead of
    /// blending (called on Lost)
    pub fn invalidate(&mut self) {
        self.seeded = false;
    }

    /// Blend toward the raw sample and return the published transform
    ///
    /// Seeds automatically if tracking was (re)acquired since the last
    /// update.
    pub fn update(&mut self, raw: Transform) -> Transform {
        if !self.seeded {
            self.seed(raw);
        } else {
            self.smoothed = self.smoothed.blend_toward(&raw, self.alpha);
        }
        self.smoothed
    }

    /// Last published transform without updating
    pub fn current(&self) -> Transform {
        self.smoothed
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}
