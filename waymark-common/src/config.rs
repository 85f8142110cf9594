//! Tour configuration model
//!
//! The static configuration table of targets, slots, parts and timing that
//! the engine consumes at construction time. This is the system's only
//! "wire format": a TOML document (or the equivalent structures built in
//! code) describing what appears where and when.
//!
//! Timing tables are data, never code: the scheduler applies whatever
//! numbers the configuration carries, and divergent tunings between content
//! variants live entirely in their TOML files.
//!
//! Missing timing fields default to 0 and validation produces warnings
//! rather than errors — a malformed entry degrades to "appears immediately,
//! stays forever", never to a failed session.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete tour definition: engine tuning plus an ordered list of targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourConfig {
    /// Engine tuning knobs; every field has a default
    #[serde(default)]
    pub tuning: TuningConfig,

    /// Targets in tour order; progression is gated target-by-target
    pub targets: Vec<TargetConfig>,
}

/// Engine tuning knobs with production defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Delay between a target's tour completing and the seek prompt for the
    /// next target appearing (milliseconds)
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,

    /// Interval of the diagnostic start-sequence retry poll (milliseconds)
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Number of retry polls before giving up silently
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Constant per-tick blend factor for pose smoothing
    ///
    /// Lower is smoother but lags more; not scaled by frame delta.
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f32,

    /// Upper clamp applied to the frame delta before it is handed to
    /// animation consumers (milliseconds)
    #[serde(default = "default_max_frame_delta_ms")]
    pub max_frame_delta_ms: u64,

    /// Event broadcast channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_grace_delay_ms() -> u64 {
    2000
}
fn default_retry_interval_ms() -> u64 {
    500
}
fn default_retry_limit() -> u32 {
    10
}
fn default_smoothing_alpha() -> f32 {
    0.08
}
fn default_max_frame_delta_ms() -> u64 {
    100
}
fn default_event_capacity() -> usize {
    256
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            grace_delay_ms: default_grace_delay_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            retry_limit: default_retry_limit(),
            smoothing_alpha: default_smoothing_alpha(),
            max_frame_delta_ms: default_max_frame_delta_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// One physical marker and the ordered scenes it reveals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Human-readable name, used in logs and labels
    pub name: String,

    /// Static fixtures (occluder stand-ins, backdrops) visible while this
    /// target is engaged; never scheduled
    #[serde(default)]
    pub props: Vec<PropConfig>,

    /// Scene slots in tour order
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
}

/// One composite scene: an ordered set of parts with a reveal timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Single-visible semantics: revealing a part hides every other part
    #[serde(default)]
    pub exclusive: bool,

    /// Restart the timeline from scratch whenever the slot is entered
    #[serde(default = "default_true")]
    pub reset_on_enter: bool,

    /// Hide all parts when the slot is left
    #[serde(default = "default_true")]
    pub reset_on_leave: bool,

    /// Parts in reveal order
    #[serde(default)]
    pub parts: Vec<PartConfig>,
}

/// One schedulable sub-asset inside a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartConfig {
    /// Content handle resolved by the asset loader (renderer-opaque)
    pub source: String,

    /// Nominal reveal timestamp in milliseconds; the schedule is normalised
    /// so the slot's first part defines t=0
    #[serde(default)]
    pub reveal_at_ms: u64,

    /// How long the part stays visible; 0 means forever
    #[serde(default)]
    pub hide_after_ms: u64,
}

/// A static per-target fixture outside the reveal timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropConfig {
    /// Content handle resolved by the asset loader
    pub source: String,
}

fn default_true() -> bool {
    true
}

impl TourConfig {
    /// Parse a tour definition from a TOML string
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: TourConfig = toml::from_str(input)?;
        Ok(config)
    }

    /// Load a tour definition from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        tracing::debug!(path = %path.as_ref().display(), "loading tour configuration");
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Non-fatal validation: returns human-readable warnings
    ///
    /// Nothing here is an error — an empty slot is vacuously complete, an
    /// empty target trivially completes its tour — but each warning marks a
    /// configuration that is probably not what the author intended.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.targets.is_empty() {
            warnings.push("tour has no targets".to_string());
        }
        if self.tuning.smoothing_alpha <= 0.0 || self.tuning.smoothing_alpha > 1.0 {
            warnings.push(format!(
                "smoothing_alpha {} outside (0, 1]; smoothing will misbehave",
                self.tuning.smoothing_alpha
            ));
        }

        for (t, target) in self.targets.iter().enumerate() {
            if target.slots.is_empty() {
                warnings.push(format!(
                    "target {} ({:?}) has no slots; its tour completes immediately",
                    t, target.name
                ));
            }
            for (s, slot) in target.slots.iter().enumerate() {
                if slot.parts.is_empty() {
                    warnings.push(format!(
                        "target {} slot {} has no parts; it is vacuously complete",
                        t, s
                    ));
                }
                let permanent = slot.parts.iter().filter(|p| p.hide_after_ms == 0).count();
                if !slot.parts.is_empty() && permanent == 0 {
                    warnings.push(format!(
                        "target {} slot {} has only temporary parts; it completes as soon as its sequence starts",
                        t, s
                    ));
                }
            }
        }

        warnings
    }

    /// Number of configured targets
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Fetch a target's configuration by index
    pub fn target(&self, index: usize) -> Result<&TargetConfig> {
        self.targets
            .get(index)
            .ok_or_else(|| Error::InvalidInput(format!("no target at index {}", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[targets]]
        name = "street-north"

        [[targets.slots]]
        [[targets.slots.parts]]
        source = "scenes/1/sun.glb"

        [[targets.slots.parts]]
        source = "scenes/1/house.glb"
        reveal_at_ms = 2000
    "#;

    #[test]
    fn test_minimal_parse_and_defaults() {
        let config = TourConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.target_count(), 1);
        assert_eq!(config.tuning.grace_delay_ms, 2000);
        assert_eq!(config.tuning.retry_interval_ms, 500);
        assert_eq!(config.tuning.retry_limit, 10);
        assert!((config.tuning.smoothing_alpha - 0.08).abs() < f32::EPSILON);
        assert_eq!(config.tuning.max_frame_delta_ms, 100);

        let slot = &config.targets[0].slots[0];
        assert!(!slot.exclusive);
        assert!(slot.reset_on_enter);
        assert!(slot.reset_on_leave);

        // Missing timing entries default to 0
        assert_eq!(slot.parts[0].reveal_at_ms, 0);
        assert_eq!(slot.parts[0].hide_after_ms, 0);
        assert_eq!(slot.parts[1].reveal_at_ms, 2000);
    }

    #[test]
    fn test_tuning_overrides() {
        let input = r#"
            [tuning]
            grace_delay_ms = 150
            retry_interval_ms = 20
            retry_limit = 3

            [[targets]]
            name = "only"
        "#;
        let config = TourConfig::from_toml_str(input).unwrap();
        assert_eq!(config.tuning.grace_delay_ms, 150);
        assert_eq!(config.tuning.retry_interval_ms, 20);
        assert_eq!(config.tuning.retry_limit, 3);
        // Unspecified knobs keep their defaults
        assert_eq!(config.tuning.max_frame_delta_ms, 100);
    }

    #[test]
    fn test_validate_empty_structures() {
        let input = r#"
            [[targets]]
            name = "bare"

            [[targets]]
            name = "with-empty-slot"
            [[targets.slots]]
        "#;
        let config = TourConfig::from_toml_str(input).unwrap();
        let warnings = config.validate();

        assert!(warnings.iter().any(|w| w.contains("has no slots")));
        assert!(warnings.iter().any(|w| w.contains("has no parts")));
    }

    #[test]
    fn test_validate_only_temporary_parts() {
        let input = r#"
            [[targets]]
            name = "flash"
            [[targets.slots]]
            [[targets.slots.parts]]
            source = "flash.glb"
            hide_after_ms = 500
        "#;
        let config = TourConfig::from_toml_str(input).unwrap();
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("only temporary parts")));
    }

    #[test]
    fn test_validate_clean_config() {
        let config = TourConfig::from_toml_str(MINIMAL).unwrap();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_target_lookup() {
        let config = TourConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.target(0).unwrap().name, "street-north");
        assert!(config.target(5).is_err());
    }

    #[test]
    fn test_props_parse() {
        let input = r#"
            [[targets]]
            name = "street"
            [[targets.props]]
            source = "occluders/block1.glb"
            [[targets.props]]
            source = "occluders/block2.glb"
        "#;
        let config = TourConfig::from_toml_str(input).unwrap();
        assert_eq!(config.targets[0].props.len(), 2);
    }
}
