//! One schedulable sub-asset inside a scene slot

use crate::assets::{AssetOutcome, LoadedAsset};
use tracing::warn;
use uuid::Uuid;

/// Resolution state of a part's asset load
///
/// Both `Loaded` and `Failed` count as resolved: a failed part never becomes
/// visible but does not block the slot's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Load spawned (or about to be), outcome unknown
    Pending,
    /// Asset resolved successfully
    Loaded(LoadedAsset),
    /// Load failed; the part stays perpetually invisible
    Failed,
}

/// One schedulable sub-asset with a reveal offset and optional auto-hide
///
/// Owned exclusively by its slot; `visible` is toggled only by the owning
/// slot's sequencing logic.
#[derive(Debug, Clone)]
pub struct Part {
    /// Stable identity, minted at registration
    pub id: Uuid,

    /// Content handle resolved by the asset loader
    pub source: String,

    /// Reveal delay relative to the slot's activation instant (already
    /// normalised against the slot's first part)
    pub reveal_offset_ms: u64,

    /// Auto-hide duration; 0 means the part is permanent
    pub hide_after_ms: u64,

    load: LoadState,
    visible: bool,
}

impl Part {
    pub fn new(source: String, reveal_offset_ms: u64, hide_after_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            reveal_offset_ms,
            hide_after_ms,
            load: LoadState::Pending,
            visible: false,
        }
    }

    /// Record the terminal outcome of this part's asset load
    ///
    /// Idempotent: a duplicate resolution is logged and dropped so a racing
    /// loader cannot flip a failed part back to loaded (or vice versa).
    pub fn resolve(&mut self, outcome: AssetOutcome) {
        if self.is_resolved() {
            warn!(source = %self.source, "duplicate asset resolution ignored");
            return;
        }
        self.load = match outcome {
            Ok(asset) => LoadState::Loaded(asset),
            Err(_) => LoadState::Failed,
        };
    }

    /// Load reached a terminal state (success or failure)
    pub fn is_resolved(&self) -> bool {
        !matches!(self.load, LoadState::Pending)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load, LoadState::Loaded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.load, LoadState::Failed)
    }

    /// Permanent parts (no auto-hide) gate slot completion
    pub fn is_permanent(&self) -> bool {
        self.hide_after_ms == 0
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Animation clip names of the loaded asset (empty until loaded)
    pub fn animations(&self) -> &[String] {
        match &self.load {
            LoadState::Loaded(asset) => &asset.animations,
            _ => &[],
        }
    }
}
