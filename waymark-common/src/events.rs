//! Event types for the waymark tour engine
//!
//! Provides the shared `TourEvent` definitions and the `EventBus` used to
//! broadcast them to UI and renderer observers.
//!
//! # Architecture
//!
//! Waymark uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting
//! - **Command channel** (tokio::mpsc): requests into the single engine actor
//! - **Shared state** (Arc<RwLock<T>>): read-heavy observation
//!
//! Events are serialisable so a front-end bridge (e.g. an SSE or WebView
//! layer) can forward them verbatim; the engine itself never depends on a
//! subscriber being present.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Tour event types
///
/// Broadcast via [`EventBus`] after every state-affecting step inside the
/// engine. All variants carry a UTC timestamp taken at emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TourEvent {
    /// A target claimed the session (its content is now on screen)
    ///
    /// Triggers:
    /// - Renderer: attach content group to this target's smoothed transform
    /// - UI: show navigation controls
    TargetActivated {
        target_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The engaged target released the session (content hidden, timers cancelled)
    TargetDeactivated {
        target_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pose tracking for a target was lost
    ///
    /// Informational; deactivation (if any) is reported separately.
    TargetLost {
        target_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A scene slot became the current slot of the engaged target
    SlotEntered {
        target_index: usize,
        slot_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The previously current slot was left (its timers are cancelled)
    SlotLeft {
        target_index: usize,
        slot_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A part reached its reveal offset and became visible
    ///
    /// Triggers:
    /// - Renderer: show the part and start the listed animation clips
    PartRevealed {
        target_index: usize,
        slot_index: usize,
        part_index: usize,
        part_id: Uuid,
        /// Animation clip names attached to the loaded asset, to be played once
        animations: Vec<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A temporary part reached its auto-hide deadline
    PartHidden {
        target_index: usize,
        slot_index: usize,
        part_index: usize,
        part_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every permanent part of the slot is visible; fired at most once per
    /// activation session
    SlotCompleted {
        target_index: usize,
        slot_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All slots of a target were viewed and its last slot completed
    TargetTourCompleted {
        target_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every target's tour has completed
    TourCompleted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Guidance: ask the user to point the camera at `target_index`
    ///
    /// Shown after the grace window of a completed target, and again when
    /// tracking of the expected target is lost.
    SeekTargetPrompt {
        target_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The seek prompt was dismissed (target found, or user navigated back)
    SeekTargetPromptDismissed {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The 3D guide arrow toward a target should be shown
    GuideArrowShown {
        target_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The guide arrow should be hidden
    GuideArrowHidden {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A target was sighted before its predecessor's tour completed
    ///
    /// Triggers:
    /// - UI: transient "complete the previous target first" notice
    TargetNotReady {
        target_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An asset failed to load; the part stays invisible but the slot's
    /// timeline is not blocked
    AssetLoadFailed {
        target_index: usize,
        slot_index: Option<usize>,
        part_index: usize,
        source: String,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Navigation gate or label changed
    ///
    /// Recomputed after every state-affecting message; emitted only when the
    /// derived values actually differ.
    NavigationChanged {
        prev_enabled: bool,
        next_enabled: bool,
        info_enabled: bool,
        current_label: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TourEvent {
    /// Serialise the event as a JSON object with a `"type"` tag, for
    /// front-end bridges that forward events verbatim.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Broadcast bus for [`TourEvent`]s
///
/// Wraps `tokio::sync::broadcast`, providing:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TourEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Events beyond the capacity evict the oldest buffered event; lagging
    /// subscribers observe a `Lagged` error and continue from the newest.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` otherwise.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TourEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<TourEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anybody is listening
    ///
    /// The engine uses this for all emissions: observers are optional.
    pub fn emit_lossy(&self, event: TourEvent) {
        let _ = self.tx.send(event);
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
