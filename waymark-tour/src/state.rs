//! Shared observable state
//!
//! Thread-safe read surface for the renderer and UI. The engine actor is
//! the only writer; readers never block it for long (RwLock with rare
//! writes) and event-driven consumers subscribe to the broadcast bus
//! instead of polling.

use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;
use waymark_common::events::{EventBus, TourEvent};
use waymark_common::Transform;

use crate::tour::navigation::NavState;

/// Renderer-facing view of one part (or prop: `slot_index == None`)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PartView {
    pub target_index: usize,
    pub slot_index: Option<usize>,
    pub part_index: usize,
    pub part_id: Uuid,
    /// Content handle, as given to the asset loader
    pub source: String,
    pub visible: bool,
    pub animations: Vec<String>,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    /// Navigation gate, recomputed after every engine message
    nav: RwLock<NavState>,

    /// HUD label ("k/N" style)
    current_label: RwLock<String>,

    /// Index of the engaged target, if any
    active_target: RwLock<Option<usize>>,

    /// Smoothed world transform per target, updated on tick
    poses: RwLock<HashMap<usize, Transform>>,

    /// Full visibility snapshot (parts and props of initialized targets)
    scene: RwLock<Vec<PartView>>,

    /// Event broadcaster
    event_bus: EventBus,
}

impl SharedState {
    pub fn new(event_capacity: usize) -> Self {
        Self {
            nav: RwLock::new(NavState::DISABLED),
            current_label: RwLock::new(String::new()),
            active_target: RwLock::new(None),
            poses: RwLock::new(HashMap::new()),
            scene: RwLock::new(Vec::new()),
            event_bus: EventBus::new(event_capacity),
        }
    }

    /// Broadcast an event to all subscribers (lossy; observers are optional)
    pub fn broadcast_event(&self, event: TourEvent) {
        self.event_bus.emit_lossy(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<TourEvent> {
        self.event_bus.subscribe()
    }

    pub async fn get_nav(&self) -> NavState {
        *self.nav.read().await
    }

    pub async fn set_nav(&self, nav: NavState) {
        *self.nav.write().await = nav;
    }

    pub async fn get_current_label(&self) -> String {
        self.current_label.read().await.clone()
    }

    pub async fn set_current_label(&self, label: String) {
        *self.current_label.write().await = label;
    }

    pub async fn get_active_target(&self) -> Option<usize> {
        *self.active_target.read().await
    }

    pub async fn set_active_target(&self, target: Option<usize>) {
        *self.active_target.write().await = target;
    }

    /// Smoothed transform of a target (None until first seeded)
    pub async fn get_pose(&self, target: usize) -> Option<Transform> {
        self.poses.read().await.get(&target).copied()
    }

    pub async fn set_pose(&self, target: usize, transform: Transform) {
        self.poses.write().await.insert(target, transform);
    }

    /// Current visibility snapshot
    pub async fn get_scene(&self) -> Vec<PartView> {
        self.scene.read().await.clone()
    }

    pub async fn set_scene(&self, scene: Vec<PartView>) {
        *self.scene.write().await = scene;
    }

    /// Convenience: sources of currently visible parts
    pub async fn visible_sources(&self) -> Vec<String> {
        self.scene
            .read()
            .await
            .iter()
            .filter(|view| view.visible)
            .map(|view| view.source.clone())
            .collect()
    }
}
