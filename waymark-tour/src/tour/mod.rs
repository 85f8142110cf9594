//! Tour state machines and the engine that drives them
//!
//! Dependency order, leaves first: `part` → `slot` → `target` →
//! `orchestrator`, with `navigation` (pure gate derivation) and `pose`
//! (per-target smoothing) alongside, and `engine` as the async shell tying
//! everything to tokio timers, channels and the event bus.

pub mod engine;
pub mod navigation;
pub mod orchestrator;
pub mod part;
pub mod pose;
pub mod slot;
pub mod target;

pub use engine::{TickOutput, Tour};
pub use navigation::{NavInputs, NavState};
pub use orchestrator::{Orchestrator, TourCommand, TourPhase, TransitionStage};
pub use pose::{PoseSmoother, PoseSource};
pub use slot::{SceneSlot, SlotState};
pub use target::TargetController;
