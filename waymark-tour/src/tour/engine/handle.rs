//! Public tour handle
//!
//! [`Tour::launch`] validates the configuration, spawns the engine actor
//! and returns a cheap cloneable handle. All methods forward messages into
//! the actor; none of them blocks on tour logic.

use crate::assets::AssetLoader;
use crate::error::{Error, Result};
use crate::state::SharedState;
use crate::tour::engine::core::{EngineMessage, TickOutput, TourEngine};
use crate::tour::orchestrator::TourCommand;
use crate::tour::pose::PoseSource;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::warn;
use waymark_common::config::TourConfig;
use waymark_common::events::TourEvent;

/// Handle to a running tour engine
///
/// Cloning is cheap; every clone talks to the same engine actor. Dropping
/// all clones stops the actor.
#[derive(Clone)]
pub struct Tour {
    tx: mpsc::UnboundedSender<EngineMessage>,
    shared: Arc<SharedState>,
}

impl Tour {
    /// Validate the configuration and launch the engine actor
    ///
    /// `sources` supplies one pose source per configured target, in target
    /// order. Must be called from within a tokio runtime.
    pub fn launch(
        config: TourConfig,
        loader: Arc<dyn AssetLoader>,
        sources: Vec<Arc<dyn PoseSource>>,
    ) -> Result<Self> {
        if sources.len() != config.targets.len() {
            return Err(Error::Config(format!(
                "{} pose sources supplied for {} targets",
                sources.len(),
                config.targets.len()
            )));
        }
        for warning in config.validate() {
            warn!("tour configuration: {}", warning);
        }

        let shared = Arc::new(SharedState::new(config.tuning.event_capacity));
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = TourEngine::new(config, loader, sources, shared.clone(), tx.clone(), rx);
        tokio::spawn(engine.run());

        Ok(Self { tx, shared })
    }

    fn send(&self, message: EngineMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| Error::EngineStopped("engine actor is gone".to_string()))
    }

    /// Navigate to the next scene (or advance the tour on a completed
    /// final scene)
    pub fn go_next(&self) -> Result<()> {
        self.send(EngineMessage::Command(TourCommand::Next))
    }

    /// Navigate to the previous scene; during a handoff window this
    /// cancels the handoff and re-activates the previous target
    pub fn go_prev(&self) -> Result<()> {
        self.send(EngineMessage::Command(TourCommand::Prev))
    }

    /// Restart the current scene's timeline from t=0
    pub fn replay(&self) -> Result<()> {
        self.send(EngineMessage::Command(TourCommand::Replay))
    }

    /// Pose source reported `target` as found
    pub fn target_found(&self, target: usize) -> Result<()> {
        self.send(EngineMessage::Found(target))
    }

    /// Pose source lost `target`
    pub fn target_lost(&self, target: usize) -> Result<()> {
        self.send(EngineMessage::Lost(target))
    }

    /// Render tick: samples and smooths the engaged target's pose, returns
    /// the clamped clock delta for animation-mixer updates
    pub async fn tick(&self) -> Result<TickOutput> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineMessage::Tick { reply })?;
        rx.await
            .map_err(|_| Error::EngineStopped("engine actor dropped the tick".to_string()))
    }

    /// Shared read surface (navigation gate, label, poses, scene snapshot)
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    /// Subscribe to the broadcast event stream
    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.shared.subscribe_events()
    }

    /// Stop the engine actor
    pub fn shutdown(&self) {
        let _ = self.tx.send(EngineMessage::Shutdown);
    }
}
