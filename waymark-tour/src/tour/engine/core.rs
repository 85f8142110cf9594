//! Engine actor: single cooperative scheduling domain
//!
//! One task owns the orchestrator and drains a message channel. Commands,
//! sensor events, asset resolutions and timer firings all arrive as
//! messages, so every mutation happens synchronously within one message
//! step — the mutual-exclusion check for a found event, for instance, can
//! never interleave with another event's handling.
//!
//! Timers are spawned tasks that sleep and send a message back; they are
//! aborted on cancellation and additionally carry a generation stamp the
//! orchestrator checks, so an aborted-but-already-fired timer is still
//! harmless. Asset loads are spawned loader futures; a hung load never
//! blocks the loop.

use crate::assets::{AssetLoader, AssetOutcome};
use crate::state::SharedState;
use crate::tour::navigation::{self, NavState};
use crate::tour::orchestrator::{Effect, Orchestrator, TourCommand, TourInput};
use crate::tour::pose::PoseSource;
use crate::tour::slot::TimerAction;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use waymark_common::config::TourConfig;
use waymark_common::events::TourEvent;
use waymark_common::timing::clamp_frame_delta;
use waymark_common::Transform;

/// Messages consumed by the engine actor
pub(crate) enum EngineMessage {
    Command(TourCommand),
    Found(usize),
    Lost(usize),
    AssetResolved {
        target: usize,
        slot: Option<usize>,
        part: usize,
        outcome: AssetOutcome,
    },
    SlotTimer {
        target: usize,
        slot: usize,
        generation: u64,
        part_index: usize,
        action: TimerAction,
    },
    GraceElapsed {
        target: usize,
        generation: u64,
    },
    RetryProbe {
        target: usize,
        slot: usize,
        generation: u64,
        attempt: u32,
    },
    Tick {
        reply: oneshot::Sender<TickOutput>,
    },
    Shutdown,
}

/// Per-tick output for the renderer
#[derive(Debug, Clone, Copy)]
pub struct TickOutput {
    /// Clamped clock delta for animation-mixer updates of visible parts
    pub delta: Duration,
    /// Engaged target, if any
    pub engaged_target: Option<usize>,
    /// Smoothed transform of the engaged target (None until first seeded)
    pub transform: Option<Transform>,
}

/// The engine actor
pub(crate) struct TourEngine {
    orchestrator: Orchestrator,
    loader: Arc<dyn AssetLoader>,
    sources: Vec<Arc<dyn PoseSource>>,
    shared: Arc<SharedState>,
    msg_tx: mpsc::UnboundedSender<EngineMessage>,
    msg_rx: mpsc::UnboundedReceiver<EngineMessage>,

    /// Pending reveal/hide timer tasks per (target, slot)
    slot_timers: HashMap<(usize, usize), Vec<JoinHandle<()>>>,
    grace_timer: Option<JoinHandle<()>>,
    retry_polls: HashMap<(usize, usize), JoinHandle<()>>,

    last_tick: Option<Instant>,
    last_nav: NavState,
    last_label: String,
}

impl TourEngine {
    pub(crate) fn new(
        config: TourConfig,
        loader: Arc<dyn AssetLoader>,
        sources: Vec<Arc<dyn PoseSource>>,
        shared: Arc<SharedState>,
        msg_tx: mpsc::UnboundedSender<EngineMessage>,
        msg_rx: mpsc::UnboundedReceiver<EngineMessage>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(config),
            loader,
            sources,
            shared,
            msg_tx,
            msg_rx,
            slot_timers: HashMap::new(),
            grace_timer: None,
            retry_polls: HashMap::new(),
            last_tick: None,
            last_nav: NavState::DISABLED,
            last_label: String::new(),
        }
    }

    /// Actor loop; runs until `Shutdown` or every handle is dropped
    pub(crate) async fn run(mut self) {
        info!("tour engine starting");
        let startup = self.orchestrator.start();
        self.apply_effects(startup);
        self.refresh_derived().await;

        while let Some(message) = self.msg_rx.recv().await {
            match message {
                EngineMessage::Shutdown => break,
                EngineMessage::Tick { reply } => {
                    let output = self.handle_tick().await;
                    let _ = reply.send(output);
                    continue;
                }
                other => {
                    let input = Self::translate(other);
                    let effects = self.orchestrator.handle(input);
                    self.apply_effects(effects);
                }
            }
            self.refresh_derived().await;
        }

        info!("tour engine stopped");
        self.abort_all_timers();
    }

    fn translate(message: EngineMessage) -> TourInput {
        match message {
            EngineMessage::Command(command) => TourInput::Command(command),
            EngineMessage::Found(target) => TourInput::Found(target),
            EngineMessage::Lost(target) => TourInput::Lost(target),
            EngineMessage::AssetResolved {
                target,
                slot,
                part,
                outcome,
            } => TourInput::AssetResolved {
                target,
                slot,
                part,
                outcome,
            },
            EngineMessage::SlotTimer {
                target,
                slot,
                generation,
                part_index,
                action,
            } => TourInput::SlotTimer {
                target,
                slot,
                generation,
                part_index,
                action,
            },
            EngineMessage::GraceElapsed { target, generation } => {
                TourInput::GraceElapsed { target, generation }
            }
            EngineMessage::RetryProbe {
                target,
                slot,
                generation,
                attempt,
            } => TourInput::RetryProbe {
                target,
                slot,
                generation,
                attempt,
            },
            EngineMessage::Tick { .. } | EngineMessage::Shutdown => {
                unreachable!("handled in the actor loop")
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => self.shared.broadcast_event(event),
                Effect::ScheduleSlotTimer {
                    target,
                    slot,
                    request,
                } => {
                    let tx = self.msg_tx.clone();
                    let handle = tokio::spawn(async move {
                        sleep(Duration::from_millis(request.delay_ms)).await;
                        let _ = tx.send(EngineMessage::SlotTimer {
                            target,
                            slot,
                            generation: request.generation,
                            part_index: request.part_index,
                            action: request.action,
                        });
                    });
                    let timers = self.slot_timers.entry((target, slot)).or_default();
                    timers.retain(|t| !t.is_finished());
                    timers.push(handle);
                }
                Effect::CancelSlotTimers { target, slot } => {
                    if let Some(timers) = self.slot_timers.remove(&(target, slot)) {
                        for timer in timers {
                            timer.abort();
                        }
                    }
                    if let Some(poll) = self.retry_polls.remove(&(target, slot)) {
                        poll.abort();
                    }
                }
                Effect::ScheduleGrace {
                    target,
                    generation,
                    delay_ms,
                } => {
                    if let Some(previous) = self.grace_timer.take() {
                        previous.abort();
                    }
                    let tx = self.msg_tx.clone();
                    self.grace_timer = Some(tokio::spawn(async move {
                        sleep(Duration::from_millis(delay_ms)).await;
                        let _ = tx.send(EngineMessage::GraceElapsed { target, generation });
                    }));
                }
                Effect::CancelGrace => {
                    if let Some(timer) = self.grace_timer.take() {
                        timer.abort();
                    }
                }
                Effect::ScheduleRetry {
                    target,
                    slot,
                    generation,
                } => {
                    let tx = self.msg_tx.clone();
                    let interval = self.orchestrator.tuning().retry_interval_ms;
                    let limit = self.orchestrator.tuning().retry_limit;
                    let handle = tokio::spawn(async move {
                        for attempt in 1..=limit {
                            sleep(Duration::from_millis(interval)).await;
                            if tx
                                .send(EngineMessage::RetryProbe {
                                    target,
                                    slot,
                                    generation,
                                    attempt,
                                })
                                .is_err()
                            {
                                break;
                            }
                        }
                    });
                    if let Some(previous) = self.retry_polls.insert((target, slot), handle) {
                        previous.abort();
                    }
                }
                Effect::BeginAssetLoads { target } => self.begin_asset_loads(target),
            }
        }
    }

    /// Spawn one loader future per part and prop of a target
    fn begin_asset_loads(&mut self, target: usize) {
        let Some(target_config) = self.orchestrator.config().targets.get(target) else {
            return;
        };
        debug!(target, "spawning asset loads");

        for (part, prop) in target_config.props.iter().enumerate() {
            let future = self.loader.load(&prop.source);
            let tx = self.msg_tx.clone();
            tokio::spawn(async move {
                let outcome = future.await;
                let _ = tx.send(EngineMessage::AssetResolved {
                    target,
                    slot: None,
                    part,
                    outcome,
                });
            });
        }
        for (slot, slot_config) in target_config.slots.iter().enumerate() {
            for (part, part_config) in slot_config.parts.iter().enumerate() {
                let future = self.loader.load(&part_config.source);
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let outcome = future.await;
                    let _ = tx.send(EngineMessage::AssetResolved {
                        target,
                        slot: Some(slot),
                        part,
                        outcome,
                    });
                });
            }
        }
    }

    /// Pose sampling and smoothing for the engaged target
    async fn handle_tick(&mut self) -> TickOutput {
        let now = Instant::now();
        let max_delta = Duration::from_millis(self.orchestrator.tuning().max_frame_delta_ms);
        let delta = match self.last_tick.replace(now) {
            Some(previous) => clamp_frame_delta(now - previous, max_delta),
            None => Duration::ZERO,
        };

        let engaged = self.orchestrator.engaged();
        let mut transform = None;
        if let Some(target) = engaged {
            if self.orchestrator.is_tracked(target) {
                if let Some(source) = self.sources.get(target) {
                    let raw = source.world_transform();
                    let smoothed = self.orchestrator.smooth_pose(target, raw);
                    self.shared.set_pose(target, smoothed).await;
                    transform = Some(smoothed);
                }
            } else {
                // Frozen while untracked: republish the last smoothed pose
                transform = self.shared.get_pose(target).await;
            }
        }

        TickOutput {
            delta,
            engaged_target: engaged,
            transform,
        }
    }

    /// Recompute the derived read surface; publish only on change
    async fn refresh_derived(&mut self) {
        let nav = self
            .orchestrator
            .nav_inputs()
            .map(navigation::derive)
            .unwrap_or(NavState::DISABLED);
        let label = self.orchestrator.current_label();

        self.shared
            .set_active_target(self.orchestrator.engaged())
            .await;
        self.shared.set_scene(self.orchestrator.scene_snapshot()).await;

        if nav != self.last_nav || label != self.last_label {
            self.last_nav = nav;
            self.last_label = label.clone();
            self.shared.set_nav(nav).await;
            self.shared.set_current_label(label.clone()).await;
            self.shared.broadcast_event(TourEvent::NavigationChanged {
                prev_enabled: nav.prev_enabled,
                next_enabled: nav.next_enabled,
                info_enabled: nav.info_enabled,
                current_label: label,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    fn abort_all_timers(&mut self) {
        for (_, timers) in self.slot_timers.drain() {
            for timer in timers {
                timer.abort();
            }
        }
        if let Some(timer) = self.grace_timer.take() {
            timer.abort();
        }
        for (_, poll) in self.retry_polls.drain() {
            poll.abort();
        }
    }
}
