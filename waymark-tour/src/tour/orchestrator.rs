//! Multi-target orchestration state machine
//!
//! Coordinates the per-target controllers: mutual exclusion between
//! targets, the completion → grace → seek-prompt → next-target handoff
//! protocol, lazy construction of later targets, and routing of commands,
//! sensor events, timers and asset resolutions to the right controller.
//!
//! The orchestrator is a reducer: [`Orchestrator::handle`] consumes one
//! [`TourInput`] and returns the [`Effect`]s the engine shell must execute
//! (timers to schedule or cancel, asset loads to begin, events to emit).
//! All tour state lives here and mutates only inside `handle`, so every
//! ordering decision — can this found event activate, is this timer stale,
//! has this completion already been handled — is taken atomically within a
//! single message step.
//!
//! Phase model: instead of loose booleans, the tour is always in exactly
//! one phase —
//!
//! ```text
//! TargetActive { target }                      // touring one target
//! Transitioning { from, to, stage: Grace }     // completed, grace delay running
//! Transitioning { from, to, stage: Awaiting }  // prompt shown, waiting for `to`
//! ```
//!
//! — and the engaged controller is an `Option<usize>`, so "at most one
//! target active" holds by construction.

use crate::assets::AssetOutcome;
use crate::state::PartView;
use crate::tour::navigation::NavInputs;
use crate::tour::part::Part;
use crate::tour::pose::PoseSmoother;
use crate::tour::slot::{SlotEffect, SlotSignal, TimerAction, TimerRequest};
use crate::tour::target::{TargetController, TargetEffect};
use tracing::{debug, info, warn};
use waymark_common::config::{TourConfig, TuningConfig};
use waymark_common::events::TourEvent;
use waymark_common::Transform;

/// User navigation commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourCommand {
    Next,
    Prev,
    Replay,
}

/// Everything that can drive the orchestrator
#[derive(Debug, Clone)]
pub(crate) enum TourInput {
    /// Pose source reported the target as found
    Found(usize),
    /// Pose source lost the target
    Lost(usize),
    /// One asset load reached a terminal outcome (`slot: None` = prop)
    AssetResolved {
        target: usize,
        slot: Option<usize>,
        part: usize,
        outcome: AssetOutcome,
    },
    /// A scheduled reveal/hide timer fired
    SlotTimer {
        target: usize,
        slot: usize,
        generation: u64,
        part_index: usize,
        action: TimerAction,
    },
    /// The post-completion grace delay elapsed
    GraceElapsed { target: usize, generation: u64 },
    /// Diagnostic retry poll tick
    RetryProbe {
        target: usize,
        slot: usize,
        generation: u64,
        attempt: u32,
    },
    /// User command
    Command(TourCommand),
}

/// Instructions for the engine shell
#[derive(Debug, Clone)]
pub(crate) enum Effect {
    /// Broadcast an event
    Emit(TourEvent),
    /// Spawn a timer that sends `SlotTimer` back after `request.delay_ms`
    ScheduleSlotTimer {
        target: usize,
        slot: usize,
        request: TimerRequest,
    },
    /// Abort every pending timer task for the slot
    CancelSlotTimers { target: usize, slot: usize },
    /// Spawn the grace-delay timer
    ScheduleGrace {
        target: usize,
        generation: u64,
        delay_ms: u64,
    },
    /// Abort the pending grace timer
    CancelGrace,
    /// Spawn the bounded diagnostic retry poll for a slot
    ScheduleRetry {
        target: usize,
        slot: usize,
        generation: u64,
    },
    /// Spawn asset loads for every part and prop of the target
    BeginAssetLoads { target: usize },
}

/// Handoff sub-state between two targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStage {
    /// Completed; grace delay running, content still up
    Grace,
    /// Prompt shown; waiting for the next target to be found
    Awaiting,
}

/// The tour is always in exactly one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourPhase {
    TargetActive {
        target: usize,
    },
    Transitioning {
        from: usize,
        to: usize,
        stage: TransitionStage,
    },
}

/// Per-target bookkeeping
struct TargetRecord {
    /// Built lazily when the predecessor completes (target 0 at startup)
    controller: Option<TargetController>,
    /// Static fixtures visible while the target is engaged
    props: Vec<Part>,
    smoother: PoseSmoother,
    /// Pose source currently reports the target in view
    tracked: bool,
    /// Tour completion flag gating the successor's activation
    completed: bool,
    /// Completion protocol already ran for this target
    prompt_shown: bool,
    initialized: bool,
}

/// Multi-target tour coordinator
pub struct Orchestrator {
    config: TourConfig,
    records: Vec<TargetRecord>,
    phase: TourPhase,
    engaged: Option<usize>,
    grace_generation: u64,
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

impl Orchestrator {
    pub fn new(config: TourConfig) -> Self {
        let alpha = config.tuning.smoothing_alpha;
        let records = config
            .targets
            .iter()
            .map(|_| TargetRecord {
                controller: None,
                props: Vec::new(),
                smoother: PoseSmoother::new(alpha),
                tracked: false,
                completed: false,
                prompt_shown: false,
                initialized: false,
            })
            .collect();

        Self {
            config,
            records,
            phase: TourPhase::TargetActive { target: 0 },
            engaged: None,
            grace_generation: 0,
        }
    }

    /// Startup: only the first target is constructed and starts loading
    pub(crate) fn start(&mut self) -> Vec<Effect> {
        if self.records.is_empty() {
            warn!("tour has no targets; nothing to do");
            return Vec::new();
        }
        self.initialize_target(0)
    }

    /// Reduce one input into effects
    pub(crate) fn handle(&mut self, input: TourInput) -> Vec<Effect> {
        match input {
            TourInput::Found(target) => self.handle_found(target),
            TourInput::Lost(target) => self.handle_lost(target),
            TourInput::AssetResolved {
                target,
                slot,
                part,
                outcome,
            } => self.handle_asset_resolved(target, slot, part, outcome),
            TourInput::SlotTimer {
                target,
                slot,
                generation,
                part_index,
                action,
            } => self.handle_slot_timer(target, slot, generation, part_index, action),
            TourInput::GraceElapsed { target, generation } => {
                self.handle_grace_elapsed(target, generation)
            }
            TourInput::RetryProbe {
                target,
                slot,
                generation,
                attempt,
            } => self.handle_retry_probe(target, slot, generation, attempt),
            TourInput::Command(command) => self.handle_command(command),
        }
    }

    // ------------------------------------------------------------------
    // Sensor events
    // ------------------------------------------------------------------

    fn handle_found(&mut self, target: usize) -> Vec<Effect> {
        if target >= self.records.len() {
            warn!(target, "found event for unknown target");
            return Vec::new();
        }

        if self.engaged == Some(target) {
            // Duplicate found, or reacquired without an intervening lost:
            // refresh tracking and give the current sequence an idempotent kick
            self.records[target].tracked = true;
            self.records[target].smoother.invalidate();
            let tracked = true;
            return self.wrap(target, |ctl| ctl.start_current_sequence_if_ready(tracked));
        }

        let expected = self.expected_target();
        if target != expected {
            if !self.eligible(target) {
                info!(target, "target sighted before its predecessor completed");
                return vec![Effect::Emit(TourEvent::TargetNotReady {
                    target_index: target,
                    timestamp: now(),
                })];
            }
            debug!(target, expected, "found ignored; not the expected target");
            return Vec::new();
        }

        if let TourPhase::Transitioning {
            stage: TransitionStage::Grace,
            ..
        } = self.phase
        {
            // A marker glimpsed during the grace window must not
            // double-activate; the user is prompted after the delay
            debug!(target, "found during grace window; ignored");
            return Vec::new();
        }

        let mut effects = Vec::new();
        if let TourPhase::Transitioning {
            stage: TransitionStage::Awaiting,
            ..
        } = self.phase
        {
            effects.push(Effect::Emit(TourEvent::SeekTargetPromptDismissed {
                timestamp: now(),
            }));
            effects.push(Effect::Emit(TourEvent::GuideArrowHidden { timestamp: now() }));
        }

        self.records[target].tracked = true;
        effects.extend(self.engage(target));
        effects
    }

    fn handle_lost(&mut self, target: usize) -> Vec<Effect> {
        if target >= self.records.len() {
            warn!(target, "lost event for unknown target");
            return Vec::new();
        }

        self.records[target].tracked = false;
        self.records[target].smoother.invalidate();
        let mut effects = vec![Effect::Emit(TourEvent::TargetLost {
            target_index: target,
            timestamp: now(),
        })];

        if self.engaged != Some(target) {
            return effects;
        }

        if let TourPhase::Transitioning {
            from,
            stage: TransitionStage::Grace,
            ..
        } = self.phase
        {
            if from == target {
                // Handoff imminent; the grace expiry will deactivate and
                // prompt, so losing tracking now changes nothing visible
                debug!(target, "lost during grace window; handoff pending");
                return effects;
            }
        }

        effects.extend(self.disengage(target));
        effects.push(Effect::Emit(TourEvent::SeekTargetPrompt {
            target_index: target,
            timestamp: now(),
        }));
        effects
    }

    // ------------------------------------------------------------------
    // Asset resolution
    // ------------------------------------------------------------------

    fn handle_asset_resolved(
        &mut self,
        target: usize,
        slot: Option<usize>,
        part: usize,
        outcome: AssetOutcome,
    ) -> Vec<Effect> {
        if target >= self.records.len() {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if let Err(err) = &outcome {
            warn!(target, ?slot, part, error = %err.message, "asset load failed");
            effects.push(Effect::Emit(TourEvent::AssetLoadFailed {
                target_index: target,
                slot_index: slot,
                part_index: part,
                source: err.source_handle.clone(),
                error: err.message.clone(),
                timestamp: now(),
            }));
        }

        match slot {
            None => {
                let engaged_here = self.engaged == Some(target);
                if let Some(prop) = self.records[target].props.get_mut(part) {
                    prop.resolve(outcome);
                    if engaged_here && prop.is_loaded() {
                        prop.set_visible(true);
                    }
                }
            }
            Some(slot_index) => {
                let newly_resolved = self.records[target]
                    .controller
                    .as_mut()
                    .and_then(|ctl| ctl.slot_mut(slot_index))
                    .map(|s| s.resolve_part(part, outcome))
                    .unwrap_or(false);

                // Event-driven readiness: the resolution that completes the
                // load set starts the sequence, no polling required
                if newly_resolved && self.engaged == Some(target) && self.records[target].tracked {
                    let is_current = self.records[target]
                        .controller
                        .as_ref()
                        .map(|ctl| ctl.current_index() == slot_index)
                        .unwrap_or(false);
                    if is_current {
                        debug!(target, slot_index, "load set resolved; starting sequence");
                        effects.extend(
                            self.wrap(target, |ctl| ctl.start_current_sequence_if_ready(true)),
                        );
                    }
                }
            }
        }
        effects
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn handle_slot_timer(
        &mut self,
        target: usize,
        slot: usize,
        generation: u64,
        part_index: usize,
        action: TimerAction,
    ) -> Vec<Effect> {
        if target >= self.records.len() {
            return Vec::new();
        }
        self.wrap(target, |ctl| {
            ctl.slot_mut(slot)
                .map(|s| {
                    s.handle_timer(generation, part_index, action)
                        .into_iter()
                        .map(|effect| TargetEffect::Slot {
                            slot_index: slot,
                            effect,
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn handle_grace_elapsed(&mut self, target: usize, generation: u64) -> Vec<Effect> {
        if generation != self.grace_generation {
            debug!(target, generation, "stale grace timer dropped");
            return Vec::new();
        }
        let TourPhase::Transitioning {
            from,
            to,
            stage: TransitionStage::Grace,
        } = self.phase
        else {
            return Vec::new();
        };
        if from != target {
            return Vec::new();
        }
        self.perform_handoff(from, to)
    }

    fn handle_retry_probe(
        &mut self,
        target: usize,
        slot: usize,
        generation: u64,
        attempt: u32,
    ) -> Vec<Effect> {
        if self.engaged != Some(target) {
            return Vec::new();
        }
        let Some(ctl) = self.records[target].controller.as_ref() else {
            return Vec::new();
        };
        if ctl.current_index() != slot {
            return Vec::new();
        }
        let Some(slot_ref) = ctl.slot(slot) else {
            return Vec::new();
        };
        if slot_ref.generation() != generation {
            return Vec::new();
        }
        if slot_ref.started_this_session() {
            return Vec::new();
        }

        let tracked = self.records[target].tracked;
        let effects = self.wrap(target, |ctl| ctl.start_current_sequence_if_ready(tracked));
        if effects.is_empty() && attempt >= self.config.tuning.retry_limit {
            // Not fatal: content appears once the asset arrives and the
            // resolution message fires the idempotent start
            debug!(
                target,
                slot, attempt, "retry poll exhausted; waiting on asset resolution"
            );
        }
        effects
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn handle_command(&mut self, command: TourCommand) -> Vec<Effect> {
        match command {
            TourCommand::Next => match self.phase {
                TourPhase::Transitioning {
                    from,
                    to,
                    stage: TransitionStage::Grace,
                } => {
                    // Explicit advance: skip the rest of the grace delay
                    info!(from, to, "user advanced before grace expiry");
                    self.grace_generation += 1;
                    let mut effects = vec![Effect::CancelGrace];
                    effects.extend(self.perform_handoff(from, to));
                    effects
                }
                TourPhase::Transitioning {
                    stage: TransitionStage::Awaiting,
                    ..
                } => Vec::new(),
                TourPhase::TargetActive { target } if self.engaged == Some(target) => {
                    let tracked = self.records[target].tracked;
                    self.wrap(target, |ctl| ctl.go_next(tracked))
                }
                _ => Vec::new(),
            },
            TourCommand::Prev => match self.phase {
                TourPhase::Transitioning { from, stage, .. } => {
                    let mut effects = self.cancel_transition(from, stage);
                    let tracked = self.records[from].tracked;
                    effects.extend(self.wrap(from, |ctl| ctl.go_prev(tracked)));
                    effects
                }
                TourPhase::TargetActive { target } if self.engaged == Some(target) => {
                    let tracked = self.records[target].tracked;
                    self.wrap(target, |ctl| ctl.go_prev(tracked))
                }
                _ => Vec::new(),
            },
            TourCommand::Replay => match self.phase {
                TourPhase::Transitioning { from, stage, .. } => {
                    let mut effects = self.cancel_transition(from, stage);
                    let tracked = self.records[from].tracked;
                    effects.extend(self.wrap(from, |ctl| ctl.replay(tracked)));
                    effects
                }
                TourPhase::TargetActive { target } if self.engaged == Some(target) => {
                    let tracked = self.records[target].tracked;
                    self.wrap(target, |ctl| ctl.replay(tracked))
                }
                _ => Vec::new(),
            },
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Engage a target: it claims the screen and becomes the phase target
    fn engage(&mut self, target: usize) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.records[target].initialized {
            effects.extend(self.initialize_target(target));
        }

        self.engaged = Some(target);
        self.phase = TourPhase::TargetActive { target };
        self.records[target].smoother.invalidate();

        for (i, record) in self.records.iter_mut().enumerate() {
            for prop in &mut record.props {
                prop.set_visible(i == target && prop.is_loaded());
            }
        }

        info!(target, "target activated");
        effects.push(Effect::Emit(TourEvent::TargetActivated {
            target_index: target,
            timestamp: now(),
        }));

        let tracked = self.records[target].tracked;
        effects.extend(self.wrap(target, |ctl| ctl.activate(tracked)));
        effects.extend(self.maybe_schedule_retry(target));
        effects.extend(self.maybe_complete(target));
        effects
    }

    /// The engaged target releases the screen
    fn disengage(&mut self, target: usize) -> Vec<Effect> {
        let mut effects = self.wrap(target, |ctl| ctl.deactivate());
        for prop in &mut self.records[target].props {
            prop.set_visible(false);
        }
        self.engaged = None;
        info!(target, "target deactivated");
        effects.push(Effect::Emit(TourEvent::TargetDeactivated {
            target_index: target,
            timestamp: now(),
        }));
        effects
    }

    /// Grace expiry (or explicit advance): retire `from`, prompt for `to`
    fn perform_handoff(&mut self, from: usize, to: usize) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.engaged == Some(from) {
            effects.extend(self.disengage(from));
        }
        self.phase = TourPhase::Transitioning {
            from,
            to,
            stage: TransitionStage::Awaiting,
        };
        info!(from, to, "tour handoff: awaiting next target");
        effects.push(Effect::Emit(TourEvent::SeekTargetPrompt {
            target_index: to,
            timestamp: now(),
        }));
        effects.push(Effect::Emit(TourEvent::GuideArrowShown {
            target_index: to,
            timestamp: now(),
        }));
        effects.extend(self.initialize_target(to));
        effects
    }

    /// `prev`/`replay` during the handoff window: the grace window is
    /// advisory, not a hard lock
    fn cancel_transition(&mut self, from: usize, stage: TransitionStage) -> Vec<Effect> {
        info!(from, ?stage, "handoff cancelled by user navigation");
        self.grace_generation += 1;
        let mut effects = vec![Effect::CancelGrace];
        self.records[from].prompt_shown = false;
        self.records[from].completed = false;

        if stage == TransitionStage::Awaiting {
            effects.push(Effect::Emit(TourEvent::SeekTargetPromptDismissed {
                timestamp: now(),
            }));
            effects.push(Effect::Emit(TourEvent::GuideArrowHidden { timestamp: now() }));
        }

        self.phase = TourPhase::TargetActive { target: from };
        if self.engaged != Some(from) {
            effects.extend(self.engage(from));
        }
        effects
    }

    /// Build a target's controller and props and begin its asset loads
    fn initialize_target(&mut self, target: usize) -> Vec<Effect> {
        if self.records[target].initialized {
            return Vec::new();
        }
        let target_config = &self.config.targets[target];
        let mut controller = TargetController::new(target_config);
        controller.mark_loading();
        let props = target_config
            .props
            .iter()
            .map(|prop| Part::new(prop.source.clone(), 0, 0))
            .collect();

        let record = &mut self.records[target];
        record.controller = Some(controller);
        record.props = props;
        record.initialized = true;

        info!(target, name = %self.config.targets[target].name, "target initialized");
        vec![Effect::BeginAssetLoads { target }]
    }

    /// Run the completion protocol if the target's tour just finished;
    /// guarded so it runs at most once per completion
    pub(crate) fn maybe_complete(&mut self, target: usize) -> Vec<Effect> {
        let tour_complete = self.records[target]
            .controller
            .as_ref()
            .map(|ctl| ctl.tour_complete())
            .unwrap_or(false);
        if !tour_complete || self.records[target].prompt_shown {
            return Vec::new();
        }

        self.records[target].prompt_shown = true;
        self.records[target].completed = true;
        info!(target, "target tour completed");
        let mut effects = vec![Effect::Emit(TourEvent::TargetTourCompleted {
            target_index: target,
            timestamp: now(),
        })];

        if target + 1 < self.records.len() {
            self.grace_generation += 1;
            self.phase = TourPhase::Transitioning {
                from: target,
                to: target + 1,
                stage: TransitionStage::Grace,
            };
            effects.push(Effect::ScheduleGrace {
                target,
                generation: self.grace_generation,
                delay_ms: self.config.tuning.grace_delay_ms,
            });
        } else if self.records.iter().all(|record| record.completed) {
            info!("entire tour completed");
            effects.push(Effect::Emit(TourEvent::TourCompleted { timestamp: now() }));
        }
        effects
    }

    fn maybe_schedule_retry(&self, target: usize) -> Vec<Effect> {
        let Some(ctl) = self.records[target].controller.as_ref() else {
            return Vec::new();
        };
        let slot_index = ctl.current_index();
        let Some(slot) = ctl.slot(slot_index) else {
            return Vec::new();
        };
        if slot.started_this_session() || slot.is_all_resolved() {
            return Vec::new();
        }
        vec![Effect::ScheduleRetry {
            target,
            slot: slot_index,
            generation: slot.generation(),
        }]
    }

    // ------------------------------------------------------------------
    // Effect conversion
    // ------------------------------------------------------------------

    /// Run a controller operation and convert its effects, including the
    /// completion pass for any slot that signalled completion
    fn wrap<F>(&mut self, target: usize, f: F) -> Vec<Effect>
    where
        F: FnOnce(&mut TargetController) -> Vec<TargetEffect>,
    {
        let Some(ctl) = self.records[target].controller.as_mut() else {
            return Vec::new();
        };
        let target_effects = f(ctl);
        self.convert_effects(target, target_effects)
    }

    fn convert_effects(&mut self, target: usize, effects: Vec<TargetEffect>) -> Vec<Effect> {
        let mut out = Vec::new();
        let mut any_completed = false;

        for effect in effects {
            match effect {
                TargetEffect::Entered(slot_index) => {
                    out.push(Effect::Emit(TourEvent::SlotEntered {
                        target_index: target,
                        slot_index,
                        timestamp: now(),
                    }));
                }
                TargetEffect::Left(slot_index) => {
                    out.push(Effect::Emit(TourEvent::SlotLeft {
                        target_index: target,
                        slot_index,
                        timestamp: now(),
                    }));
                }
                TargetEffect::Slot { slot_index, effect } => match effect {
                    SlotEffect::CancelTimers => {
                        out.push(Effect::CancelSlotTimers {
                            target,
                            slot: slot_index,
                        });
                    }
                    SlotEffect::Schedule(request) => {
                        out.push(Effect::ScheduleSlotTimer {
                            target,
                            slot: slot_index,
                            request,
                        });
                    }
                    SlotEffect::Signal(SlotSignal::Revealed(part_index)) => {
                        let (part_id, animations) = self
                            .part_details(target, slot_index, part_index)
                            .unwrap_or_default();
                        out.push(Effect::Emit(TourEvent::PartRevealed {
                            target_index: target,
                            slot_index,
                            part_index,
                            part_id,
                            animations,
                            timestamp: now(),
                        }));
                    }
                    SlotEffect::Signal(SlotSignal::Hidden(part_index)) => {
                        let (part_id, _) = self
                            .part_details(target, slot_index, part_index)
                            .unwrap_or_default();
                        out.push(Effect::Emit(TourEvent::PartHidden {
                            target_index: target,
                            slot_index,
                            part_index,
                            part_id,
                            timestamp: now(),
                        }));
                    }
                    SlotEffect::Signal(SlotSignal::Completed) => {
                        out.push(Effect::Emit(TourEvent::SlotCompleted {
                            target_index: target,
                            slot_index,
                            timestamp: now(),
                        }));
                        any_completed = true;
                    }
                },
            }
        }

        if any_completed {
            out.extend(self.maybe_complete(target));
        }
        out
    }

    fn part_details(
        &self,
        target: usize,
        slot_index: usize,
        part_index: usize,
    ) -> Option<(uuid::Uuid, Vec<String>)> {
        let part = self.records[target]
            .controller
            .as_ref()?
            .slot(slot_index)?
            .part(part_index)?;
        Some((part.id, part.animations().to_vec()))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn eligible(&self, target: usize) -> bool {
        target == 0 || self.records[target - 1].completed
    }

    /// The target the tour currently wants the user to look at
    pub fn expected_target(&self) -> usize {
        match self.phase {
            TourPhase::TargetActive { target } => target,
            TourPhase::Transitioning { to, .. } => to,
        }
    }

    pub fn phase(&self) -> TourPhase {
        self.phase
    }

    pub fn engaged(&self) -> Option<usize> {
        self.engaged
    }

    pub fn is_tracked(&self, target: usize) -> bool {
        self.records.get(target).map(|r| r.tracked).unwrap_or(false)
    }

    pub fn is_completed(&self, target: usize) -> bool {
        self.records
            .get(target)
            .map(|r| r.completed)
            .unwrap_or(false)
    }

    pub fn is_initialized(&self, target: usize) -> bool {
        self.records
            .get(target)
            .map(|r| r.initialized)
            .unwrap_or(false)
    }

    pub fn controller(&self, target: usize) -> Option<&TargetController> {
        self.records.get(target)?.controller.as_ref()
    }

    pub fn tuning(&self) -> &TuningConfig {
        &self.config.tuning
    }

    pub fn config(&self) -> &TourConfig {
        &self.config
    }

    /// Blend the engaged target's smoother toward a raw pose sample
    pub fn smooth_pose(&mut self, target: usize, raw: Transform) -> Transform {
        self.records[target].smoother.update(raw)
    }

    /// Gate inputs for the engaged target, if any
    pub fn nav_inputs(&self) -> Option<NavInputs> {
        let target = self.engaged?;
        let ctl = self.records[target].controller.as_ref()?;
        let advance_available = ctl.tour_complete() && target + 1 < self.records.len();
        Some(ctl.nav_inputs(advance_available))
    }

    /// HUD label in the original "k/N" style; `0/N` while nothing engaged
    pub fn current_label(&self) -> String {
        match self.engaged.and_then(|t| self.records[t].controller.as_ref()) {
            Some(ctl) => format!("{}/{}", ctl.current_index() + 1, ctl.slot_count()),
            None => {
                let expected = self.expected_target();
                let total = self
                    .config
                    .targets
                    .get(expected)
                    .map(|t| t.slots.len())
                    .unwrap_or(0);
                format!("0/{}", total)
            }
        }
    }

    /// Full visibility snapshot for the renderer
    pub fn scene_snapshot(&self) -> Vec<PartView> {
        let mut views = Vec::new();
        for (target_index, record) in self.records.iter().enumerate() {
            if !record.initialized {
                continue;
            }
            for (part_index, prop) in record.props.iter().enumerate() {
                views.push(PartView {
                    target_index,
                    slot_index: None,
                    part_index,
                    part_id: prop.id,
                    source: prop.source.clone(),
                    visible: prop.visible(),
                    animations: prop.animations().to_vec(),
                });
            }
            if let Some(ctl) = record.controller.as_ref() {
                for (slot_index, slot) in ctl.slots().iter().enumerate() {
                    for (part_index, part) in slot.parts().iter().enumerate() {
                        views.push(PartView {
                            target_index,
                            slot_index: Some(slot_index),
                            part_index,
                            part_id: part.id,
                            source: part.source.clone(),
                            visible: part.visible(),
                            animations: part.animations().to_vec(),
                        });
                    }
                }
            }
        }
        views
    }

    /// Invariant check used by tests: number of active controllers
    pub fn active_controller_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| {
                record
                    .controller
                    .as_ref()
                    .map(|ctl| ctl.is_active())
                    .unwrap_or(false)
            })
            .count()
    }
}
