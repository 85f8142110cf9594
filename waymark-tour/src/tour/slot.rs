//! Composite scene slot: the timed reveal state machine
//!
//! A slot owns an ordered set of parts and walks the state machine
//!
//! ```text
//! Idle → WaitingForAssets → WaitingForActivation → Sequencing → Completed
//! ```
//!
//! looping back on re-entry when `reset_on_enter` is set. The slot itself is
//! purely synchronous: every method returns a list of [`SlotEffect`]s
//! (timers to schedule, timers to cancel, signals to surface) that the
//! engine actor executes. Timer staleness is handled with a generation
//! counter — leaving a slot bumps the generation, so a timer that was
//! already in flight when the user navigated away can never mutate the slot.

use crate::assets::AssetOutcome;
use crate::tour::part::Part;
use tracing::debug;
use waymark_common::config::SlotConfig;
use waymark_common::timing::relative_reveal_offsets;

/// Slot state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Registered; asset loads not yet spawned
    Idle,
    /// Loads in flight; at least one part unresolved
    WaitingForAssets,
    /// All parts resolved; waiting for the slot to be entered while its
    /// target is tracked
    WaitingForActivation,
    /// Reveal timeline scheduled and running
    Sequencing,
    /// Every permanent part revealed this session
    Completed,
}

/// What a scheduled timer should do when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Reveal,
    Hide,
}

/// A timer the engine should schedule for this slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    /// Slot generation at scheduling time; stale generations are ignored
    pub generation: u64,
    pub part_index: usize,
    pub action: TimerAction,
    pub delay_ms: u64,
}

/// State changes the orchestrator needs to observe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSignal {
    /// Part became visible (reveal timer fired, or exclusive re-reveal)
    Revealed(usize),
    /// Part became invisible (auto-hide fired, or exclusive reveal hid it)
    Hidden(usize),
    /// Every permanent part is visible; fired at most once per session
    Completed,
}

/// Effects returned by slot methods, executed in order by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEffect {
    /// Abort every pending timer task for this slot
    CancelTimers,
    /// Schedule a new timer
    Schedule(TimerRequest),
    /// Surface a state change
    Signal(SlotSignal),
}

/// One composite scene with its own reveal timeline
#[derive(Debug, Clone)]
pub struct SceneSlot {
    parts: Vec<Part>,
    exclusive: bool,
    reset_on_enter: bool,
    reset_on_leave: bool,
    state: SlotState,
    started_this_session: bool,
    completed_this_session: bool,
    generation: u64,
}

impl SceneSlot {
    /// Register a slot from configuration
    ///
    /// Reveal times are normalised here: elapsed time is measured from the
    /// first part's nominal timestamp regardless of its absolute value.
    pub fn new(config: &SlotConfig) -> Self {
        let nominal: Vec<u64> = config.parts.iter().map(|p| p.reveal_at_ms).collect();
        let offsets = relative_reveal_offsets(&nominal);

        let parts = config
            .parts
            .iter()
            .zip(offsets)
            .map(|(part, offset)| Part::new(part.source.clone(), offset, part.hide_after_ms))
            .collect();

        Self {
            parts,
            exclusive: config.exclusive,
            reset_on_enter: config.reset_on_enter,
            reset_on_leave: config.reset_on_leave,
            state: SlotState::Idle,
            started_this_session: false,
            completed_this_session: false,
            generation: 0,
        }
    }

    /// Asset loads for this slot have been spawned
    pub fn mark_loading(&mut self) {
        if self.state == SlotState::Idle {
            self.state = if self.is_all_resolved() {
                SlotState::WaitingForActivation
            } else {
                SlotState::WaitingForAssets
            };
        }
    }

    /// Record one part's load outcome
    ///
    /// Returns true when this resolution completed the slot's load set —
    /// the caller uses that edge to drive `start_sequence_if_ready` without
    /// polling.
    pub fn resolve_part(&mut self, part_index: usize, outcome: AssetOutcome) -> bool {
        let was_resolved = self.is_all_resolved();
        let Some(part) = self.parts.get_mut(part_index) else {
            debug!(part_index, "asset resolution for unknown part ignored");
            return false;
        };
        part.resolve(outcome);

        let now_resolved = self.is_all_resolved();
        if now_resolved && self.state == SlotState::WaitingForAssets {
            self.state = SlotState::WaitingForActivation;
        }
        now_resolved && !was_resolved
    }

    /// Enter the slot (it became the target's current slot)
    pub fn on_enter(&mut self, target_tracked: bool) -> Vec<SlotEffect> {
        let mut effects = Vec::new();

        if self.reset_on_enter {
            self.generation += 1;
            effects.push(SlotEffect::CancelTimers);
            self.hide_all_parts();
            self.started_this_session = false;
            self.completed_this_session = false;
            self.state = self.resting_state();
        }

        effects.extend(self.start_sequence_if_ready(target_tracked));
        effects
    }

    /// Leave the slot (navigation moved elsewhere, or its target deactivated)
    ///
    /// Timers are cancelled unconditionally and synchronously — a stale
    /// timer must never mutate a slot the user navigated away from.
    /// Completion survives the leave only when `reset_on_enter` is false
    /// ("sticky completion").
    pub fn on_leave(&mut self) -> Vec<SlotEffect> {
        self.generation += 1;

        if self.reset_on_leave {
            self.hide_all_parts();
        }
        self.started_this_session = false;
        if self.reset_on_enter {
            self.completed_this_session = false;
        }
        self.state = self.resting_state();

        vec![SlotEffect::CancelTimers]
    }

    /// Schedule the reveal timeline if every precondition holds
    ///
    /// Idempotent: a no-op when the sequence already started this session,
    /// when the target is not tracked, or when parts are still loading.
    /// Safe to call from the found path, the asset-resolution path and the
    /// diagnostic retry poll.
    pub fn start_sequence_if_ready(&mut self, target_tracked: bool) -> Vec<SlotEffect> {
        if self.started_this_session || !target_tracked || !self.is_all_resolved() {
            return Vec::new();
        }

        self.started_this_session = true;
        self.state = SlotState::Sequencing;

        let mut effects: Vec<SlotEffect> = self
            .parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                SlotEffect::Schedule(TimerRequest {
                    generation: self.generation,
                    part_index: i,
                    action: TimerAction::Reveal,
                    delay_ms: part.reveal_offset_ms,
                })
            })
            .collect();

        // A slot with no parts is vacuously complete
        effects.extend(self.check_completion());
        effects
    }

    /// Handle a fired timer; stale generations are dropped
    pub fn handle_timer(
        &mut self,
        generation: u64,
        part_index: usize,
        action: TimerAction,
    ) -> Vec<SlotEffect> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "stale slot timer dropped");
            return Vec::new();
        }
        match action {
            TimerAction::Reveal => self.reveal_part(part_index),
            TimerAction::Hide => self.hide_part(part_index),
        }
    }

    /// Completion predicate: every permanent, successfully loaded part is
    /// currently visible
    ///
    /// Temporary parts (`hide_after_ms > 0`) never block completion, and
    /// neither do parts whose load failed — they can never become visible.
    pub fn all_permanent_parts_visible(&self) -> bool {
        self.parts
            .iter()
            .all(|p| !p.is_permanent() || !p.is_loaded() || p.visible())
    }

    fn reveal_part(&mut self, part_index: usize) -> Vec<SlotEffect> {
        let mut effects = Vec::new();

        if self.exclusive {
            for (j, other) in self.parts.iter_mut().enumerate() {
                if j != part_index && other.visible() {
                    other.set_visible(false);
                    effects.push(SlotEffect::Signal(SlotSignal::Hidden(j)));
                }
            }
        }

        let Some(part) = self.parts.get_mut(part_index) else {
            return effects;
        };

        // A failed (or, defensively, still-pending) part never appears; the
        // rest of the timeline is unaffected.
        if part.is_loaded() {
            if !part.visible() {
                part.set_visible(true);
                effects.push(SlotEffect::Signal(SlotSignal::Revealed(part_index)));
            }
            if part.hide_after_ms > 0 {
                effects.push(SlotEffect::Schedule(TimerRequest {
                    generation: self.generation,
                    part_index,
                    action: TimerAction::Hide,
                    delay_ms: part.hide_after_ms,
                }));
            }
        }

        effects.extend(self.check_completion());
        effects
    }

    fn hide_part(&mut self, part_index: usize) -> Vec<SlotEffect> {
        let Some(part) = self.parts.get_mut(part_index) else {
            return Vec::new();
        };
        if part.visible() {
            part.set_visible(false);
            vec![SlotEffect::Signal(SlotSignal::Hidden(part_index))]
        } else {
            Vec::new()
        }
    }

    fn check_completion(&mut self) -> Vec<SlotEffect> {
        if self.completed_this_session
            || !self.started_this_session
            || !self.is_all_resolved()
            || !self.all_permanent_parts_visible()
        {
            return Vec::new();
        }
        self.completed_this_session = true;
        self.state = SlotState::Completed;
        vec![SlotEffect::Signal(SlotSignal::Completed)]
    }

    fn hide_all_parts(&mut self) {
        for part in &mut self.parts {
            part.set_visible(false);
        }
    }

    /// Hide every part without emitting signals; used by the controller to
    /// enforce the only-current-slot-visible invariant
    pub(crate) fn force_hide_all(&mut self) {
        self.hide_all_parts();
    }

    /// State the slot rests in when not sequencing
    fn resting_state(&self) -> SlotState {
        if self.completed_this_session {
            SlotState::Completed
        } else if self.state == SlotState::Idle {
            SlotState::Idle
        } else if self.is_all_resolved() {
            SlotState::WaitingForActivation
        } else {
            SlotState::WaitingForAssets
        }
    }

    pub fn is_all_resolved(&self) -> bool {
        self.parts.iter().all(|p| p.is_resolved())
    }

    /// The slot has at least begun loading (navigation skips slots that
    /// have not)
    pub fn has_begun_loading(&self) -> bool {
        self.state != SlotState::Idle
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn started_this_session(&self) -> bool {
        self.started_this_session
    }

    pub fn completed_this_session(&self) -> bool {
        self.completed_this_session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }
}
