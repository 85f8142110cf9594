//! Target controller: one marker's ordered tour of scene slots
//!
//! Owns the fixed slot list for one physical target, applies the
//! only-current-slot-visible rule, and walks navigation. Like the slot it
//! is synchronous; effects bubble up to the orchestrator tagged with the
//! slot index they concern.

use crate::tour::navigation::NavInputs;
use crate::tour::slot::{SceneSlot, SlotEffect};
use std::collections::HashSet;
use tracing::debug;
use waymark_common::config::TargetConfig;

/// Effects produced by controller operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEffect {
    /// A slot-level effect, tagged with its slot index
    Slot {
        slot_index: usize,
        effect: SlotEffect,
    },
    /// A slot became current
    Entered(usize),
    /// The previously current slot was left
    Left(usize),
}

/// Ordered tour of scene slots for one target
#[derive(Debug, Clone)]
pub struct TargetController {
    slots: Vec<SceneSlot>,
    current_index: usize,
    last_active: Option<usize>,
    viewed: HashSet<usize>,
    active: bool,
}

impl TargetController {
    pub fn new(config: &TargetConfig) -> Self {
        Self {
            slots: config.slots.iter().map(SceneSlot::new).collect(),
            current_index: 0,
            last_active: None,
            viewed: HashSet::new(),
            active: false,
        }
    }

    /// Mark every slot as loading (asset loads spawned)
    pub fn mark_loading(&mut self) {
        for slot in &mut self.slots {
            slot.mark_loading();
        }
    }

    /// Claim the screen: show the current slot, fire its enter hook
    pub fn activate(&mut self, target_tracked: bool) -> Vec<TargetEffect> {
        self.active = true;
        self.apply_visibility(target_tracked)
    }

    /// Release the screen: leave the current slot (cancelling its timers)
    /// and hide everything
    pub fn deactivate(&mut self) -> Vec<TargetEffect> {
        if !self.active {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if let Some(active_index) = self.last_active {
            effects.extend(self.wrap_slot(active_index, |slot| slot.on_leave()));
            effects.push(TargetEffect::Left(active_index));
        }
        // Visibility invariant: nothing of an inactive target stays visible,
        // whatever the slots' reset flags say
        for slot in &mut self.slots {
            slot.force_hide_all();
        }
        self.last_active = None;
        self.active = false;
        effects
    }

    /// Enforce the only-current-slot-visible rule and fire leave/enter hooks
    /// exactly once per index change
    pub fn apply_visibility(&mut self, target_tracked: bool) -> Vec<TargetEffect> {
        if !self.active || self.slots.is_empty() {
            return Vec::new();
        }

        let current = self.current_index;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i != current {
                slot.force_hide_all();
            }
        }

        let mut effects = Vec::new();
        if self.last_active != Some(current) {
            if let Some(previous) = self.last_active {
                effects.extend(self.wrap_slot(previous, |slot| slot.on_leave()));
                effects.push(TargetEffect::Left(previous));
            }
            effects.extend(self.wrap_slot(current, |slot| slot.on_enter(target_tracked)));
            effects.push(TargetEffect::Entered(current));
            self.viewed.insert(current);
            self.last_active = Some(current);
        }
        effects
    }

    /// Navigate forward to the nearest loaded slot; no-op past the last one
    pub fn go_next(&mut self, target_tracked: bool) -> Vec<TargetEffect> {
        self.navigate(1, target_tracked)
    }

    /// Navigate backward to the nearest loaded slot; no-op before the first
    pub fn go_prev(&mut self, target_tracked: bool) -> Vec<TargetEffect> {
        self.navigate(-1, target_tracked)
    }

    fn navigate(&mut self, dir: isize, target_tracked: bool) -> Vec<TargetEffect> {
        if !self.active || self.slots.is_empty() {
            return Vec::new();
        }
        let Some(candidate) = self.nearest_loaded(self.current_index, dir) else {
            return Vec::new();
        };
        // The walk is circular to skip unloaded slots, but navigation never
        // wraps around the ends of the tour
        let wraps = if dir > 0 {
            candidate <= self.current_index
        } else {
            candidate >= self.current_index
        };
        if wraps {
            debug!(candidate, current = self.current_index, "navigation would wrap; ignored");
            return Vec::new();
        }
        self.current_index = candidate;
        self.apply_visibility(target_tracked)
    }

    /// Walk circularly from `from` in direction `dir`, returning the first
    /// slot that has begun loading
    fn nearest_loaded(&self, from: usize, dir: isize) -> Option<usize> {
        let total = self.slots.len() as isize;
        let mut i = from as isize;
        for _ in 0..total {
            i = (i + dir + total) % total;
            if self.slots[i as usize].has_begun_loading() {
                let candidate = i as usize;
                if candidate != from {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Restart the current slot's timeline from t=0
    pub fn replay(&mut self, target_tracked: bool) -> Vec<TargetEffect> {
        if !self.active {
            return Vec::new();
        }
        let current = self.current_index;
        let mut effects = self.wrap_slot(current, |slot| slot.on_leave());
        effects.push(TargetEffect::Left(current));
        effects.extend(self.wrap_slot(current, |slot| slot.on_enter(target_tracked)));
        effects.push(TargetEffect::Entered(current));
        effects
    }

    /// Idempotent kick of the current slot's sequence (found path, asset
    /// path and retry poll all land here)
    pub fn start_current_sequence_if_ready(&mut self, target_tracked: bool) -> Vec<TargetEffect> {
        if !self.active {
            return Vec::new();
        }
        let current = self.current_index;
        self.wrap_slot(current, |slot| slot.start_sequence_if_ready(target_tracked))
    }

    /// Controller-level completion: every slot viewed and the last slot
    /// completed this session
    pub fn tour_complete(&self) -> bool {
        self.viewed.len() == self.slots.len()
            && self
                .slots
                .last()
                .map(|slot| slot.completed_this_session())
                .unwrap_or(true)
    }

    /// Gate inputs for the current slot
    ///
    /// `advance_available` is supplied by the orchestrator: completion of
    /// this target's tour only enables "next" on the last slot when there
    /// is a successor target to advance to.
    pub fn nav_inputs(&self, advance_available: bool) -> NavInputs {
        let total = self.slots.len();
        let slot_completed = self
            .slots
            .get(self.current_index)
            .map(|slot| slot.completed_this_session())
            .unwrap_or(false);
        NavInputs {
            current_slot_index: self.current_index,
            total_slots: total,
            slot_completed,
            is_last_slot: total > 0 && self.current_index == total - 1,
            tour_fully_completed: advance_available,
        }
    }

    fn wrap_slot<F>(&mut self, slot_index: usize, f: F) -> Vec<TargetEffect>
    where
        F: FnOnce(&mut SceneSlot) -> Vec<SlotEffect>,
    {
        let Some(slot) = self.slots.get_mut(slot_index) else {
            return Vec::new();
        };
        f(slot)
            .into_iter()
            .map(|effect| TargetEffect::Slot { slot_index, effect })
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn viewed_count(&self) -> usize {
        self.viewed.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&SceneSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut SceneSlot> {
        self.slots.get_mut(index)
    }

    pub fn slots(&self) -> &[SceneSlot] {
        &self.slots
    }
}
