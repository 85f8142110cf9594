//! Navigation gate: pure derivation of button enablement
//!
//! No state lives here. The engine recomputes the gate synchronously after
//! every visibility change, slot completion change or navigation action and
//! publishes it only when the derived values differ — the gate can never be
//! cached stale.

use serde::{Deserialize, Serialize};

/// Inputs sampled from the engaged target's controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavInputs {
    pub current_slot_index: usize,
    pub total_slots: usize,
    /// Current slot's completion predicate (all permanent parts visible)
    pub slot_completed: bool,
    pub is_last_slot: bool,
    /// This target's tour is complete and "next" may advance the tour
    pub tour_fully_completed: bool,
}

/// Derived button-enablement state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavState {
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub info_enabled: bool,
}

impl NavState {
    /// Everything disabled (no target engaged)
    pub const DISABLED: NavState = NavState {
        prev_enabled: false,
        next_enabled: false,
        info_enabled: false,
    };
}

/// Derive the gate from the sampled inputs
///
/// - `prev`: anywhere but the first slot.
/// - `next`: only once the current slot's reveal finished; on the last slot
///   it stays enabled only when the whole tour is complete, where it means
///   "advance to the next target".
/// - `info`: available as soon as the current slot finished revealing.
pub fn derive(inputs: NavInputs) -> NavState {
    if inputs.total_slots == 0 {
        return NavState::DISABLED;
    }

    let prev_enabled = inputs.current_slot_index > 0;
    let next_enabled =
        inputs.slot_completed && (!inputs.is_last_slot || inputs.tour_fully_completed);
    let info_enabled = inputs.slot_completed;

    NavState {
        prev_enabled,
        next_enabled,
        info_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(index: usize, total: usize, completed: bool, tour_done: bool) -> NavInputs {
        NavInputs {
            current_slot_index: index,
            total_slots: total,
            slot_completed: completed,
            is_last_slot: total > 0 && index == total - 1,
            tour_fully_completed: tour_done,
        }
    }

    #[test]
    fn test_first_slot_incomplete() {
        let nav = derive(inputs(0, 3, false, false));
        assert!(!nav.prev_enabled);
        assert!(!nav.next_enabled);
        assert!(!nav.info_enabled);
    }

    #[test]
    fn test_middle_slot_completed() {
        let nav = derive(inputs(1, 3, true, false));
        assert!(nav.prev_enabled);
        assert!(nav.next_enabled);
        assert!(nav.info_enabled);
    }

    #[test]
    fn test_last_slot_completed_tour_pending() {
        // Reveal done but the tour is not: next stays disabled
        let nav = derive(inputs(2, 3, true, false));
        assert!(nav.prev_enabled);
        assert!(!nav.next_enabled);
        assert!(nav.info_enabled);
    }

    #[test]
    fn test_last_slot_tour_completed() {
        // Next now means "advance to the next target"
        let nav = derive(inputs(2, 3, true, true));
        assert!(nav.next_enabled);
    }

    #[test]
    fn test_incomplete_slot_blocks_next_everywhere() {
        for index in 0..3 {
            let nav = derive(inputs(index, 3, false, false));
            assert!(!nav.next_enabled, "slot {} should block next", index);
        }
    }

    #[test]
    fn test_zero_slots_disabled() {
        assert_eq!(derive(inputs(0, 0, true, true)), NavState::DISABLED);
    }
}
