//! Millisecond timing helpers for reveal schedules and frame deltas
//!
//! Waymark uses two time representations:
//!
//! 1. **Nominal milliseconds (configuration)**: `u64` timestamps as authored
//!    in the tour tables. Authors write absolute times ("part 3 appears at
//!    9:30 into the scene") without caring what the first entry's absolute
//!    value is.
//! 2. **Relative offsets (scheduling)**: `u64` delays measured from the
//!    activation instant. The slot's first part defines t=0, so an entire
//!    table can be shifted without changing the on-screen rhythm.
//!
//! Frame deltas are clamped before use so a single stalled tick (tab switch,
//! GC pause in the host page, camera hiccup) cannot produce a visible jump
//! in animation playback.

use std::time::Duration;

/// Normalise a reveal table to offsets relative to its first entry
///
/// Each result is `reveal_at_ms[i] - reveal_at_ms[0]`, clamped to ≥ 0 so a
/// misordered entry schedules immediately instead of underflowing.
///
/// # Examples
///
/// ```
/// use waymark_common::timing::relative_reveal_offsets;
///
/// assert_eq!(relative_reveal_offsets(&[4000, 6000, 9500]), vec![0, 2000, 5500]);
/// assert_eq!(relative_reveal_offsets(&[0, 2000]), vec![0, 2000]);
/// assert_eq!(relative_reveal_offsets(&[]), Vec::<u64>::new());
/// ```
pub fn relative_reveal_offsets(reveal_at_ms: &[u64]) -> Vec<u64> {
    let first = reveal_at_ms.first().copied().unwrap_or(0);
    reveal_at_ms
        .iter()
        .map(|&t| t.saturating_sub(first))
        .collect()
}

/// Clamp a frame delta to the configured maximum
///
/// The smoothing blend factor is a per-tick constant and does not scale with
/// delta; clamping only protects animation consumers from a long stall being
/// replayed as one giant step.
pub fn clamp_frame_delta(delta: Duration, max: Duration) -> Duration {
    delta.min(max)
}
