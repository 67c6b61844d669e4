//! Writes a direction verdict to the state port.

use crate::direction::TextDirection;
use crate::port::DirectionState;
use horizon_dirsync_core::logging::targets;

/// Set the direction to `rtl` and add the presentation marker.
pub fn apply_rtl(state: &dyn DirectionState) {
    apply(state, TextDirection::Rtl);
}

/// Set the direction to `ltr` and remove the presentation marker.
pub fn apply_ltr(state: &dyn DirectionState) {
    apply(state, TextDirection::Ltr);
}

/// Write `direction` and make the marker mirror it.
///
/// Idempotent: applying the same direction twice leaves the same state as
/// applying it once.
pub fn apply(state: &dyn DirectionState, direction: TextDirection) {
    state.set_direction(direction);
    state.set_marker(direction.is_rtl());
    tracing::debug!(target: targets::RECONCILE, %direction, "direction applied");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MemoryState;

    #[test]
    fn test_apply_rtl_is_idempotent() {
        let state = MemoryState::new();
        apply_rtl(&state);
        let once = (state.direction(), state.marker());
        apply_rtl(&state);
        assert_eq!((state.direction(), state.marker()), once);
        assert_eq!(once, (Some("rtl".to_string()), true));
    }

    #[test]
    fn test_apply_ltr_clears_marker() {
        let state = MemoryState::new();
        apply_rtl(&state);
        apply_ltr(&state);
        assert_eq!(state.direction().as_deref(), Some("ltr"));
        assert!(!state.marker());
    }
}
