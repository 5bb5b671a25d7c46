//! Per-window state flags used by the layout pass.

use bitflags::bitflags;

bitflags! {
    /// State bits tracked for each window/widget participating in layout.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        /// The window finished its init phase.
        const INITIALIZED = 0b0000_0001;
        /// The cached measure/arrange results are stale.
        const LAYOUT_DIRTY = 0b0000_0010;
        /// The window participates in update ticks.
        const UPDATE_ENABLED = 0b0000_0100;
        /// The window draws content.
        const DRAW_ENABLED = 0b0000_1000;
        /// The window accepts click input.
        const CLICK_INPUT = 0b0001_0000;
    }
}

impl WindowFlags {
    /// Set or clear `flag` according to `enabled`, leaving every other bit
    /// untouched.
    pub fn set_flag(&mut self, flag: WindowFlags, enabled: bool) {
        if enabled {
            self.insert(flag);
        } else {
            self.remove(flag);
        }
    }

    /// Builder-style variant of [`set_flag`](Self::set_flag).
    #[must_use]
    pub fn with_flag(mut self, flag: WindowFlags, enabled: bool) -> Self {
        self.set_flag(flag, enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_flag_only_touches_the_named_bit() {
        let mut flags = WindowFlags::INITIALIZED | WindowFlags::DRAW_ENABLED;
        flags.set_flag(WindowFlags::LAYOUT_DIRTY, true);
        assert_eq!(
            flags,
            WindowFlags::INITIALIZED | WindowFlags::DRAW_ENABLED | WindowFlags::LAYOUT_DIRTY
        );

        flags.set_flag(WindowFlags::DRAW_ENABLED, false);
        assert_eq!(flags, WindowFlags::INITIALIZED | WindowFlags::LAYOUT_DIRTY);
    }

    #[test]
    fn set_flag_is_idempotent() {
        let mut flags = WindowFlags::empty();
        flags.set_flag(WindowFlags::CLICK_INPUT, true);
        flags.set_flag(WindowFlags::CLICK_INPUT, true);
        assert_eq!(flags, WindowFlags::CLICK_INPUT);

        flags.set_flag(WindowFlags::CLICK_INPUT, false);
        flags.set_flag(WindowFlags::CLICK_INPUT, false);
        assert!(flags.is_empty());
    }

    #[test]
    fn with_flag_round_trips_every_bit() {
        for flag in WindowFlags::all().iter() {
            let set = WindowFlags::empty().with_flag(flag, true);
            assert!(set.contains(flag));
            assert_eq!(set.with_flag(flag, false), WindowFlags::empty());
        }
    }
}
