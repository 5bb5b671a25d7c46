//! Property-change bookkeeping shared between the property storage and the
//! binding service.

use bitflags::bitflags;

/// Why a property-change notification was raised.
///
/// `Modified` is a genuine value change that must propagate outward.
/// `Refresh` re-applies the currently resolved value (used when a binding is
/// newly attached, and to stop two-way cycles from treating an echoed value
/// as new data).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyChangeReason {
    Modified,
    Refresh,
}

/// Pending-change marker kept on each registered instance.
///
/// The escalation rule is one-directional: `Refresh` can be upgraded to
/// `Modified`, never the other way around.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PropertyChangeState {
    #[default]
    Unchanged,
    Refresh,
    Modified,
}

impl PropertyChangeState {
    /// The state a fresh notification with `reason` puts an untouched
    /// instance into.
    #[must_use]
    pub fn from_reason(reason: PropertyChangeReason) -> Self {
        match reason {
            PropertyChangeReason::Modified => Self::Modified,
            PropertyChangeReason::Refresh => Self::Refresh,
        }
    }

    /// The reason this pending state corresponds to.
    ///
    /// Only meaningful for non-`Unchanged` states; `Unchanged` maps to
    /// `Refresh` as the harmless fallback.
    #[must_use]
    pub fn to_reason(self) -> PropertyChangeReason {
        match self {
            Self::Modified => PropertyChangeReason::Modified,
            Self::Refresh | Self::Unchanged => PropertyChangeReason::Refresh,
        }
    }
}

bitflags! {
    /// Capabilities of a data-source instance.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DataSourceFlags: u32 {
        /// The source emits change notifications that observers may bind to.
        const OBSERVABLE = 0b0000_0001;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_round_trip() {
        assert_eq!(
            PropertyChangeState::from_reason(PropertyChangeReason::Modified).to_reason(),
            PropertyChangeReason::Modified
        );
        assert_eq!(
            PropertyChangeState::from_reason(PropertyChangeReason::Refresh).to_reason(),
            PropertyChangeReason::Refresh
        );
    }

    #[test]
    fn unchanged_defaults_to_refresh_reason() {
        assert_eq!(
            PropertyChangeState::Unchanged.to_reason(),
            PropertyChangeReason::Refresh
        );
    }

    #[test]
    fn observable_flag() {
        let flags = DataSourceFlags::OBSERVABLE;
        assert!(flags.contains(DataSourceFlags::OBSERVABLE));
        assert!(DataSourceFlags::empty().is_empty());
    }
}
