//! Policies deciding whether a pending buffer may be latched yet.

use bufferflow_buffers::Nsecs;

/// Decides whether a pending submission is due at `expected_present_time`.
pub trait PresentationPolicy: Send + Sync {
    fn is_buffer_due(&self, desired_present_time: Nsecs, is_auto_timestamp: bool, expected_present_time: Nsecs) -> bool;
}

/// Every pending buffer is due.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediatePresentation;

impl PresentationPolicy for ImmediatePresentation {
    fn is_buffer_due(
        &self,
        _desired_present_time: Nsecs,
        _is_auto_timestamp: bool,
        _expected_present_time: Nsecs,
    ) -> bool {
        true
    }
}

/// Holds a buffer until the vsync its client asked for.
///
/// Auto-timestamped buffers are always due. A desired time further than
/// `max_plausible_delay` past the expected present is treated as bogus and the
/// buffer is latched anyway.
#[derive(Debug, Clone, Copy)]
pub struct DesiredPresentTimePolicy {
    pub max_plausible_delay: Nsecs,
}

impl Default for DesiredPresentTimePolicy {
    fn default() -> Self {
        Self {
            max_plausible_delay: 1_000_000_000,
        }
    }
}

impl PresentationPolicy for DesiredPresentTimePolicy {
    fn is_buffer_due(
        &self,
        desired_present_time: Nsecs,
        is_auto_timestamp: bool,
        expected_present_time: Nsecs,
    ) -> bool {
        if is_auto_timestamp || desired_present_time <= expected_present_time {
            return true;
        }
        desired_present_time.saturating_sub(expected_present_time) > self.max_plausible_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, true, 50, true)]
    #[case(50, false, 50, true)]
    #[case(51, false, 50, false)]
    #[case(5_000_000_000, false, 0, true)]
    fn test_desired_present_time_policy(
        #[case] desired: Nsecs,
        #[case] auto: bool,
        #[case] expected: Nsecs,
        #[case] due: bool,
    ) {
        assert_eq!(DesiredPresentTimePolicy::default().is_buffer_due(desired, auto, expected), due);
    }

    #[test]
    fn test_immediate_policy_is_always_due() {
        assert!(ImmediatePresentation.is_buffer_due(i64::MAX, false, 0));
    }
}
