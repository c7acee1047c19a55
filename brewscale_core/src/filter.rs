//! Brewing-activity state machine.
//!
//! Each accepted reading is classified by `delta = |raw - current|`:
//!
//! | state         | delta > threshold          | quiet, within window | quiet, window elapsed     |
//! |---------------|----------------------------|----------------------|---------------------------|
//! | STABLE        | -> BREWING, stamp activity | stay                 | stay                      |
//! | BREWING       | stay, stamp activity       | stay                 | -> TRANSITIONING          |
//! | TRANSITIONING | -> BREWING, stamp activity | stay                 | -> STABLE                 |
//!
//! BREWING waits `stability_timeout`; TRANSITIONING waits
//! `settle_multiplier x stability_timeout`.

use std::fmt;

use crate::util::elapsed_exceeds;

/// Which filter regime the scale is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterState {
    /// Quiescent; average filter.
    #[default]
    Stable,
    /// Active pour; median filter.
    Brewing,
    /// Activity stopped, confirming quiescence; average filter.
    Transitioning,
}

impl FilterState {
    pub const ALL: [Self; 3] = [Self::Stable, Self::Brewing, Self::Transitioning];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::Brewing => "BREWING",
            Self::Transitioning => "TRANSITIONING",
        }
    }

    /// BREWING trades latency for spike rejection.
    pub const fn uses_median(self) -> bool {
        matches!(self, Self::Brewing)
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one [`FilterSelector::step`]. Exactly one applies per reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// STABLE, nothing happening.
    Idle,
    /// STABLE -> BREWING.
    BrewingDetected,
    /// BREWING, activity continues.
    ActivityRefreshed,
    /// BREWING, quiet but still inside the stability timeout.
    Quiet,
    /// BREWING -> TRANSITIONING.
    QuietTimeout,
    /// TRANSITIONING -> BREWING.
    ActivityResumed,
    /// TRANSITIONING, still confirming.
    Settling,
    /// TRANSITIONING -> STABLE.
    Settled,
}

impl Transition {
    /// State the selector is in after this transition.
    pub const fn target(self) -> FilterState {
        match self {
            Self::Idle | Self::Settled => FilterState::Stable,
            Self::BrewingDetected | Self::ActivityRefreshed | Self::Quiet | Self::ActivityResumed => {
                FilterState::Brewing
            }
            Self::QuietTimeout | Self::Settling => FilterState::Transitioning,
        }
    }

    /// True when the activity timestamp was refreshed.
    pub const fn is_activity(self) -> bool {
        matches!(
            self,
            Self::BrewingDetected | Self::ActivityRefreshed | Self::ActivityResumed
        )
    }
}

/// Parameters the state machine reads on every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorParams {
    pub brewing_threshold: f32,
    pub stability_timeout_ms: u64,
    pub settle_multiplier: u32,
}

impl SelectorParams {
    fn settle_window_ms(&self) -> u64 {
        self.stability_timeout_ms
            .saturating_mul(u64::from(self.settle_multiplier))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterSelector {
    state: FilterState,
    last_activity_ms: u64,
}

impl FilterSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> FilterState {
        self.state
    }

    pub const fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    /// Classify one reading and move to the next state.
    pub fn step(&mut self, delta: f32, now_ms: u64, params: &SelectorParams) -> Transition {
        let active = delta > params.brewing_threshold;
        let transition = match self.state {
            FilterState::Stable if active => Transition::BrewingDetected,
            FilterState::Stable => Transition::Idle,
            FilterState::Brewing if active => Transition::ActivityRefreshed,
            FilterState::Brewing
                if elapsed_exceeds(now_ms, self.last_activity_ms, params.stability_timeout_ms) =>
            {
                Transition::QuietTimeout
            }
            FilterState::Brewing => Transition::Quiet,
            FilterState::Transitioning if active => Transition::ActivityResumed,
            FilterState::Transitioning
                if elapsed_exceeds(now_ms, self.last_activity_ms, params.settle_window_ms()) =>
            {
                Transition::Settled
            }
            FilterState::Transitioning => Transition::Settling,
        };
        if transition.is_activity() {
            self.last_activity_ms = now_ms;
        }
        if transition.target() != self.state {
            tracing::trace!(
                from = self.state.as_str(),
                to = transition.target().as_str(),
                delta,
                now_ms,
                "filter state change"
            );
        }
        self.state = transition.target();
        transition
    }

    /// Step-change override: STABLE is forced into BREWING. Returns true when
    /// the state changed.
    pub fn force_brewing(&mut self, now_ms: u64) -> bool {
        if self.state != FilterState::Stable {
            return false;
        }
        self.state = FilterState::Brewing;
        self.last_activity_ms = now_ms;
        tracing::trace!(now_ms, "step change forced BREWING");
        true
    }

    /// Back to STABLE with no recorded activity.
    pub fn reset(&mut self) {
        self.state = FilterState::Stable;
        self.last_activity_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: SelectorParams = SelectorParams {
        brewing_threshold: 0.15,
        stability_timeout_ms: 2000,
        settle_multiplier: 2,
    };

    fn brewing_at(t: u64) -> FilterSelector {
        let mut s = FilterSelector::new();
        assert_eq!(s.step(1.0, t, &P), Transition::BrewingDetected);
        s
    }

    #[test]
    fn stable_ignores_small_deltas() {
        let mut s = FilterSelector::new();
        assert_eq!(s.step(0.15, 10, &P), Transition::Idle);
        assert_eq!(s.state(), FilterState::Stable);
    }

    #[test]
    fn brewing_times_out_to_transitioning() {
        let mut s = brewing_at(1000);
        assert_eq!(s.step(0.0, 3000, &P), Transition::Quiet);
        assert_eq!(s.step(0.0, 3001, &P), Transition::QuietTimeout);
        assert_eq!(s.state(), FilterState::Transitioning);
    }

    #[test]
    fn activity_refreshes_the_brewing_timer() {
        let mut s = brewing_at(1000);
        assert_eq!(s.step(0.5, 2500, &P), Transition::ActivityRefreshed);
        assert_eq!(s.last_activity_ms(), 2500);
        assert_eq!(s.step(0.0, 4000, &P), Transition::Quiet);
    }

    #[test]
    fn transitioning_settles_after_double_timeout() {
        let mut s = brewing_at(1000);
        s.step(0.0, 3001, &P);
        assert_eq!(s.step(0.0, 5000, &P), Transition::Settling);
        assert_eq!(s.step(0.0, 5001, &P), Transition::Settled);
        assert_eq!(s.state(), FilterState::Stable);
    }

    #[test]
    fn settle_multiplier_is_configurable() {
        let p = SelectorParams {
            settle_multiplier: 3,
            ..P
        };
        let mut s = brewing_at(0);
        s.step(0.0, 2001, &p);
        assert_eq!(s.step(0.0, 6000, &p), Transition::Settling);
        assert_eq!(s.step(0.0, 6001, &p), Transition::Settled);
    }

    #[test]
    fn transitioning_resumes_brewing_on_activity() {
        let mut s = brewing_at(0);
        s.step(0.0, 2001, &P);
        assert_eq!(s.step(0.3, 2100, &P), Transition::ActivityResumed);
        assert_eq!(s.state(), FilterState::Brewing);
        assert_eq!(s.last_activity_ms(), 2100);
    }

    #[test]
    fn force_brewing_only_from_stable() {
        let mut s = FilterSelector::new();
        assert!(s.force_brewing(40));
        assert_eq!(s.state(), FilterState::Brewing);
        assert!(!s.force_brewing(80));
        assert_eq!(s.last_activity_ms(), 40);
    }

    #[test]
    fn reset_returns_to_stable() {
        let mut s = brewing_at(700);
        s.reset();
        assert_eq!(s.state(), FilterState::Stable);
        assert_eq!(s.last_activity_ms(), 0);
    }

    #[test]
    fn names_match_status_strings() {
        let names: Vec<_> = FilterState::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["STABLE", "BREWING", "TRANSITIONING"]);
        assert!(FilterState::Brewing.uses_median());
        assert!(!FilterState::Transitioning.uses_median());
    }
}
