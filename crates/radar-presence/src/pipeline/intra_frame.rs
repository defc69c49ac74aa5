//! Intra-frame (fast motion) estimator.
//!
//! Motion faster than a frame shows up as spread of a point's samples around
//! their sweep mean. The spread is smoothed and expressed in units of the
//! noise level. Noise alone spreads the samples by one noise unit, so that
//! unit is taken off before the result is smoothed into the reported score,
//! and a still scene decays to 0 with or without noise.

use super::filter::{low_pass, SmoothingFactors};
use super::filter_bank::{FilterState, PointStatistics};
use crate::PresenceConfig;

/// Spread of white noise around its sweep mean, in noise units.
pub const INTRA_NOISE_BASELINE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntraFrameEstimator {
    alpha: f32,
    output_alpha: f32,
    enabled: bool,
}

impl IntraFrameEstimator {
    #[must_use]
    pub fn new(config: &PresenceConfig, factors: &SmoothingFactors) -> Self {
        Self {
            alpha: factors.intra,
            output_alpha: factors.intra_output,
            enabled: config.intra_detection(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advance the intra part of `state`; returns the depthwise score.
    ///
    /// State advances even when disabled so that re-enabling it does not start
    /// from stale history. The returned score is then 0.
    pub fn update(&self, state: &mut FilterState, stats: &PointStatistics, noise: f32) -> f32 {
        low_pass(&mut state.intra, stats.sweep_deviation, self.alpha);
        let excess = (state.intra / noise - INTRA_NOISE_BASELINE).max(0.0);
        low_pass(&mut state.intra_output, excess, self.output_alpha);
        if self.enabled {
            state.intra_output
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator(enabled: bool) -> IntraFrameEstimator {
        let config = PresenceConfig::builder().intra_detection(enabled).build();
        IntraFrameEstimator::new(&config, &SmoothingFactors::from_config(&config))
    }

    fn moving() -> PointStatistics {
        PointStatistics {
            sweep_deviation: 50.0,
            ..PointStatistics::default()
        }
    }

    #[test]
    fn spread_above_noise_raises_score() {
        let est = estimator(true);
        let mut state = FilterState::default();
        let mut score = 0.0;
        for _ in 0..40 {
            score = est.update(&mut state, &moving(), 10.0);
        }
        // 50 / 10 noise units, one of them noise
        assert!((score - 4.0).abs() < 0.05, "score {score}");
    }

    #[test]
    fn score_rises_gradually() {
        let est = estimator(true);
        let mut state = FilterState::default();
        let first = est.update(&mut state, &moving(), 10.0);
        let second = est.update(&mut state, &moving(), 10.0);
        assert!(first > 0.0 && first < second && second < 4.0);
    }

    #[test]
    fn noise_level_spread_decays_to_zero() {
        let est = estimator(true);
        let mut state = FilterState {
            intra_output: 2.0,
            ..FilterState::default()
        };
        let noise_only = PointStatistics {
            sweep_deviation: 10.0,
            ..PointStatistics::default()
        };
        let mut score = f32::MAX;
        for _ in 0..100 {
            score = est.update(&mut state, &noise_only, 10.0);
        }
        assert!(score < 1e-6, "score {score}");
        assert!((state.intra - 10.0).abs() < 1e-3);
    }

    #[test]
    fn disabled_estimator_reports_zero_but_tracks_state() {
        let est = estimator(false);
        let mut state = FilterState::default();
        for _ in 0..10 {
            assert_eq!(est.update(&mut state, &moving(), 10.0), 0.0);
        }
        assert!(state.intra_output > 1.0);
        assert_eq!(state.inter_output, 0.0);
    }
}
