//! Inter-frame (slow motion) estimator.
//!
//! Two low-passes follow the absolute sweep mean of each point, one fast and
//! one slow. Whatever moves between frames makes them diverge. The divergence
//! is smoothed and scaled to noise units (the sweep mean averages noise down by
//! `sqrt(sweeps)`). Noise alone makes the two filters diverge by a fraction of
//! a unit; that baseline is taken off before the result is smoothed into the
//! reported score.
//!
//! With phase boost, motion that barely changes amplitude but rotates the
//! phase (a reflector moving a fraction of a wavelength) also counts: the arc
//! travelled by the sweep mean relative to a slow complex reference is used
//! when larger than the amplitude divergence. This only applies where the
//! reference stands clearly above noise, since the phase of noise is random.
//!
//! Presence timeout: once a point's score has dropped below the detection
//! threshold and kept declining for longer than the timeout, the decline is
//! accelerated by an extra factor that grows with the time spent beyond the
//! timeout.

use super::filter::{low_pass, low_pass_complex, SmoothingFactors};
use super::filter_bank::{FilterState, PointStatistics};
use crate::PresenceConfig;

/// Reference SNR below which phase boost is not applied.
pub const PHASE_BOOST_MIN_SNR: f32 = 4.0;

/// Mean amplitude divergence caused by noise alone, in noise units.
///
/// `E|N(0, 1/sqrt(2))| = 1/sqrt(pi)`: the radial noise component of a sweep
/// mean dominated by a static reflector. Without a reflector the divergence
/// is smaller.
pub const INTER_NOISE_BASELINE: f32 = 0.564_19;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterFrameEstimator {
    fast_alpha: f32,
    slow_alpha: f32,
    deviation_alpha: f32,
    output_alpha: f32,
    output_time_const_s: f32,
    frame_interval_s: f32,
    timeout_s: f32,
    threshold: f32,
    sqrt_sweeps: f32,
    phase_boost: bool,
    enabled: bool,
}

impl InterFrameEstimator {
    #[must_use]
    pub fn new(config: &PresenceConfig, factors: &SmoothingFactors) -> Self {
        Self {
            fast_alpha: factors.inter_fast,
            slow_alpha: factors.inter_slow,
            deviation_alpha: factors.inter_deviation,
            output_alpha: factors.inter_output,
            output_time_const_s: config.inter_output_time_const(),
            frame_interval_s: 1.0 / config.frame_rate(),
            timeout_s: f32::from(config.inter_frame_presence_timeout()),
            threshold: config.inter_detection_threshold(),
            sqrt_sweeps: f32::from(config.sweeps_per_frame()).sqrt(),
            phase_boost: config.inter_phase_boost(),
            enabled: config.inter_detection(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advance the inter part of `state`; returns the depthwise score.
    ///
    /// `seeding` is set on the first frame after creation or reset, which
    /// initialises the amplitude filters and phase reference to the current
    /// frame instead of ramping up from zero.
    pub fn update(
        &self,
        state: &mut FilterState,
        stats: &PointStatistics,
        noise: f32,
        seeding: bool,
    ) -> f32 {
        let amplitude = stats.mean.norm();
        if seeding {
            state.inter_fast = amplitude;
            state.inter_slow = amplitude;
            state.phase_reference = stats.mean;
        } else {
            low_pass(&mut state.inter_fast, amplitude, self.fast_alpha);
            low_pass(&mut state.inter_slow, amplitude, self.slow_alpha);
        }

        let mut deviation = (state.inter_fast - state.inter_slow).abs();
        if self.phase_boost {
            deviation = deviation.max(self.phase_arc(state, stats, noise));
        }
        // The reference always tracks, so enabling boost later starts settled.
        low_pass_complex(&mut state.phase_reference, stats.mean, self.slow_alpha);

        low_pass(&mut state.inter_deviation, deviation, self.deviation_alpha);
        let normalized =
            (state.inter_deviation * self.sqrt_sweeps / noise - INTER_NOISE_BASELINE).max(0.0);

        let previous = state.inter_output;
        low_pass(&mut state.inter_output, normalized, self.output_alpha);
        self.apply_timeout(state, previous);

        if self.enabled {
            state.inter_output
        } else {
            0.0
        }
    }

    /// Arc length travelled by the sweep mean relative to the phase reference.
    fn phase_arc(&self, state: &FilterState, stats: &PointStatistics, noise: f32) -> f32 {
        let reference = state.phase_reference;
        if reference.norm() * self.sqrt_sweeps / noise <= PHASE_BOOST_MIN_SNR {
            return 0.0;
        }
        let shift = (stats.mean * reference.conj()).arg().abs();
        shift * stats.mean.norm()
    }

    fn apply_timeout(&self, state: &mut FilterState, previous: f32) {
        if self.timeout_s <= 0.0 {
            return;
        }
        // Only a decline below the threshold counts.
        if state.inter_output >= previous || state.inter_output >= self.threshold {
            state.decline_s = 0.0;
            return;
        }
        state.decline_s += self.frame_interval_s;

        let excess = state.decline_s - self.timeout_s;
        if excess > 0.0 && self.output_time_const_s > 0.0 {
            let rate = excess / (self.output_time_const_s * self.output_time_const_s);
            state.inter_output *= (-rate * self.frame_interval_s).exp();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    fn estimator(config: PresenceConfig) -> InterFrameEstimator {
        InterFrameEstimator::new(&config, &SmoothingFactors::from_config(&config))
    }

    fn at(amplitude: f32, phase: f32) -> PointStatistics {
        PointStatistics {
            mean: Complex32::from_polar(amplitude, phase),
            sweep_deviation: 0.0,
        }
    }

    #[test]
    fn seeding_suppresses_start_up_transient() {
        let est = estimator(PresenceConfig::default());
        let mut state = FilterState::default();
        assert_eq!(est.update(&mut state, &at(500.0, 0.0), 5.0, true), 0.0);
        assert_eq!(est.update(&mut state, &at(500.0, 0.0), 5.0, false), 0.0);
    }

    #[test]
    fn amplitude_step_raises_score() {
        let est = estimator(PresenceConfig::default());
        let mut state = FilterState::default();
        est.update(&mut state, &at(0.0, 0.0), 5.0, true);
        let mut scores = Vec::new();
        for _ in 0..5 {
            scores.push(est.update(&mut state, &at(100.0, 0.0), 5.0, false));
        }
        assert!(scores.windows(2).all(|w| w[1] > w[0]));
        assert!(scores[4] > 1.0);
    }

    #[test]
    fn phase_rotation_only_counts_with_boost() {
        let run = |boost: bool| {
            let est = estimator(PresenceConfig::builder().inter_phase_boost(boost).build());
            let mut state = FilterState::default();
            let mut score = 0.0;
            for i in 0..30 {
                score = est.update(&mut state, &at(300.0, 0.3 * i as f32), 5.0, i == 0);
            }
            score
        };
        assert!(run(false) < 1e-3);
        assert!(run(true) > 1.0);
    }

    #[test]
    fn phase_of_weak_reference_is_ignored() {
        let est = estimator(PresenceConfig::builder().inter_phase_boost(true).build());
        let mut state = FilterState::default();
        let mut score = 0.0;
        // |reference| * 4 / 20 stays below the SNR gate
        for i in 0..30 {
            score = est.update(&mut state, &at(10.0, 0.3 * i as f32), 20.0, i == 0);
        }
        assert!(score < 1e-3);
    }

    #[test]
    fn timeout_accelerates_long_declines() {
        let decay = |timeout: u16| {
            let config = PresenceConfig::builder()
                .frame_rate(10.0)
                .inter_frame_presence_timeout(timeout)
                .build();
            let est = estimator(config);
            let mut state = FilterState {
                inter_output: 0.9,
                ..FilterState::default()
            };
            let mut trace = Vec::new();
            for _ in 0..60 {
                trace.push(est.update(&mut state, &at(0.0, 0.0), 1.0, false));
            }
            (trace, state.decline_s)
        };
        let (natural, natural_decline) = decay(0);
        let (accelerated, decline) = decay(2);

        // identical for the first two seconds of decline
        assert_eq!(natural[..19], accelerated[..19]);
        assert!(accelerated[30] < natural[30]);
        assert!(accelerated[59] < 0.25 * natural[59]);
        assert_eq!(natural_decline, 0.0);
        assert!(decline > 5.0);
    }

    #[test]
    fn rising_score_resets_decline_time() {
        let est = estimator(PresenceConfig::builder().frame_rate(10.0).build());
        let mut state = FilterState {
            inter_output: 0.8,
            ..FilterState::default()
        };
        for _ in 0..5 {
            est.update(&mut state, &at(0.0, 0.0), 1.0, false);
        }
        assert!(state.decline_s > 0.4);
        state.inter_deviation = 50.0;
        est.update(&mut state, &at(0.0, 0.0), 1.0, false);
        assert_eq!(state.decline_s, 0.0);
    }

    #[test]
    fn decline_above_threshold_is_not_timed() {
        let config = PresenceConfig::builder()
            .frame_rate(10.0)
            .inter_frame_presence_timeout(1)
            .build();
        let est = estimator(config);
        let mut state = FilterState {
            inter_output: 10.0,
            ..FilterState::default()
        };
        for _ in 0..20 {
            est.update(&mut state, &at(0.0, 0.0), 1.0, false);
        }
        assert!(state.inter_output > 1.0);
        assert_eq!(state.decline_s, 0.0);

        while state.inter_output >= 1.0 {
            est.update(&mut state, &at(0.0, 0.0), 1.0, false);
        }
        assert!(state.decline_s > 0.0 && state.decline_s < 0.15);
    }

    #[test]
    fn noise_level_divergence_decays_to_zero() {
        let est = estimator(PresenceConfig::default());
        let mut state = FilterState {
            inter_output: 2.0,
            ..FilterState::default()
        };
        est.update(&mut state, &at(100.0, 0.0), 10.0, true);
        let mut score = f32::MAX;
        for i in 0..300 {
            // amplitude wobble of half a noise unit of the sweep mean
            let amplitude = if i % 2 == 0 { 101.25 } else { 98.75 };
            score = est.update(&mut state, &at(amplitude, 0.0), 10.0, false);
        }
        assert!(score < 1e-3, "score {score}");
    }
}
