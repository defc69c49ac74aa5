//! Per-point filter state and frame statistics.
//!
//! The bank owns one [`FilterState`] per range point plus a noise estimate
//! pooled over all points. Each frame it reduces the sweeps of every point to
//! [`PointStatistics`] and hands them to the estimators, which advance their
//! part of the point's state.

use num_complex::Complex32;

use super::filter::low_pass;
use super::inter_frame::InterFrameEstimator;
use super::intra_frame::IntraFrameEstimator;
use crate::frame::ProcessedFrame;

/// Noise is never assumed to be below one ADC count.
pub const NOISE_FLOOR: f32 = 1.0;

/// Energy gain of the third-order difference `[1, -3, 3, -1]` on white noise.
const DIFF_NOISE_GAIN: f32 = 20.0;

/// Filter state of one range point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    /// Fast low-pass of the absolute sweep mean.
    pub inter_fast: f32,
    /// Slow low-pass of the absolute sweep mean.
    pub inter_slow: f32,
    /// Low-passed fast/slow deviation.
    pub inter_deviation: f32,
    /// Reported inter-frame score.
    pub inter_output: f32,
    /// Low-passed sweep deviation.
    pub intra: f32,
    /// Reported intra-frame score.
    pub intra_output: f32,
    /// Seconds the inter-frame score has been declining.
    pub decline_s: f32,
    /// Slow complex low-pass of the sweep mean, for phase boost.
    pub phase_reference: Complex32,
}

/// What one frame says about one point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointStatistics {
    /// Mean over sweeps.
    pub mean: Complex32,
    /// Sample standard deviation over sweeps.
    pub sweep_deviation: f32,
}

/// Filter states of all points of one detector.
#[derive(Debug, Clone)]
pub struct FilterBank {
    states: Vec<FilterState>,
    statistics: Vec<PointStatistics>,
    column: Vec<Complex32>,
    noise: f32,
    noise_alpha: f32,
    primed: bool,
}

impl FilterBank {
    /// Bank for `num_points` points and frames of `sweeps_per_frame` sweeps.
    #[must_use]
    pub fn new(num_points: usize, sweeps_per_frame: usize, noise_alpha: f32) -> Self {
        Self {
            states: vec![FilterState::default(); num_points],
            statistics: vec![PointStatistics::default(); num_points],
            column: Vec::with_capacity(sweeps_per_frame),
            noise: 0.0,
            noise_alpha,
            primed: false,
        }
    }

    /// Return every point to the neutral state. The next frame seeds the filters.
    pub fn reset(&mut self) {
        self.states.fill(FilterState::default());
        self.noise = 0.0;
        self.primed = false;
    }

    pub(crate) fn set_noise_alpha(&mut self, noise_alpha: f32) {
        self.noise_alpha = noise_alpha;
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.states.len()
    }

    /// `false` until the first frame after creation or reset.
    #[must_use]
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    #[must_use]
    pub fn states(&self) -> &[FilterState] {
        &self.states
    }

    /// Noise estimate used for normalisation, in ADC counts.
    #[must_use]
    pub fn noise(&self) -> f32 {
        self.noise.max(NOISE_FLOOR)
    }

    /// Advance every point by one frame and write the depthwise scores.
    ///
    /// Cannot fail: once called, the whole bank moves forward one frame.
    pub fn advance(
        &mut self,
        frame: &ProcessedFrame<'_>,
        intra: &IntraFrameEstimator,
        inter: &InterFrameEstimator,
        intra_scores: &mut [f32],
        inter_scores: &mut [f32],
    ) {
        debug_assert_eq!(frame.num_points(), self.states.len());
        let seeding = !self.primed;

        let noise_sample = self.measure(frame);
        if seeding {
            self.noise = noise_sample;
        } else {
            low_pass(&mut self.noise, noise_sample, self.noise_alpha);
        }
        let noise = self.noise();

        for (((state, stats), intra_score), inter_score) in self
            .states
            .iter_mut()
            .zip(&self.statistics)
            .zip(intra_scores.iter_mut())
            .zip(inter_scores.iter_mut())
        {
            *intra_score = intra.update(state, stats, noise);
            *inter_score = inter.update(state, stats, noise, seeding);
        }

        self.primed = true;
    }

    /// Fill `statistics` for this frame and return the frame's noise level.
    fn measure(&mut self, frame: &ProcessedFrame<'_>) -> f32 {
        let sweeps = frame.sweeps_per_frame();
        let mut diff_energy = 0.0f32;
        let mut diff_count = 0usize;

        for (point, stats) in self.statistics.iter_mut().enumerate() {
            self.column.clear();
            self.column.extend((0..sweeps).map(|sweep| {
                let s = frame.sample(sweep, point);
                Complex32::new(f32::from(s.re), f32::from(s.im))
            }));

            let mean = self.column.iter().sum::<Complex32>() / sweeps as f32;
            let spread: f32 = self.column.iter().map(|x| (x - mean).norm_sqr()).sum();
            *stats = PointStatistics {
                mean,
                sweep_deviation: (spread / (sweeps - 1) as f32).sqrt(),
            };

            for w in self.column.windows(4) {
                let d = w[3] - w[2] * 3.0 + w[1] * 3.0 - w[0];
                diff_energy += d.norm_sqr();
            }
            diff_count += sweeps.saturating_sub(3);
        }

        if diff_count == 0 {
            return 0.0;
        }
        (diff_energy / (diff_count as f32 * DIFF_NOISE_GAIN)).sqrt()
    }
}
