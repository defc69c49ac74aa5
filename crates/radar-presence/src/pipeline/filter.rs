//! Single-pole exponential smoothing.
//!
//! Every stage of the pipeline is `x += alpha * (sample - x)`. The smoothing
//! factor comes from either a time constant or a cutoff frequency together
//! with the frame interval.

use std::f32::consts::PI;

use num_complex::Complex32;

/// Smoothing factor for time constant `time_const_s` at `frame_rate_hz`.
///
/// A zero time constant gives `1.0` (no smoothing).
#[must_use]
pub fn alpha_from_time_const(time_const_s: f32, frame_rate_hz: f32) -> f32 {
    if time_const_s <= 0.0 {
        return 1.0;
    }
    let dt = 1.0 / frame_rate_hz;
    1.0 - (-dt / time_const_s).exp()
}

/// Smoothing factor for cutoff `cutoff_hz` at `frame_rate_hz`.
///
/// A cutoff above the Nyquist frequency gives `1.0` (pass-through).
#[must_use]
pub fn alpha_from_cutoff(cutoff_hz: f32, frame_rate_hz: f32) -> f32 {
    if cutoff_hz > frame_rate_hz / 2.0 {
        return 1.0;
    }
    1.0 - (-2.0 * PI * cutoff_hz / frame_rate_hz).exp()
}

/// Advance `state` towards `sample`.
#[inline]
pub fn low_pass(state: &mut f32, sample: f32, alpha: f32) {
    *state += alpha * (sample - *state);
}

/// Complex variant of [`low_pass`].
#[inline]
pub fn low_pass_complex(state: &mut Complex32, sample: Complex32, alpha: f32) {
    *state += (sample - *state) * alpha;
}

/// Smoothing factors of every stage, derived once per configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingFactors {
    pub inter_fast: f32,
    pub inter_slow: f32,
    pub inter_deviation: f32,
    pub inter_output: f32,
    pub intra: f32,
    pub intra_output: f32,
    pub noise: f32,
}

/// Time constant of the noise estimate, in seconds.
pub const NOISE_TIME_CONST_S: f32 = 1.0;

impl SmoothingFactors {
    /// Derive all factors from a validated configuration.
    #[must_use]
    pub fn from_config(config: &crate::PresenceConfig) -> Self {
        let fs = config.frame_rate();
        Self {
            inter_fast: alpha_from_cutoff(config.inter_frame_fast_cutoff(), fs),
            inter_slow: alpha_from_cutoff(config.inter_frame_slow_cutoff(), fs),
            inter_deviation: alpha_from_time_const(config.inter_frame_deviation_time_const(), fs),
            inter_output: alpha_from_time_const(config.inter_output_time_const(), fs),
            intra: alpha_from_time_const(config.intra_frame_time_const(), fs),
            intra_output: alpha_from_time_const(config.intra_output_time_const(), fs),
            noise: alpha_from_time_const(NOISE_TIME_CONST_S, fs),
        }
    }
}
