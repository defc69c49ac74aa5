//! Resolution of a configuration into concrete measurement geometry.
//!
//! Distances in a [`PresenceConfig`] are meters; the sensor samples on a grid
//! of base points 2.5 mm apart. The resolver picks the profile and step length
//! (when set to auto), snaps the interval to the grid and derives the point
//! count every per-point array is sized from.

use serde::{Deserialize, Serialize};

use crate::config::{is_valid_step_length, IdleState, PresenceConfig, Prf, Profile};
use crate::error::ConfigError;

/// Distance between two adjacent base points, in meters.
pub const BASE_STEP_LENGTH_M: f32 = 0.0025;

/// Upper bound on resolved points per frame.
pub const MAX_NUM_POINTS: u16 = 2048;

/// Measurement geometry derived from a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresenceMetadata {
    /// Distance of the first point in meters.
    pub start_m: f32,
    /// Distance between adjacent points in meters.
    pub step_length_m: f32,
    /// Number of points per sweep.
    pub num_points: u16,
    /// Resolved profile.
    pub profile: Profile,
    /// First point in base points.
    pub start_point: i32,
    /// Step length in base points.
    pub step_length: u16,
}

impl PresenceMetadata {
    /// Distance in meters of point `index`.
    #[must_use]
    pub fn distance_m(&self, index: usize) -> f32 {
        self.start_m + self.step_length_m * index as f32
    }

    /// Distance of the last point in meters.
    #[must_use]
    pub fn end_m(&self) -> f32 {
        self.distance_m(usize::from(self.num_points.saturating_sub(1)))
    }
}

/// Settings pushed to the sensor when the detector is prepared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub sensor_id: u32,
    pub start_point: i32,
    pub num_points: u16,
    pub step_length: u16,
    pub profile: Profile,
    pub prf: Prf,
    pub hwaas: u16,
    pub sweeps_per_frame: u16,
    /// `None` when the application triggers frames itself.
    pub frame_rate: Option<f32>,
    pub inter_frame_idle_state: IdleState,
}

/// Highest profile whose leakage skirt ends before `start_m`.
#[must_use]
pub fn auto_profile(start_m: f32) -> Profile {
    Profile::ALL
        .into_iter()
        .rev()
        .find(|p| p.min_start_m().map_or(true, |min| min <= start_m))
        .unwrap_or(Profile::Profile1)
}

/// Longest valid step that keeps sampling within the profile's main lobe.
#[must_use]
pub fn auto_step_length(profile: Profile) -> u16 {
    // Small bias so that exact ratios are not floored one point short.
    let max_step = (profile.fwhm_m() / BASE_STEP_LENGTH_M + 1e-3).floor() as u16;
    largest_valid_step_length(max_step.max(1))
}

fn largest_valid_step_length(max_step: u16) -> u16 {
    if max_step >= 24 {
        max_step / 24 * 24
    } else {
        (1..=max_step)
            .rev()
            .find(|&s| is_valid_step_length(s))
            .unwrap_or(1)
    }
}

/// Validate `config` and derive its metadata and sensor settings.
pub fn resolve(config: &PresenceConfig) -> Result<(PresenceMetadata, SensorConfig), ConfigError> {
    config.validate()?;

    let profile = if config.auto_profile() {
        auto_profile(config.start_m())
    } else {
        config.profile()
    };
    let step_length = if config.auto_step_length() {
        auto_step_length(profile)
    } else {
        config.step_length()
    };

    let start_point = (config.start_m() / BASE_STEP_LENGTH_M).round() as i32;
    let end_point = (config.end_m() / BASE_STEP_LENGTH_M).round() as i32;
    let span = (end_point - start_point).max(0);
    let step = i32::from(step_length);
    let num_points = (span + step - 1) / step + 1;
    let num_points = num_points.clamp(1, i32::from(MAX_NUM_POINTS)) as u16;

    let metadata = PresenceMetadata {
        start_m: start_point as f32 * BASE_STEP_LENGTH_M,
        step_length_m: f32::from(step_length) * BASE_STEP_LENGTH_M,
        num_points,
        profile,
        start_point,
        step_length,
    };

    let prf = Prf::select(profile, metadata.end_m()).ok_or(ConfigError::RangeTooLong {
        end_m: metadata.end_m(),
        max_m: Prf::Prf5_2MHz.max_measurable_distance_m(),
    })?;

    let sensor = SensorConfig {
        sensor_id: config.sensor_id(),
        start_point,
        num_points,
        step_length,
        profile,
        prf,
        hwaas: config.hwaas(),
        sweeps_per_frame: config.sweeps_per_frame(),
        frame_rate: (!config.frame_rate_app_driven()).then_some(config.frame_rate()),
        inter_frame_idle_state: config.inter_frame_idle_state(),
    };

    tracing::debug!(
        start_m = metadata.start_m,
        step_length_m = metadata.step_length_m,
        num_points,
        profile = %profile,
        prf_hz = prf.frequency_hz(),
        "resolved presence metadata"
    );

    Ok((metadata, sensor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn auto_profile_respects_leakage_skirt() {
        assert_eq!(auto_profile(0.05), Profile::Profile1);
        assert_eq!(auto_profile(0.2), Profile::Profile2);
        assert_eq!(auto_profile(0.3), Profile::Profile3);
        assert_eq!(auto_profile(0.38), Profile::Profile4);
        assert_eq!(auto_profile(0.64), Profile::Profile5);
        assert_eq!(auto_profile(5.0), Profile::Profile5);
    }

    #[test]
    fn auto_step_stays_within_fwhm() {
        assert_eq!(auto_step_length(Profile::Profile1), 12);
        assert_eq!(auto_step_length(Profile::Profile2), 24);
        assert_eq!(auto_step_length(Profile::Profile3), 48);
        assert_eq!(auto_step_length(Profile::Profile4), 72);
        assert_eq!(auto_step_length(Profile::Profile5), 120);
        for p in Profile::ALL {
            let step_m = f32::from(auto_step_length(p)) * BASE_STEP_LENGTH_M;
            assert!(step_m <= p.fwhm_m() + 1e-6);
        }
    }

    #[test]
    fn largest_step_below_24_is_a_divisor() {
        assert_eq!(largest_valid_step_length(23), 12);
        assert_eq!(largest_valid_step_length(7), 6);
        assert_eq!(largest_valid_step_length(1), 1);
        assert_eq!(largest_valid_step_length(100), 96);
    }

    #[test]
    fn short_range_resolves_to_profile_two_grid() {
        let config = PresenceConfig::builder().range_m(0.2, 1.0).build();
        let (meta, sensor) = resolve(&config).unwrap();
        assert_eq!(meta.profile, Profile::Profile2);
        assert_eq!(meta.step_length, 24);
        assert_abs_diff_eq!(meta.step_length_m, 0.06, epsilon = 1e-6);
        assert_eq!(meta.num_points, 15);
        assert_eq!(meta.start_point, 80);
        assert_abs_diff_eq!(meta.distance_m(5), 0.5, epsilon = 1e-5);
        assert_eq!(sensor.prf, Prf::Prf15_6MHz);
        assert_eq!(sensor.frame_rate, Some(12.0));
    }

    #[test]
    fn default_config_resolves() {
        let (meta, _) = resolve(&PresenceConfig::default()).unwrap();
        assert_eq!(meta.profile, Profile::Profile3);
        assert_eq!(meta.step_length, 48);
        // 120..=1000 base points in steps of 48
        assert_eq!(meta.num_points, 20);
        assert!(meta.end_m() >= 2.5 - 1e-4);
    }

    #[test]
    fn manual_settings_override_auto() {
        let config = PresenceConfig::builder()
            .range_m(0.2, 1.0)
            .auto_profile(false)
            .profile(Profile::Profile5)
            .auto_step_length(false)
            .step_length(8)
            .frame_rate_app_driven(true)
            .build();
        let (meta, sensor) = resolve(&config).unwrap();
        assert_eq!(meta.profile, Profile::Profile5);
        assert_eq!(meta.step_length, 8);
        assert_eq!(meta.num_points, 41);
        assert_eq!(sensor.frame_rate, None);
    }

    #[test]
    fn point_count_is_clamped() {
        let config = PresenceConfig::builder()
            .range_m(0.0, 20.0)
            .auto_step_length(false)
            .step_length(1)
            .build();
        let (meta, _) = resolve(&config).unwrap();
        assert_eq!(meta.num_points, MAX_NUM_POINTS);
    }

    #[test]
    fn invalid_config_does_not_resolve() {
        let config = PresenceConfig::builder().range_m(1.0, 0.5).build();
        assert!(matches!(resolve(&config), Err(ConfigError::InvalidRange { .. })));
    }
}
