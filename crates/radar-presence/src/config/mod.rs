//! Presence detector configuration.
//!
//! [`PresenceConfig`] carries the measurement interval, the sensor settings
//! and every filter knob of the detection pipeline. Setters never validate
//! across fields; [`PresenceConfig::validate`] runs when the configuration is
//! handed to [`PresenceDetector::create`](crate::PresenceDetector::create) or
//! [`PresenceDetector::prepare`](crate::PresenceDetector::prepare).

pub mod profile;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
pub use profile::{IdleState, Prf, Profile};

/// Fewest sweeps per frame the noise estimate can work with.
pub const MIN_SWEEPS_PER_FRAME: u16 = 6;

/// Most sweeps per frame a sensor can deliver.
pub const MAX_SWEEPS_PER_FRAME: u16 = 4095;

/// Longest inter-frame presence timeout, in seconds.
pub const MAX_PRESENCE_TIMEOUT_S: u16 = 30;

/// Largest hardware accelerated average samples setting.
pub const MAX_HWAAS: u16 = 511;

/// Returns `true` for step lengths the sensor can sample with: divisors of
/// 24 and multiples of 24.
#[must_use]
pub fn is_valid_step_length(step_length: u16) -> bool {
    step_length != 0 && (24 % step_length == 0 || step_length % 24 == 0)
}

/// Configuration of a presence detector.
///
/// Fields are private; use the accessor pairs or [`PresenceConfig::builder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    start_m: f32,
    end_m: f32,
    step_length: u16,
    auto_step_length: bool,
    profile: Profile,
    auto_profile: bool,
    sensor_id: u32,
    inter_frame_idle_state: IdleState,
    hwaas: u16,
    sweeps_per_frame: u16,
    frame_rate: f32,
    frame_rate_app_driven: bool,
    reset_filters_on_prepare: bool,
    inter_frame_presence_timeout: u16,
    inter_phase_boost: bool,
    intra_detection: bool,
    intra_detection_threshold: f32,
    inter_detection: bool,
    inter_detection_threshold: f32,
    inter_frame_deviation_time_const: f32,
    inter_frame_fast_cutoff: f32,
    inter_frame_slow_cutoff: f32,
    intra_frame_time_const: f32,
    intra_output_time_const: f32,
    inter_output_time_const: f32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            start_m: 0.3,
            end_m: 2.5,
            step_length: 24,
            auto_step_length: true,
            profile: Profile::Profile4,
            auto_profile: true,
            sensor_id: 1,
            inter_frame_idle_state: IdleState::DeepSleep,
            hwaas: 32,
            sweeps_per_frame: 16,
            frame_rate: 12.0,
            frame_rate_app_driven: false,
            reset_filters_on_prepare: true,
            inter_frame_presence_timeout: 3,
            inter_phase_boost: false,
            intra_detection: true,
            intra_detection_threshold: 1.3,
            inter_detection: true,
            inter_detection_threshold: 1.0,
            inter_frame_deviation_time_const: 0.5,
            inter_frame_fast_cutoff: 20.0,
            inter_frame_slow_cutoff: 0.2,
            intra_frame_time_const: 0.15,
            intra_output_time_const: 0.3,
            inter_output_time_const: 2.0,
        }
    }
}

/// Generates the getter/setter pair on [`PresenceConfig`] and the chained
/// setter on [`PresenceConfigBuilder`] for each field.
macro_rules! config_fields {
    ($($(#[doc = $doc:literal])* $field:ident, $setter:ident: $ty:ty;)+) => {
        impl PresenceConfig {
            $(
                $(#[doc = $doc])*
                #[must_use]
                pub fn $field(&self) -> $ty {
                    self.$field
                }

                $(#[doc = $doc])*
                pub fn $setter(&mut self, value: $ty) {
                    self.$field = value;
                }
            )+
        }

        impl PresenceConfigBuilder {
            $(
                $(#[doc = $doc])*
                #[must_use]
                pub fn $field(mut self, value: $ty) -> Self {
                    self.config.$field = value;
                    self
                }
            )+
        }
    };
}

config_fields! {
    /// Start of the measured interval in meters.
    start_m, set_start_m: f32;
    /// End of the measured interval in meters.
    end_m, set_end_m: f32;
    /// Step length in base points, used when auto step length is off.
    step_length, set_step_length: u16;
    /// Derive the step length from the profile's FWHM.
    auto_step_length, set_auto_step_length: bool;
    /// Profile, used when auto profile is off.
    profile, set_profile: Profile;
    /// Pick the highest profile whose leakage skirt ends before the start.
    auto_profile, set_auto_profile: bool;
    /// Sensor the detector drives.
    sensor_id, set_sensor_id: u32;
    /// Sensor state between frames.
    inter_frame_idle_state, set_inter_frame_idle_state: IdleState;
    /// Hardware accelerated average samples per point.
    hwaas, set_hwaas: u16;
    /// Sweeps per frame.
    sweeps_per_frame, set_sweeps_per_frame: u16;
    /// Frame rate in Hz.
    frame_rate, set_frame_rate: f32;
    /// The application triggers frames itself at `frame_rate`.
    frame_rate_app_driven, set_frame_rate_app_driven: bool;
    /// Reset all filters when the detector is prepared.
    reset_filters_on_prepare, set_reset_filters_on_prepare: bool;
    /// Seconds of decline before the inter-frame score decays faster. 0 disables.
    inter_frame_presence_timeout, set_inter_frame_presence_timeout: u16;
    /// Use phase as well as amplitude for inter-frame deviation.
    inter_phase_boost, set_inter_phase_boost: bool;
    /// Enable intra-frame (fast motion) detection.
    intra_detection, set_intra_detection: bool;
    /// Intra-frame detection threshold.
    intra_detection_threshold, set_intra_detection_threshold: f32;
    /// Enable inter-frame (slow motion) detection.
    inter_detection, set_inter_detection: bool;
    /// Inter-frame detection threshold.
    inter_detection_threshold, set_inter_detection_threshold: f32;
    /// Time constant of the inter-frame deviation filter, in seconds.
    inter_frame_deviation_time_const, set_inter_frame_deviation_time_const: f32;
    /// Cutoff of the fast inter-frame amplitude filter, in Hz.
    inter_frame_fast_cutoff, set_inter_frame_fast_cutoff: f32;
    /// Cutoff of the slow inter-frame amplitude filter, in Hz.
    inter_frame_slow_cutoff, set_inter_frame_slow_cutoff: f32;
    /// Time constant of the intra-frame deviation filter, in seconds.
    intra_frame_time_const, set_intra_frame_time_const: f32;
    /// Time constant of the intra-frame output filter, in seconds.
    intra_output_time_const, set_intra_output_time_const: f32;
    /// Time constant of the inter-frame output filter, in seconds.
    inter_output_time_const, set_inter_output_time_const: f32;
}

impl PresenceConfig {
    /// Configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder starting from the defaults.
    pub fn builder() -> PresenceConfigBuilder {
        PresenceConfigBuilder::new()
    }

    /// Check every field and the relations between them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.start_m.is_finite() || self.start_m < 0.0 {
            return Err(ConfigError::InvalidStart {
                start_m: self.start_m,
            });
        }
        if !self.end_m.is_finite() || self.end_m <= self.start_m {
            return Err(ConfigError::InvalidRange {
                start_m: self.start_m,
                end_m: self.end_m,
            });
        }
        let max_m = Prf::Prf5_2MHz.max_measurable_distance_m();
        if self.end_m > max_m {
            return Err(ConfigError::RangeTooLong {
                end_m: self.end_m,
                max_m,
            });
        }
        if !self.auto_step_length && !is_valid_step_length(self.step_length) {
            return Err(ConfigError::StepLength {
                value: self.step_length,
            });
        }
        if !(1..=MAX_HWAAS).contains(&self.hwaas) {
            return Err(ConfigError::Hwaas { value: self.hwaas });
        }
        if !(MIN_SWEEPS_PER_FRAME..=MAX_SWEEPS_PER_FRAME).contains(&self.sweeps_per_frame) {
            return Err(ConfigError::SweepsPerFrame {
                value: self.sweeps_per_frame,
                min: MIN_SWEEPS_PER_FRAME,
                max: MAX_SWEEPS_PER_FRAME,
            });
        }
        // Filter coefficients are derived from the frame interval, so an
        // app-driven detector still needs the nominal rate.
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ConfigError::FrameRate {
                value: self.frame_rate,
            });
        }
        if self.inter_frame_presence_timeout > MAX_PRESENCE_TIMEOUT_S {
            return Err(ConfigError::PresenceTimeout {
                value: self.inter_frame_presence_timeout,
                max: MAX_PRESENCE_TIMEOUT_S,
            });
        }

        for (name, value) in [
            ("intra_detection_threshold", self.intra_detection_threshold),
            ("inter_detection_threshold", self.inter_detection_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Threshold { name, value });
            }
        }
        for (name, value) in [
            (
                "inter_frame_deviation_time_const",
                self.inter_frame_deviation_time_const,
            ),
            ("intra_frame_time_const", self.intra_frame_time_const),
            ("intra_output_time_const", self.intra_output_time_const),
            ("inter_output_time_const", self.inter_output_time_const),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::TimeConstant { name, value });
            }
        }
        for (name, value) in [
            ("inter_frame_fast_cutoff", self.inter_frame_fast_cutoff),
            ("inter_frame_slow_cutoff", self.inter_frame_slow_cutoff),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Cutoff { name, value });
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Emit every field at info level.
    pub fn log(&self) {
        tracing::info!(
            start_m = self.start_m,
            end_m = self.end_m,
            step_length = self.step_length,
            auto_step_length = self.auto_step_length,
            profile = %self.profile,
            auto_profile = self.auto_profile,
            sensor_id = self.sensor_id,
            inter_frame_idle_state = %self.inter_frame_idle_state,
            hwaas = self.hwaas,
            sweeps_per_frame = self.sweeps_per_frame,
            frame_rate = self.frame_rate,
            frame_rate_app_driven = self.frame_rate_app_driven,
            reset_filters_on_prepare = self.reset_filters_on_prepare,
            "presence config (measurement)"
        );
        tracing::info!(
            inter_frame_presence_timeout = self.inter_frame_presence_timeout,
            inter_phase_boost = self.inter_phase_boost,
            intra_detection = self.intra_detection,
            intra_detection_threshold = self.intra_detection_threshold,
            inter_detection = self.inter_detection,
            inter_detection_threshold = self.inter_detection_threshold,
            inter_frame_deviation_time_const = self.inter_frame_deviation_time_const,
            inter_frame_fast_cutoff = self.inter_frame_fast_cutoff,
            inter_frame_slow_cutoff = self.inter_frame_slow_cutoff,
            intra_frame_time_const = self.intra_frame_time_const,
            intra_output_time_const = self.intra_output_time_const,
            inter_output_time_const = self.inter_output_time_const,
            "presence config (filters)"
        );
    }
}

/// Builder for [`PresenceConfig`].
#[derive(Debug, Clone, Default)]
pub struct PresenceConfigBuilder {
    config: PresenceConfig,
}

impl PresenceConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set start and end of the measured interval in one call.
    #[must_use]
    pub fn range_m(mut self, start_m: f32, end_m: f32) -> Self {
        self.config.start_m = start_m;
        self.config.end_m = end_m;
        self
    }

    /// Finish without validating; validation runs on create/prepare.
    pub fn build(self) -> PresenceConfig {
        self.config
    }
}
