//! Sensor profile, pulse repetition frequency and idle state tables.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// Radar profile, trading depth resolution for gain.
///
/// Higher profiles use longer pulses: more energy on target, wider main lobe
/// and a longer direct-leakage skirt close to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Profile {
    /// Shortest pulse, finest resolution.
    Profile1 = 1,
    Profile2 = 2,
    Profile3 = 3,
    Profile4 = 4,
    /// Longest pulse, highest gain.
    Profile5 = 5,
}

impl Profile {
    /// All profiles in ascending order.
    pub const ALL: [Profile; 5] = [
        Profile::Profile1,
        Profile::Profile2,
        Profile::Profile3,
        Profile::Profile4,
        Profile::Profile5,
    ];

    /// Full width at half maximum of the main lobe, in meters.
    #[must_use]
    pub fn fwhm_m(self) -> f32 {
        match self {
            Profile::Profile1 => 0.04,
            Profile::Profile2 => 0.07,
            Profile::Profile3 => 0.14,
            Profile::Profile4 => 0.19,
            Profile::Profile5 => 0.32,
        }
    }

    /// Closest start distance not reached by the direct-leakage skirt.
    ///
    /// `None` for profile 1, which can start anywhere.
    #[must_use]
    pub fn min_start_m(self) -> Option<f32> {
        match self {
            Profile::Profile1 => None,
            other => Some(2.0 * other.fwhm_m()),
        }
    }
}

impl TryFrom<u32> for Profile {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Profile::Profile1),
            2 => Ok(Profile::Profile2),
            3 => Ok(Profile::Profile3),
            4 => Ok(Profile::Profile4),
            5 => Ok(Profile::Profile5),
            _ => Err(ConfigError::Profile { value }),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PROFILE_{}", *self as u8)
    }
}

/// Pulse repetition frequency. Bounds the maximum measurable distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prf {
    /// 19.5 MHz, profile 1 only.
    Prf19_5MHz,
    Prf15_6MHz,
    Prf13_0MHz,
    Prf8_7MHz,
    Prf6_5MHz,
    Prf5_2MHz,
}

impl Prf {
    /// Fastest first.
    pub const ALL: [Prf; 6] = [
        Prf::Prf19_5MHz,
        Prf::Prf15_6MHz,
        Prf::Prf13_0MHz,
        Prf::Prf8_7MHz,
        Prf::Prf6_5MHz,
        Prf::Prf5_2MHz,
    ];

    /// Frequency in Hz.
    #[must_use]
    pub fn frequency_hz(self) -> f32 {
        match self {
            Prf::Prf19_5MHz => 19.5e6,
            Prf::Prf15_6MHz => 15.6e6,
            Prf::Prf13_0MHz => 13.0e6,
            Prf::Prf8_7MHz => 8.7e6,
            Prf::Prf6_5MHz => 6.5e6,
            Prf::Prf5_2MHz => 5.2e6,
        }
    }

    /// Maximum measurable distance in meters.
    #[must_use]
    pub fn max_measurable_distance_m(self) -> f32 {
        match self {
            Prf::Prf19_5MHz => 3.1,
            Prf::Prf15_6MHz => 5.1,
            Prf::Prf13_0MHz => 7.0,
            Prf::Prf8_7MHz => 12.7,
            Prf::Prf6_5MHz => 18.5,
            Prf::Prf5_2MHz => 24.3,
        }
    }

    /// Whether this PRF may be combined with `profile`.
    #[must_use]
    pub fn supports(self, profile: Profile) -> bool {
        self != Prf::Prf19_5MHz || profile == Profile::Profile1
    }

    /// Fastest PRF compatible with `profile` that still reaches `end_m`.
    #[must_use]
    pub fn select(profile: Profile, end_m: f32) -> Option<Prf> {
        Prf::ALL
            .into_iter()
            .find(|prf| prf.supports(profile) && prf.max_measurable_distance_m() >= end_m)
    }
}

/// Sensor state between frames. Deeper states save power but take longer to wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdleState {
    #[default]
    DeepSleep = 0,
    Sleep = 1,
    Ready = 2,
}

impl TryFrom<u32> for IdleState {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IdleState::DeepSleep),
            1 => Ok(IdleState::Sleep),
            2 => Ok(IdleState::Ready),
            _ => Err(ConfigError::IdleState { value }),
        }
    }
}

impl fmt::Display for IdleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdleState::DeepSleep => "DEEP_SLEEP",
            IdleState::Sleep => "SLEEP",
            IdleState::Ready => "READY",
        };
        f.write_str(name)
    }
}
