//! Error types for the presence detector.
//!
//! Three layers mirror where a failure originates:
//!
//! - [`ConfigError`]: a configuration was rejected by validation or resolution
//! - [`SensorError`]: the sensor, bus or frame-processing collaborator failed
//! - [`PresenceError`]: what the detector handle reports to its caller
//!
//! Every detector operation returns [`PresenceError`]; configuration and
//! sensor errors convert into it with `?`.

use thiserror::Error;

use crate::detector::DetectorState;

/// Errors raised while validating or resolving a [`PresenceConfig`](crate::PresenceConfig).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Start of the measured interval is negative or not finite.
    #[error("Invalid start: {start_m} m (must be finite and >= 0)")]
    InvalidStart {
        /// Configured start in meters.
        start_m: f32,
    },

    /// End of the measured interval does not lie beyond its start.
    #[error("Invalid range: end {end_m} m must be greater than start {start_m} m")]
    InvalidRange {
        /// Configured start in meters.
        start_m: f32,
        /// Configured end in meters.
        end_m: f32,
    },

    /// End of the measured interval lies beyond what any PRF can measure.
    #[error("Range too long: end {end_m} m exceeds maximum measurable {max_m} m")]
    RangeTooLong {
        /// Configured end in meters.
        end_m: f32,
        /// Longest measurable distance.
        max_m: f32,
    },

    /// Sweeps per frame outside the supported interval.
    #[error("Invalid sweeps per frame: {value} (expected {min}..={max})")]
    SweepsPerFrame {
        /// Configured value.
        value: u16,
        /// Smallest accepted value.
        min: u16,
        /// Largest accepted value.
        max: u16,
    },

    /// Frame rate is zero, negative or not finite.
    #[error("Invalid frame rate: {value} Hz (must be > 0)")]
    FrameRate {
        /// Configured frame rate.
        value: f32,
    },

    /// Inter-frame presence timeout above the supported maximum.
    #[error("Invalid inter-frame presence timeout: {value} s (max {max} s)")]
    PresenceTimeout {
        /// Configured timeout in seconds.
        value: u16,
        /// Largest accepted timeout.
        max: u16,
    },

    /// A detection threshold is negative or not finite.
    #[error("Invalid {name}: {value} (must be finite and >= 0)")]
    Threshold {
        /// Name of the offending parameter.
        name: &'static str,
        /// Configured value.
        value: f32,
    },

    /// A filter time constant is negative or not finite.
    #[error("Invalid {name}: {value} s (must be finite and >= 0)")]
    TimeConstant {
        /// Name of the offending parameter.
        name: &'static str,
        /// Configured value.
        value: f32,
    },

    /// A filter cutoff frequency is not positive.
    #[error("Invalid {name}: {value} Hz (must be finite and > 0)")]
    Cutoff {
        /// Name of the offending parameter.
        name: &'static str,
        /// Configured value.
        value: f32,
    },

    /// Hardware accelerated average samples outside 1..=511.
    #[error("Invalid HWAAS: {value} (expected 1..=511)")]
    Hwaas {
        /// Configured value.
        value: u16,
    },

    /// Manual step length is not a divisor or multiple of 24.
    #[error("Invalid step length: {value} (must divide 24 or be a multiple of 24)")]
    StepLength {
        /// Configured step length in base points.
        value: u16,
    },

    /// Unknown profile number.
    #[error("Invalid profile: {value} (expected 1..=5)")]
    Profile {
        /// Raw profile number.
        value: u32,
    },

    /// Unknown inter-frame idle state.
    #[error("Invalid idle state: {value} (expected 0..=2)")]
    IdleState {
        /// Raw idle state value.
        value: u32,
    },

    /// A configuration passed to `prepare` resolves to a different geometry
    /// than the one the handle was created with.
    #[error(
        "Geometry mismatch: handle sized for {expected_points} points x {expected_sweeps} sweeps, \
         config resolves to {actual_points} x {actual_sweeps}"
    )]
    GeometryMismatch {
        /// Points the handle was created for.
        expected_points: u16,
        /// Sweeps per frame the handle was created for.
        expected_sweeps: u16,
        /// Points the new configuration resolves to.
        actual_points: u16,
        /// Sweeps per frame of the new configuration.
        actual_sweeps: u16,
    },

    /// The configuration document could not be parsed or written.
    #[error("Configuration JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by the sensor, bus or processing collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SensorError {
    /// Sensor has not been powered or prepared.
    #[error("Sensor {sensor_id} not ready")]
    NotReady {
        /// Sensor identifier.
        sensor_id: u32,
    },

    /// Applying a measurement configuration failed.
    #[error("Sensor prepare failed: {reason}")]
    Prepare {
        /// Description of the failure.
        reason: String,
    },

    /// Starting a measurement failed.
    #[error("Measurement failed: {reason}")]
    Measure {
        /// Description of the failure.
        reason: String,
    },

    /// Waiting for the data-ready interrupt timed out.
    #[error("Interrupt wait timed out after {timeout_ms} ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// Reading the frame from the sensor failed.
    #[error("Sensor read failed: {reason}")]
    Read {
        /// Description of the failure.
        reason: String,
    },

    /// Calibration result is empty or was flagged invalid.
    #[error("Invalid calibration result: {reason}")]
    CalibrationInvalid {
        /// Description of the failure.
        reason: String,
    },

    /// Bus transfer failed.
    #[error("Transfer failed: {reason}")]
    Transfer {
        /// Description of the failure.
        reason: String,
    },

    /// The bus adapter does not implement the requested transfer width.
    #[error("Transfer width not supported by this bus adapter")]
    UnsupportedTransfer,

    /// Turning the raw transfer into a processed frame failed.
    #[error("Frame processing failed: {reason}")]
    Processing {
        /// Description of the failure.
        reason: String,
    },
}

impl SensorError {
    /// Create a prepare error.
    #[must_use]
    pub fn prepare<S: Into<String>>(reason: S) -> Self {
        Self::Prepare {
            reason: reason.into(),
        }
    }

    /// Create a read error.
    #[must_use]
    pub fn read<S: Into<String>>(reason: S) -> Self {
        Self::Read {
            reason: reason.into(),
        }
    }

    /// Create a transfer error.
    #[must_use]
    pub fn transfer<S: Into<String>>(reason: S) -> Self {
        Self::Transfer {
            reason: reason.into(),
        }
    }

    /// Create a processing error.
    #[must_use]
    pub fn processing<S: Into<String>>(reason: S) -> Self {
        Self::Processing {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the same call may succeed when retried.
    ///
    /// The detector never retries by itself; this is a hint for the caller.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Measure { .. } | Self::Read { .. } | Self::Transfer { .. }
        )
    }
}

/// Errors returned by [`PresenceDetector`](crate::PresenceDetector) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PresenceError {
    /// The configuration was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A caller-supplied buffer cannot hold what the detector needs.
    #[error("Buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required.
        required: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// The sensor or frame-processing collaborator failed.
    #[error("Hardware error: {0}")]
    Hardware(#[from] SensorError),

    /// The operation is not allowed in the handle's current state.
    #[error("Cannot {operation} while detector is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the handle was in.
        state: DetectorState,
    },
}

impl PresenceError {
    /// Create a buffer-too-small error.
    #[must_use]
    pub fn buffer_too_small(required: usize, actual: usize) -> Self {
        Self::BufferTooSmall { required, actual }
    }

    /// Returns `true` if the handle remains usable and the call may be repeated.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Hardware(e) => e.is_recoverable(),
            Self::BufferTooSmall { .. } => true,
            Self::InvalidConfig(_) | Self::InvalidState { .. } => false,
        }
    }
}
