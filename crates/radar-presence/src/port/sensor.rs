//! The sensor port.
//!
//! The detector only configures the sensor (in `prepare`). Acquisition
//! (measure, wait, read) is driven by the caller between `process` calls, so
//! no waiting ever happens inside the detector.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SensorError;
use crate::metadata::SensorConfig;

/// Result of a sensor calibration, captured once and reused on every prepare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationResult {
    data: Vec<u8>,
    temperature: i16,
    valid: bool,
}

impl CalibrationResult {
    /// Wrap calibration data captured at `temperature` °C.
    #[must_use]
    pub fn new(data: Vec<u8>, temperature: i16) -> Self {
        Self {
            data,
            temperature,
            valid: true,
        }
    }

    /// A calibration the sensor reported as failed.
    #[must_use]
    pub fn invalid(temperature: i16) -> Self {
        Self {
            data: Vec::new(),
            temperature,
            valid: false,
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Temperature at calibration time, °C.
    #[must_use]
    pub fn temperature(&self) -> i16 {
        self.temperature
    }

    /// Reject calibrations that cannot be applied to the sensor.
    pub fn validate(&self) -> Result<(), SensorError> {
        if !self.valid {
            return Err(SensorError::CalibrationInvalid {
                reason: "calibration was reported as failed".into(),
            });
        }
        if self.data.is_empty() {
            return Err(SensorError::CalibrationInvalid {
                reason: "calibration data is empty".into(),
            });
        }
        Ok(())
    }
}

/// Port to one physical radar sensor.
pub trait RadarSensor {
    /// Identifier of the sensor on its bus.
    fn sensor_id(&self) -> u32;

    /// Apply a measurement configuration.
    ///
    /// `scratch` is only borrowed for this call.
    fn prepare(
        &mut self,
        config: &SensorConfig,
        calibration: &CalibrationResult,
        scratch: &mut [u8],
    ) -> Result<(), SensorError>;

    /// Start one frame measurement.
    fn measure(&mut self) -> Result<(), SensorError>;

    /// Block until the frame is ready or `timeout` elapses.
    fn wait_for_interrupt(&mut self, timeout: Duration) -> Result<(), SensorError>;

    /// Transfer the measured frame into the start of `buffer`.
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SensorError>;
}

/// Measure, wait and read one frame into `buffer`.
pub fn acquire_frame<S: RadarSensor + ?Sized>(
    sensor: &mut S,
    buffer: &mut [u8],
    timeout: Duration,
) -> Result<(), SensorError> {
    sensor.measure()?;
    sensor.wait_for_interrupt(timeout)?;
    sensor.read(buffer)
}
