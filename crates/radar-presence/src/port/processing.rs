//! The frame-processing port.
//!
//! Turns the raw transfer left in the buffer by the sensor read into a
//! processed frame (in place) and reports the frame's status.

use byteorder::{ByteOrder, LittleEndian};

use crate::buffer::BufferLayout;
use crate::error::SensorError;
use crate::frame::{FrameStatus, RawTrailer};
use crate::metadata::SensorConfig;
use crate::port::sensor::CalibrationResult;

/// Temperature drift since calibration that calls for a new calibration, °C.
pub const RECALIBRATION_TEMPERATURE_DELTA: i16 = 15;

/// Converts raw sensor transfers into processed frames.
pub trait FrameProcessing {
    /// The sensor accepted `config` with `calibration`.
    fn prepare(&mut self, _config: &SensorConfig, _calibration: &CalibrationResult) {}

    /// Process the raw transfer held in `data` (the buffer's data region).
    ///
    /// On return the first `layout.frame_len()` bytes of `data` hold the frame
    /// in processed format.
    fn execute(&mut self, layout: &BufferLayout, data: &mut [u8]) -> Result<FrameStatus, SensorError>;
}

/// Processing for sensors that transfer sparse I/Q samples directly.
///
/// The transfer is already in processed format; this checks for saturation
/// and temperature drift.
#[derive(Debug, Clone, Default)]
pub struct SparseIqProcessing {
    calibration_temperature: Option<i16>,
}

impl SparseIqProcessing {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameProcessing for SparseIqProcessing {
    fn prepare(&mut self, _config: &SensorConfig, calibration: &CalibrationResult) {
        self.calibration_temperature = Some(calibration.temperature());
    }

    fn execute(&mut self, layout: &BufferLayout, data: &mut [u8]) -> Result<FrameStatus, SensorError> {
        let trailer_range = layout.trailer_range();
        if data.len() < trailer_range.end {
            return Err(SensorError::processing(format!(
                "data region of {} bytes is shorter than the {} byte transfer",
                data.len(),
                trailer_range.end
            )));
        }
        let trailer = RawTrailer::decode(&data[trailer_range]);

        let data_saturated = data[layout.frame_range()]
            .chunks_exact(2)
            .map(LittleEndian::read_i16)
            .any(|v| v == i16::MAX || v == i16::MIN);

        let calibration_needed = self.calibration_temperature.map_or(false, |reference| {
            (i32::from(trailer.temperature) - i32::from(reference)).abs()
                > i32::from(RECALIBRATION_TEMPERATURE_DELTA)
        });

        Ok(FrameStatus {
            data_saturated,
            frame_delayed: trailer.frame_delayed,
            calibration_needed,
            temperature: trailer.temperature,
        })
    }
}
