//! Processed frames and the raw transfer format behind them.
//!
//! A frame holds `sweeps_per_frame` sweeps of `num_points` complex samples,
//! sweep-major, each sample stored as little-endian `i16` I then Q. The sensor
//! read follows the samples with a four byte status trailer:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 2 | temperature, °C (i16 LE) |
//! | 2 | 2 | flags (u16 LE), bit 0 = frame delayed |

use byteorder::{ByteOrder, LittleEndian};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::buffer::BufferLayout;
use crate::error::SensorError;

/// Bytes per complex sample.
pub const SAMPLE_BYTES: usize = 4;

/// Bytes of the status trailer following the samples.
pub const STATUS_TRAILER_LEN: usize = 4;

const FLAG_FRAME_DELAYED: u16 = 1 << 0;

/// Conditions reported alongside a processed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStatus {
    /// At least one sample hit the ADC limits.
    pub data_saturated: bool,
    /// The sensor could not keep up with the configured frame rate.
    pub frame_delayed: bool,
    /// Temperature drifted far enough that the sensor should be recalibrated.
    pub calibration_needed: bool,
    /// Sensor temperature in °C.
    pub temperature: i16,
}

/// Status written by the sensor read after the samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawTrailer {
    pub temperature: i16,
    pub frame_delayed: bool,
}

impl RawTrailer {
    pub(crate) fn decode(bytes: &[u8]) -> Self {
        let flags = LittleEndian::read_u16(&bytes[2..4]);
        Self {
            temperature: LittleEndian::read_i16(&bytes[0..2]),
            frame_delayed: flags & FLAG_FRAME_DELAYED != 0,
        }
    }

    fn encode(&self, bytes: &mut [u8]) {
        LittleEndian::write_i16(&mut bytes[0..2], self.temperature);
        let flags = if self.frame_delayed { FLAG_FRAME_DELAYED } else { 0 };
        LittleEndian::write_u16(&mut bytes[2..4], flags);
    }
}

/// Write one frame of samples and its trailer in raw transfer format.
///
/// `samples` is sweep-major and must hold exactly one frame. Used by sensor
/// adapters and simulators.
pub fn encode_raw_frame(
    layout: &BufferLayout,
    samples: &[Complex<i16>],
    trailer: RawTrailer,
    buffer: &mut [u8],
) -> Result<(), SensorError> {
    let expected = layout.num_points() * layout.sweeps_per_frame();
    if samples.len() != expected {
        return Err(SensorError::read(format!(
            "frame holds {} samples, expected {expected}",
            samples.len()
        )));
    }
    let trailer_range = layout.trailer_range();
    if buffer.len() < trailer_range.end {
        return Err(SensorError::read(format!(
            "buffer of {} bytes cannot hold a {} byte transfer",
            buffer.len(),
            trailer_range.end
        )));
    }

    for (chunk, sample) in buffer[layout.frame_range()]
        .chunks_exact_mut(SAMPLE_BYTES)
        .zip(samples)
    {
        LittleEndian::write_i16(&mut chunk[0..2], sample.re);
        LittleEndian::write_i16(&mut chunk[2..4], sample.im);
    }
    trailer.encode(&mut buffer[trailer_range]);
    Ok(())
}

/// A processed frame borrowed from the detector buffer.
#[derive(Debug, Clone, Copy)]
pub struct ProcessedFrame<'buf> {
    samples: &'buf [u8],
    num_points: usize,
    sweeps_per_frame: usize,
    status: FrameStatus,
}

impl<'buf> ProcessedFrame<'buf> {
    pub(crate) fn new(samples: &'buf [u8], layout: &BufferLayout, status: FrameStatus) -> Self {
        debug_assert_eq!(samples.len(), layout.frame_len());
        Self {
            samples,
            num_points: layout.num_points(),
            sweeps_per_frame: layout.sweeps_per_frame(),
            status,
        }
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    #[must_use]
    pub fn sweeps_per_frame(&self) -> usize {
        self.sweeps_per_frame
    }

    #[must_use]
    pub fn status(&self) -> FrameStatus {
        self.status
    }

    /// Sample at `point` of sweep `sweep`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn sample(&self, sweep: usize, point: usize) -> Complex<i16> {
        assert!(point < self.num_points && sweep < self.sweeps_per_frame);
        let offset = (sweep * self.num_points + point) * SAMPLE_BYTES;
        decode_sample(&self.samples[offset..offset + SAMPLE_BYTES])
    }

    /// All points of sweep `sweep`.
    pub fn sweep(&self, sweep: usize) -> impl Iterator<Item = Complex<i16>> + 'buf {
        let row = self.num_points * SAMPLE_BYTES;
        let samples = self.samples;
        samples[sweep * row..(sweep + 1) * row]
            .chunks_exact(SAMPLE_BYTES)
            .map(decode_sample)
    }

    /// Copy all samples out, sweep-major.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Complex<i16>> {
        self.samples
            .chunks_exact(SAMPLE_BYTES)
            .map(decode_sample)
            .collect()
    }
}

fn decode_sample(bytes: &[u8]) -> Complex<i16> {
    Complex::new(
        LittleEndian::read_i16(&bytes[0..2]),
        LittleEndian::read_i16(&bytes[2..4]),
    )
}
