//! Layout of the caller-owned detector buffer.
//!
//! One buffer serves both directions. The sensor read fills the raw transfer
//! region at its start, the processing collaborator turns it into a frame in
//! place, and `process` appends the depthwise score arrays after it:
//!
//! ```text
//! | frame samples | status trailer | calibration/processing slack | intra scores | inter scores |
//! |<-------------------- data region -------------------------->|<--- points x 2 x f32 ------>|
//! ```
//!
//! Scores are stored as little-endian `f32` and read back through
//! [`DepthwiseScores`], so the buffer needs no particular alignment.

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::frame::{SAMPLE_BYTES, STATUS_TRAILER_LEN};
use crate::metadata::PresenceMetadata;

/// Fixed overhead of the processing collaborator in the data region.
pub const PROCESSING_OVERHEAD: usize = 68;

/// Smallest data region; the sensor reuses it for calibration transfers.
pub const CALIBRATION_BUFFER_SIZE: usize = 2492;

const SIZE_OF_F32: usize = 4;

/// Internal heap of the detector handle that does not depend on points.
pub const PRESENCE_HEAP_OVERHEAD: usize = 256;
/// Filter values held per point.
pub const PRESENCE_FILTER_PARAMS: usize = 7;
/// Sensor driver state per sensor.
pub const SENSOR_HEAP_PER_SENSOR: usize = 636;
/// Sensor driver state per configuration.
pub const SENSOR_HEAP_PER_CONFIG: usize = 512;
/// Sensor driver state per subsweep.
pub const SENSOR_HEAP_PER_SUBSWEEP: usize = 236;

/// Byte offsets of every region in the detector buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    num_points: usize,
    sweeps_per_frame: usize,
}

impl BufferLayout {
    /// Layout for a frame of `sweeps_per_frame` sweeps of `num_points` points.
    #[must_use]
    pub fn new(num_points: usize, sweeps_per_frame: usize) -> Self {
        Self {
            num_points,
            sweeps_per_frame,
        }
    }

    /// Layout for resolved metadata.
    #[must_use]
    pub fn for_metadata(metadata: &PresenceMetadata, sweeps_per_frame: u16) -> Self {
        Self::new(usize::from(metadata.num_points), usize::from(sweeps_per_frame))
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    #[must_use]
    pub fn sweeps_per_frame(&self) -> usize {
        self.sweeps_per_frame
    }

    /// Bytes of I/Q samples in one frame.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.num_points * self.sweeps_per_frame * SAMPLE_BYTES
    }

    /// Samples of one frame.
    #[must_use]
    pub fn frame_range(&self) -> Range<usize> {
        0..self.frame_len()
    }

    /// Status trailer written by the sensor read after the samples.
    #[must_use]
    pub fn trailer_range(&self) -> Range<usize> {
        let start = self.frame_len();
        start..start + STATUS_TRAILER_LEN
    }

    /// Region owned by the sensor read and the processing collaborator.
    #[must_use]
    pub fn data_range(&self) -> Range<usize> {
        0..self.frame_len().max(CALIBRATION_BUFFER_SIZE) + PROCESSING_OVERHEAD
    }

    /// Depthwise intra-frame scores.
    #[must_use]
    pub fn intra_range(&self) -> Range<usize> {
        let start = self.data_range().end;
        start..start + self.num_points * SIZE_OF_F32
    }

    /// Depthwise inter-frame scores.
    #[must_use]
    pub fn inter_range(&self) -> Range<usize> {
        let start = self.intra_range().end;
        start..start + self.num_points * SIZE_OF_F32
    }

    /// Total bytes the caller must provide.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inter_range().end
    }
}

/// Memory a detector needs, split by who allocates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRequirements {
    /// Caller-owned buffer passed to `prepare` and `process`.
    pub external_buffer: usize,
    /// Heap owned by the detector and the sensor driver.
    pub internal_heap: usize,
}

impl MemoryRequirements {
    /// Estimate for a resolved layout.
    #[must_use]
    pub fn estimate(layout: &BufferLayout) -> Self {
        let internal_heap = PRESENCE_HEAP_OVERHEAD
            + layout.num_points() * PRESENCE_FILTER_PARAMS * SIZE_OF_F32
            + SENSOR_HEAP_PER_SENSOR
            + SENSOR_HEAP_PER_CONFIG
            + SENSOR_HEAP_PER_SUBSWEEP;
        Self {
            external_buffer: layout.size(),
            internal_heap,
        }
    }

    /// Sum of both parts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.external_buffer + self.internal_heap
    }
}

/// Per-point scores stored as little-endian `f32` inside the detector buffer.
///
/// Borrowed from the buffer passed to
/// [`PresenceDetector::process`](crate::PresenceDetector::process); it is
/// valid until that buffer is handed out again.
#[derive(Debug, Clone, Copy)]
pub struct DepthwiseScores<'buf> {
    bytes: &'buf [u8],
}

impl<'buf> DepthwiseScores<'buf> {
    pub(crate) fn new(bytes: &'buf [u8]) -> Self {
        Self { bytes }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len() / SIZE_OF_F32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Score of point `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f32> {
        let offset = index.checked_mul(SIZE_OF_F32)?;
        self.bytes
            .get(offset..offset + SIZE_OF_F32)
            .map(LittleEndian::read_f32)
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + 'buf {
        let bytes = self.bytes;
        bytes.chunks_exact(SIZE_OF_F32).map(LittleEndian::read_f32)
    }

    /// Copy the scores out of the buffer.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.len()];
        LittleEndian::read_f32_into(self.bytes, &mut out);
        out
    }
}

/// Store `scores` into `bytes` as little-endian `f32`.
pub(crate) fn write_scores(scores: &[f32], bytes: &mut [u8]) {
    LittleEndian::write_f32_into(scores, bytes);
}
