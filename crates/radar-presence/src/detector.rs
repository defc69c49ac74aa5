//! Presence detector handle.
//!
//! Lifecycle: [`PresenceDetector::create`] resolves the configuration and
//! sizes the filter bank (state `Created`), [`PresenceDetector::prepare`]
//! configures the sensor (state `Prepared`) and [`PresenceDetector::process`]
//! runs one frame at a time (state `Processing`). Dropping the handle, or
//! calling [`PresenceDetector::destroy`], releases everything.
//!
//! The caller owns the buffer. A sensor read fills it, `process` turns it into
//! a frame plus depthwise scores and returns a [`PresenceResult`] that borrows
//! it, so the buffer cannot be refilled while a result is still in use.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::buffer::{write_scores, BufferLayout, DepthwiseScores, MemoryRequirements};
use crate::config::PresenceConfig;
use crate::error::{ConfigError, PresenceError, SensorError};
use crate::frame::{FrameStatus, ProcessedFrame};
use crate::logging::LogConfig;
use crate::metadata::{resolve, PresenceMetadata, SensorConfig};
use crate::pipeline::{FilterBank, PresencePipeline};
use crate::port::{CalibrationResult, FrameProcessing, RadarSensor, SparseIqProcessing};
use crate::Result;

/// Lifecycle state of a [`PresenceDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorState {
    /// Configuration resolved, filters allocated but never fed.
    Created,
    /// Sensor configured; frames may be processed.
    Prepared,
    /// At least one frame processed since the last prepare.
    Processing,
}

impl fmt::Display for DetectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectorState::Created => "created",
            DetectorState::Prepared => "prepared",
            DetectorState::Processing => "processing",
        };
        f.write_str(name)
    }
}

/// Result of one processed frame, borrowing the detector buffer.
#[derive(Debug, Clone, Copy)]
pub struct PresenceResult<'buf> {
    pub presence_detected: bool,
    /// Largest depthwise intra-frame score.
    pub intra_presence_score: f32,
    /// Largest depthwise inter-frame score.
    pub inter_presence_score: f32,
    /// Distance of the strongest point in meters, 0 without presence.
    pub presence_distance: f32,
    pub depthwise_intra: DepthwiseScores<'buf>,
    pub depthwise_inter: DepthwiseScores<'buf>,
    /// The frame the scores were computed from.
    pub frame: ProcessedFrame<'buf>,
}

impl PresenceResult<'_> {
    /// Copy the result out of the buffer.
    #[must_use]
    pub fn to_report(&self) -> PresenceReport {
        PresenceReport {
            presence_detected: self.presence_detected,
            intra_presence_score: self.intra_presence_score,
            inter_presence_score: self.inter_presence_score,
            presence_distance: self.presence_distance,
            depthwise_intra: self.depthwise_intra.to_vec(),
            depthwise_inter: self.depthwise_inter.to_vec(),
            frame_status: self.frame.status(),
        }
    }
}

/// Owned copy of a [`PresenceResult`], without the frame samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceReport {
    pub presence_detected: bool,
    pub intra_presence_score: f32,
    pub inter_presence_score: f32,
    pub presence_distance: f32,
    pub depthwise_intra: Vec<f32>,
    pub depthwise_inter: Vec<f32>,
    pub frame_status: FrameStatus,
}

/// Presence detector for one sensor.
///
/// `P` converts raw sensor transfers into frames; the default handles sensors
/// that deliver sparse I/Q directly.
pub struct PresenceDetector<P = SparseIqProcessing> {
    config: PresenceConfig,
    metadata: PresenceMetadata,
    sensor_config: SensorConfig,
    layout: BufferLayout,
    pipeline: PresencePipeline,
    processing: P,
    state: DetectorState,
    log: LogConfig,
    frames_processed: u64,
}

impl PresenceDetector<SparseIqProcessing> {
    /// Create a detector using [`SparseIqProcessing`].
    ///
    /// Fails with [`PresenceError::InvalidConfig`] if `config` does not
    /// validate; no handle exists in that case.
    pub fn create(config: &PresenceConfig) -> Result<Self> {
        Self::with_processing(config, SparseIqProcessing::new())
    }
}

impl<P: FrameProcessing> PresenceDetector<P> {
    /// Create a detector with a custom processing collaborator.
    pub fn with_processing(config: &PresenceConfig, processing: P) -> Result<Self> {
        let (metadata, sensor_config) = resolve(config)?;
        let layout = BufferLayout::for_metadata(&metadata, config.sweeps_per_frame());
        let pipeline = PresencePipeline::new(config, &metadata);

        let detector = Self {
            config: config.clone(),
            metadata,
            sensor_config,
            layout,
            pipeline,
            processing,
            state: DetectorState::Created,
            log: LogConfig::default(),
            frames_processed: 0,
        };
        detector.log_created();
        Ok(detector)
    }

    /// Replace the log configuration of this handle.
    #[must_use]
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Geometry resolved from the current configuration.
    #[must_use]
    pub fn metadata(&self) -> &PresenceMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Settings pushed to the sensor on prepare.
    #[must_use]
    pub fn sensor_config(&self) -> &SensorConfig {
        &self.sensor_config
    }

    #[must_use]
    pub fn state(&self) -> DetectorState {
        self.state
    }

    #[must_use]
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    #[must_use]
    pub fn filter_bank(&self) -> &FilterBank {
        self.pipeline.filter_bank()
    }

    /// Bytes the caller must provide to `prepare` and `process`.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub fn memory_requirements(&self) -> MemoryRequirements {
        MemoryRequirements::estimate(&self.layout)
    }

    /// Configure `sensor` for `config` and make the detector ready to process.
    ///
    /// `config` may change thresholds and filter settings but must resolve to
    /// the same number of points and sweeps the handle was created with.
    /// Nothing changes unless every check and the sensor itself succeed.
    pub fn prepare<S: RadarSensor + ?Sized>(
        &mut self,
        config: &PresenceConfig,
        sensor: &mut S,
        calibration: &CalibrationResult,
        scratch: &mut [u8],
    ) -> Result<()> {
        let result = self.try_prepare(config, sensor, calibration, scratch);
        if let Err(e) = &result {
            if self.log.enabled(Level::WARN) {
                tracing::warn!(error = %e, state = %self.state, "presence prepare failed");
            }
        }
        result
    }

    fn try_prepare<S: RadarSensor + ?Sized>(
        &mut self,
        config: &PresenceConfig,
        sensor: &mut S,
        calibration: &CalibrationResult,
        scratch: &mut [u8],
    ) -> Result<()> {
        let (metadata, sensor_config) = resolve(config)?;
        if metadata.num_points != self.metadata.num_points
            || config.sweeps_per_frame() != self.config.sweeps_per_frame()
        {
            return Err(ConfigError::GeometryMismatch {
                expected_points: self.metadata.num_points,
                expected_sweeps: self.config.sweeps_per_frame(),
                actual_points: metadata.num_points,
                actual_sweeps: config.sweeps_per_frame(),
            }
            .into());
        }

        let required = self.buffer_size();
        if scratch.len() < required {
            return Err(PresenceError::buffer_too_small(required, scratch.len()));
        }

        calibration.validate()?;
        if sensor.sensor_id() != config.sensor_id() {
            return Err(SensorError::prepare(format!(
                "configuration targets sensor {} but sensor {} was given",
                config.sensor_id(),
                sensor.sensor_id()
            ))
            .into());
        }
        sensor.prepare(&sensor_config, calibration, scratch)?;

        self.processing.prepare(&sensor_config, calibration);
        self.pipeline.reconfigure(config, &metadata);
        if config.reset_filters_on_prepare() {
            self.pipeline.reset();
        }
        self.config = config.clone();
        self.metadata = metadata;
        self.sensor_config = sensor_config;
        self.state = DetectorState::Prepared;

        if self.log.enabled(Level::INFO) {
            tracing::info!(
                sensor_id = sensor_config.sensor_id,
                prf_hz = sensor_config.prf.frequency_hz(),
                reset = config.reset_filters_on_prepare(),
                "presence detector prepared"
            );
        }
        Ok(())
    }

    /// Process the frame the sensor read left in `buffer`.
    ///
    /// Frames must arrive in acquisition order. If processing the raw transfer
    /// fails, the filter state is left exactly as it was after the previous
    /// frame.
    pub fn process<'buf>(&mut self, buffer: &'buf mut [u8]) -> Result<PresenceResult<'buf>> {
        if self.state == DetectorState::Created {
            return Err(PresenceError::InvalidState {
                operation: "process",
                state: self.state,
            });
        }
        let layout = self.layout;
        let required = layout.size();
        if buffer.len() < required {
            return Err(PresenceError::buffer_too_small(required, buffer.len()));
        }
        let buffer: &'buf mut [u8] = &mut buffer[..required];

        let status = match self.processing.execute(&layout, &mut buffer[layout.data_range()]) {
            Ok(status) => status,
            Err(e) => {
                if self.log.enabled(Level::WARN) {
                    tracing::warn!(error = %e, frame = self.frames_processed, "frame processing failed");
                }
                return Err(e.into());
            }
        };
        self.log_status(&status);

        let decision = {
            let frame = ProcessedFrame::new(&buffer[layout.frame_range()], &layout, status);
            self.pipeline.run(&frame)
        };
        write_scores(self.pipeline.intra_scores(), &mut buffer[layout.intra_range()]);
        write_scores(self.pipeline.inter_scores(), &mut buffer[layout.inter_range()]);

        self.state = DetectorState::Processing;
        self.frames_processed += 1;
        if self.log.enabled(Level::TRACE) {
            tracing::trace!(
                frame = self.frames_processed,
                detected = decision.presence_detected,
                intra = decision.intra_presence_score,
                inter = decision.inter_presence_score,
                distance_m = decision.presence_distance,
                noise = self.pipeline.filter_bank().noise(),
                "presence frame"
            );
        }

        let buffer: &'buf [u8] = buffer;
        Ok(PresenceResult {
            presence_detected: decision.presence_detected,
            intra_presence_score: decision.intra_presence_score,
            inter_presence_score: decision.inter_presence_score,
            presence_distance: decision.presence_distance,
            depthwise_intra: DepthwiseScores::new(&buffer[layout.intra_range()]),
            depthwise_inter: DepthwiseScores::new(&buffer[layout.inter_range()]),
            frame: ProcessedFrame::new(&buffer[layout.frame_range()], &layout, status),
        })
    }

    /// Return every filter to its neutral state; the next frame seeds them.
    pub fn reset_filters(&mut self) {
        self.pipeline.reset();
        if self.log.enabled(Level::DEBUG) {
            tracing::debug!("presence filters reset");
        }
    }

    /// Release the detector.
    pub fn destroy(self) {
        drop(self);
    }

    fn log_created(&self) {
        if self.log.enabled(Level::DEBUG) {
            tracing::debug!(
                num_points = self.metadata.num_points,
                start_m = self.metadata.start_m,
                step_length_m = self.metadata.step_length_m,
                profile = %self.metadata.profile,
                buffer_size = self.buffer_size(),
                "presence detector created"
            );
        }
    }

    fn log_status(&self, status: &FrameStatus) {
        if !self.log.enabled(Level::WARN) {
            return;
        }
        if status.data_saturated {
            tracing::warn!(frame = self.frames_processed, "data saturated, lower HWAAS or gain");
        }
        if status.frame_delayed {
            tracing::warn!(frame = self.frames_processed, "frame delayed, frame rate too high");
        }
        if status.calibration_needed {
            tracing::warn!(
                temperature = status.temperature,
                "temperature drift, sensor needs recalibration"
            );
        }
    }
}

impl<P> fmt::Debug for PresenceDetector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceDetector")
            .field("state", &self.state)
            .field("metadata", &self.metadata)
            .field("frames_processed", &self.frames_processed)
            .finish_non_exhaustive()
    }
}

/// Release `detector` if there is one.
pub fn destroy<P>(detector: Option<PresenceDetector<P>>) {
    drop(detector);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_raw_frame, RawTrailer};
    use num_complex::Complex;
    use std::time::Duration;

    struct NullSensor;

    impl RadarSensor for NullSensor {
        fn sensor_id(&self) -> u32 {
            1
        }
        fn prepare(&mut self, _: &SensorConfig, _: &CalibrationResult, _: &mut [u8]) -> std::result::Result<(), SensorError> {
            Ok(())
        }
        fn measure(&mut self) -> std::result::Result<(), SensorError> {
            Ok(())
        }
        fn wait_for_interrupt(&mut self, _: Duration) -> std::result::Result<(), SensorError> {
            Ok(())
        }
        fn read(&mut self, _: &mut [u8]) -> std::result::Result<(), SensorError> {
            Ok(())
        }
    }

    fn prepared(config: &PresenceConfig) -> (PresenceDetector, Vec<u8>) {
        let mut detector = PresenceDetector::create(config).unwrap();
        let mut buffer = vec![0u8; detector.buffer_size()];
        let calibration = CalibrationResult::new(vec![1; 16], 25);
        detector
            .prepare(config, &mut NullSensor, &calibration, &mut buffer)
            .unwrap();
        (detector, buffer)
    }

    #[test]
    fn create_reports_metadata_and_sizes() {
        let config = PresenceConfig::builder().range_m(0.2, 1.0).build();
        let detector = PresenceDetector::create(&config).unwrap();
        assert_eq!(detector.state(), DetectorState::Created);
        assert_eq!(detector.metadata().num_points, 15);
        assert_eq!(detector.buffer_size(), BufferLayout::new(15, 16).size());
        assert_eq!(detector.memory_requirements().external_buffer, detector.buffer_size());
    }

    #[test]
    fn invalid_config_yields_no_handle() {
        let config = PresenceConfig::builder().sweeps_per_frame(4).build();
        assert!(matches!(
            PresenceDetector::create(&config),
            Err(PresenceError::InvalidConfig(ConfigError::SweepsPerFrame { .. }))
        ));
    }

    #[test]
    fn process_requires_prepare() {
        let mut detector = PresenceDetector::create(&PresenceConfig::default()).unwrap();
        let mut buffer = vec![0u8; detector.buffer_size()];
        assert!(matches!(
            detector.process(&mut buffer),
            Err(PresenceError::InvalidState {
                state: DetectorState::Created,
                ..
            })
        ));
    }

    #[test]
    fn result_views_alias_the_buffer() {
        let config = PresenceConfig::builder().range_m(0.2, 1.0).build();
        let (mut detector, mut buffer) = prepared(&config);
        let layout = BufferLayout::new(15, 16);
        // slow rotation across sweeps: wide spread, little third difference
        let samples: Vec<_> = (0..15 * 16)
            .map(|i| Complex::new((400.0 * (0.3 * (i / 15) as f32).cos()) as i16, 3))
            .collect();
        encode_raw_frame(&layout, &samples, RawTrailer::default(), &mut buffer).unwrap();

        let report = {
            let result = detector.process(&mut buffer).unwrap();
            assert_eq!(result.depthwise_intra.len(), 15);
            assert_eq!(result.depthwise_inter.len(), 15);
            assert_eq!(result.frame.to_vec(), samples);
            result.to_report()
        };
        assert_eq!(detector.state(), DetectorState::Processing);

        let stored = DepthwiseScores::new(&buffer[layout.intra_range()]).to_vec();
        assert_eq!(stored, report.depthwise_intra);
        assert!(report.depthwise_intra.iter().any(|&s| s > 0.0));
    }

    #[test]
    fn destroy_accepts_missing_handle() {
        destroy::<SparseIqProcessing>(None);
        let detector = PresenceDetector::create(&PresenceConfig::default()).ok();
        destroy(detector);
    }
}
