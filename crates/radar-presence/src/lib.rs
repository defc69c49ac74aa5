//! Radar Presence Detection
//!
//! Frame-by-frame presence detection for pulsed coherent radar. Each frame is
//! a block of complex (I/Q) sweeps over a range window; the detector keeps a
//! filter state per range point and reports whether something moves in the
//! window, how strongly, and where.
//!
//! # Features
//!
//! - **Intra-frame detection**: fast motion (breathing, fidgeting) seen as
//!   sweep-to-sweep spread within one frame
//! - **Inter-frame detection**: slow motion (walking, settling) seen as drift
//!   of the sweep mean between frames, with optional phase boost
//! - **Presence timeout**: accelerated decay once a score keeps falling
//! - **Zero-copy results**: depthwise scores live in the caller's buffer
//!
//! # Example
//!
//! ```rust,no_run
//! use radar_presence::{CalibrationResult, PresenceConfig, PresenceDetector, RadarSensor};
//!
//! fn run(sensor: &mut impl RadarSensor, calibration: &CalibrationResult) -> radar_presence::Result<()> {
//!     let config = PresenceConfig::builder()
//!         .range_m(0.2, 1.0)
//!         .frame_rate(10.0)
//!         .build();
//!
//!     let mut detector = PresenceDetector::create(&config)?;
//!     let mut buffer = vec![0u8; detector.buffer_size()];
//!     detector.prepare(&config, sensor, calibration, &mut buffer)?;
//!
//!     loop {
//!         radar_presence::port::acquire_frame(sensor, &mut buffer, std::time::Duration::from_secs(1))?;
//!         let result = detector.process(&mut buffer)?;
//!         if result.presence_detected {
//!             println!("presence at {:.2} m", result.presence_distance);
//!         }
//!     }
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod hal;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod port;

// Re-export main types for convenience
pub use buffer::{BufferLayout, DepthwiseScores, MemoryRequirements};
pub use config::{IdleState, PresenceConfig, PresenceConfigBuilder, Prf, Profile};
pub use detector::{destroy, DetectorState, PresenceDetector, PresenceReport, PresenceResult};
pub use error::{ConfigError, PresenceError, SensorError};
pub use frame::{encode_raw_frame, FrameStatus, ProcessedFrame, RawTrailer};
pub use hal::{SpiTransfer, TransferPath, TransferStrategy};
pub use logging::{LogConfig, LogLevel};
pub use metadata::{PresenceMetadata, SensorConfig};
pub use port::{CalibrationResult, FrameProcessing, RadarSensor, SparseIqProcessing};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for presence detection operations
pub type Result<T> = std::result::Result<T, PresenceError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CalibrationResult, FrameProcessing, PresenceConfig, PresenceDetector, PresenceError,
        PresenceResult, Profile, RadarSensor, Result,
    };
}
