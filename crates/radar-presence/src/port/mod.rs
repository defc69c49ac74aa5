//! Ports to the collaborators the detector drives but does not implement.

pub mod processing;
pub mod sensor;

pub use processing::{FrameProcessing, SparseIqProcessing};
pub use sensor::{acquire_frame, CalibrationResult, RadarSensor};
