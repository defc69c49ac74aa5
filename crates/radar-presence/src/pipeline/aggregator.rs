//! Reduction of depthwise scores to one decision per frame.

use serde::{Deserialize, Serialize};

use crate::metadata::PresenceMetadata;
use crate::PresenceConfig;

/// Outcome of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub presence_detected: bool,
    pub intra_presence_score: f32,
    pub inter_presence_score: f32,
    /// Meters; 0 when nothing is detected.
    pub presence_distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionAggregator {
    intra_enabled: bool,
    intra_threshold: f32,
    inter_enabled: bool,
    inter_threshold: f32,
    start_m: f32,
    step_length_m: f32,
}

impl DecisionAggregator {
    #[must_use]
    pub fn new(config: &PresenceConfig, metadata: &PresenceMetadata) -> Self {
        Self {
            intra_enabled: config.intra_detection(),
            intra_threshold: config.intra_detection_threshold(),
            inter_enabled: config.inter_detection(),
            inter_threshold: config.inter_detection_threshold(),
            start_m: metadata.start_m,
            step_length_m: metadata.step_length_m,
        }
    }

    /// Combine the depthwise scores of one frame.
    #[must_use]
    pub fn decide(&self, intra: &[f32], inter: &[f32]) -> Decision {
        let (intra_presence_score, _) = first_max(intra.iter().copied());
        let (inter_presence_score, _) = first_max(inter.iter().copied());

        let presence_detected = (self.intra_enabled && intra_presence_score > self.intra_threshold)
            || (self.inter_enabled && inter_presence_score > self.inter_threshold);

        let presence_distance = if presence_detected {
            let combined = intra.iter().zip(inter).map(|(a, b)| a.max(*b));
            let (_, index) = first_max(combined);
            self.start_m + self.step_length_m * index as f32
        } else {
            0.0
        };

        Decision {
            presence_detected,
            intra_presence_score,
            inter_presence_score,
            presence_distance,
        }
    }
}

/// Largest value and its index; ties go to the lowest index. `(0.0, 0)` when empty.
fn first_max(values: impl Iterator<Item = f32>) -> (f32, usize) {
    values
        .enumerate()
        .fold(None, |best: Option<(f32, usize)>, (i, v)| match best {
            Some((max, _)) if v <= max => best,
            _ => Some((v, i)),
        })
        .unwrap_or((0.0, 0))
}
