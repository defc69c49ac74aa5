//! Presence detection pipeline.
//!
//! Per frame: the filter bank reduces the frame to per-point statistics, the
//! intra- and inter-frame estimators advance each point's filter state into
//! depthwise scores, and the aggregator turns those into one decision.

pub mod aggregator;
pub mod filter;
pub mod filter_bank;
pub mod inter_frame;
pub mod intra_frame;

pub use aggregator::{Decision, DecisionAggregator};
pub use filter::SmoothingFactors;
pub use filter_bank::{FilterBank, FilterState};
pub use inter_frame::InterFrameEstimator;
pub use intra_frame::IntraFrameEstimator;

use crate::frame::ProcessedFrame;
use crate::metadata::PresenceMetadata;
use crate::PresenceConfig;

/// All stages of the pipeline for one detector.
#[derive(Debug, Clone)]
pub struct PresencePipeline {
    bank: FilterBank,
    intra: IntraFrameEstimator,
    inter: InterFrameEstimator,
    aggregator: DecisionAggregator,
    intra_scores: Vec<f32>,
    inter_scores: Vec<f32>,
}

impl PresencePipeline {
    /// Pipeline for a validated `config` resolved to `metadata`.
    #[must_use]
    pub fn new(config: &PresenceConfig, metadata: &PresenceMetadata) -> Self {
        let factors = SmoothingFactors::from_config(config);
        let points = usize::from(metadata.num_points);
        Self {
            bank: FilterBank::new(points, usize::from(config.sweeps_per_frame()), factors.noise),
            intra: IntraFrameEstimator::new(config, &factors),
            inter: InterFrameEstimator::new(config, &factors),
            aggregator: DecisionAggregator::new(config, metadata),
            intra_scores: vec![0.0; points],
            inter_scores: vec![0.0; points],
        }
    }

    /// Adopt new filter settings for the same geometry, keeping filter state.
    pub fn reconfigure(&mut self, config: &PresenceConfig, metadata: &PresenceMetadata) {
        let factors = SmoothingFactors::from_config(config);
        self.bank.set_noise_alpha(factors.noise);
        self.intra = IntraFrameEstimator::new(config, &factors);
        self.inter = InterFrameEstimator::new(config, &factors);
        self.aggregator = DecisionAggregator::new(config, metadata);
    }

    pub fn reset(&mut self) {
        self.bank.reset();
        self.intra_scores.fill(0.0);
        self.inter_scores.fill(0.0);
    }

    #[must_use]
    pub fn filter_bank(&self) -> &FilterBank {
        &self.bank
    }

    /// Run one frame through every stage.
    pub fn run(&mut self, frame: &ProcessedFrame<'_>) -> Decision {
        self.bank.advance(
            frame,
            &self.intra,
            &self.inter,
            &mut self.intra_scores,
            &mut self.inter_scores,
        );
        self.aggregator.decide(&self.intra_scores, &self.inter_scores)
    }

    /// Depthwise scores of the last frame.
    #[must_use]
    pub fn intra_scores(&self) -> &[f32] {
        &self.intra_scores
    }

    #[must_use]
    pub fn inter_scores(&self) -> &[f32] {
        &self.inter_scores
    }
}
