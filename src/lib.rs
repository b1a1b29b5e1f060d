//! Detection-to-track association and CASA kinematics for microscopy
//! video.
//!
//! The crate is fed one frame of raw detector output at a time (a flat
//! buffer of normalized `(cx, cy, w, h, confidence, class)` tuples from an
//! external inference layer) and turns it into persistent tracked objects
//! and population-level motility metrics. It never touches pixels, cameras
//! or model files.

pub mod bbox;
pub mod casa;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod math;
pub mod track;
pub mod tracker;

mod circular_queue;

pub use casa::{AdvancedCasaMetrics, CasaCalculator, CasaConfig, CasaMetrics, IndividualMetrics};
pub use config::AnalyzerConfig;
pub use detection::Detection;
pub use detector::{Detector, DetectorConfig};
pub use error::Error;
pub use track::TrackedObject;
pub use tracker::{Tracker, TrackerConfig};

/// Single-owner analysis pipeline: decode and NMS, a stateful tracker
/// step, and on-demand CASA metrics over the latest snapshot list.
///
/// One frame, one `process_frame` call, in strict frame order; the tracker
/// state is not designed for concurrent callers.
pub struct Analyzer {
    detector: Detector,
    tracker: Tracker,
    casa: CasaCalculator,
    snapshots: Vec<TrackedObject>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            detector: Detector::new(config.detector),
            tracker: Tracker::new(config.tracker),
            casa: CasaCalculator::new(config.casa),
            snapshots: Vec::new(),
        })
    }

    /// Run one frame of raw model output through decode, NMS and the
    /// tracker, keeping the resulting snapshots for metric queries.
    pub fn process_frame(&mut self, raw: &[f32]) -> &[TrackedObject] {
        let detections = self.detector.process(raw);
        self.snapshots = self.tracker.step(&detections);
        &self.snapshots
    }

    /// Snapshots from the most recent frame.
    #[inline]
    pub fn tracked_objects(&self) -> &[TrackedObject] {
        &self.snapshots
    }

    /// Population VCL/VSL/LIN and motility over the current tracks.
    #[inline]
    pub fn metrics(&self) -> CasaMetrics {
        self.casa.calculate_metrics(&self.snapshots)
    }

    /// Population VAP/WOB/beat metrics and progressive motility over the
    /// current tracks.
    #[inline]
    pub fn advanced_metrics(&self) -> AdvancedCasaMetrics {
        self.casa.calculate_advanced_metrics(&self.snapshots)
    }
}
