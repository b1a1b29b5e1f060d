use serde_derive::{Deserialize, Serialize};

use crate::casa::CasaConfig;
use crate::detector::DetectorConfig;
use crate::error::Error;
use crate::tracker::TrackerConfig;

/// Complete analyzer configuration. Defaults match the reference setup:
/// 640 px model input, 30 fps acquisition, 0.5 µm/px calibration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct AnalyzerConfig {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub casa: CasaConfig,
}

impl AnalyzerConfig {
    /// Reject non-finite or out-of-range scalars up front, so the analysis
    /// core itself never has to fail.
    pub fn validate(&self) -> Result<(), Error> {
        positive("detector.input_size", self.detector.input_size as f64)?;
        unit_range(
            "detector.confidence_threshold",
            self.detector.confidence_threshold as f64,
        )?;
        unit_range("detector.iou_threshold", self.detector.iou_threshold as f64)?;

        nonzero("tracker.max_tracks", self.tracker.max_tracks)?;
        nonzero("tracker.max_trajectory_len", self.tracker.max_trajectory_len)?;
        positive(
            "tracker.max_match_distance",
            self.tracker.max_match_distance as f64,
        )?;
        non_negative("tracker.motile_speed", self.tracker.motile_speed as f64)?;

        positive("casa.frame_rate", self.casa.frame_rate)?;
        positive("casa.pixel_to_micron", self.casa.pixel_to_micron)?;
        nonzero("casa.min_track_length", self.casa.min_track_length)?;

        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Negative { name, value })
    }
}

fn unit_range(name: &'static str, value: f64) -> Result<(), Error> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::OutOfUnitRange { name, value })
    }
}

fn nonzero(name: &'static str, value: usize) -> Result<(), Error> {
    if value > 0 {
        Ok(())
    } else {
        Err(Error::ZeroLimit { name })
    }
}
