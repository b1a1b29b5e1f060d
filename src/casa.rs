//! CASA kinematics over finished trajectories.
//!
//! All velocities are micron-per-second values obtained by scaling pixel
//! coordinates with the microscope calibration ratio; elapsed time is
//! `(points - 1) / frame_rate`. Every metric degrades to zero instead of
//! failing on degenerate input (short tracks, zero path, no valid tracks).

use log::debug;
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::math;
use crate::track::TrackedObject;

/// VCL above which a cell counts as motile, µm/s.
const MOTILE_VCL: f64 = 10.0;
/// VSL above which a cell counts as progressively motile, µm/s.
const PROGRESSIVE_VSL: f64 = 25.0;
/// Minimum trajectory points for beat-pattern analysis.
const MIN_BEAT_POINTS: usize = 10;
/// Centered moving-average window for the VAP path.
const SMOOTHING_WINDOW: usize = 3;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CasaConfig {
    /// Acquisition frame rate, frames per second.
    pub frame_rate: f64,
    /// Microscope calibration: microns per pixel.
    pub pixel_to_micron: f64,
    /// Minimum trajectory points for a track to enter the statistics.
    pub min_track_length: usize,
}

impl Default for CasaConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            pixel_to_micron: 0.5,
            min_track_length: 5,
        }
    }
}

/// Per-track kinematics.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct IndividualMetrics {
    pub vcl: f64,
    pub vsl: f64,
    pub linearity: f64,
    pub is_motile: bool,
}

/// Population means over the valid tracks of one snapshot list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct CasaMetrics {
    pub vcl: f64,
    pub vsl: f64,
    pub lin: f64,
    /// Motile share of valid tracks, percent.
    pub motility: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct AdvancedCasaMetrics {
    pub vap: f64,
    /// VCL/VAP ratio, percent.
    pub wobble: f64,
    /// Lateral beat-cross frequency, Hz.
    pub beat_frequency: f64,
    /// Mean lateral displacement at beat peaks, µm.
    pub amplitude: f64,
    /// Progressively motile share of valid tracks, percent.
    pub progressive_motility: f64,
}

/// Stateless metric engine; recomputes everything on demand from the
/// snapshot list it is handed.
pub struct CasaCalculator {
    config: CasaConfig,
}

impl CasaCalculator {
    pub fn new(config: CasaConfig) -> Self {
        Self { config }
    }

    /// Population VCL/VSL/LIN means and motility percentage. All-zero
    /// metrics when no track has enough trajectory points.
    pub fn calculate_metrics(&self, tracks: &[TrackedObject]) -> CasaMetrics {
        let valid: Vec<&TrackedObject> = tracks
            .iter()
            .filter(|t| t.trajectory.len() >= self.config.min_track_length)
            .collect();

        if valid.is_empty() {
            return CasaMetrics::default();
        }

        let mut vcl_sum = 0.0;
        let mut vsl_sum = 0.0;
        let mut lin_sum = 0.0;
        let mut motile = 0usize;

        for track in &valid {
            let m = self.individual_metrics(track);
            vcl_sum += m.vcl;
            vsl_sum += m.vsl;
            lin_sum += m.linearity;
            if m.is_motile {
                motile += 1;
            }
        }

        let n = valid.len() as f64;
        let metrics = CasaMetrics {
            vcl: vcl_sum / n,
            vsl: vsl_sum / n,
            lin: lin_sum / n,
            motility: motile as f64 / n * 100.0,
        };

        debug!(
            "casa: vcl {:.2} vsl {:.2} lin {:.2} motility {:.1}% over {} tracks",
            metrics.vcl, metrics.vsl, metrics.lin, metrics.motility, valid.len()
        );

        metrics
    }

    /// Population VAP/WOB/beat means and progressive-motility percentage,
    /// with the same zero-track guard as `calculate_metrics`.
    pub fn calculate_advanced_metrics(&self, tracks: &[TrackedObject]) -> AdvancedCasaMetrics {
        let valid: Vec<&TrackedObject> = tracks
            .iter()
            .filter(|t| t.trajectory.len() >= self.config.min_track_length)
            .collect();

        if valid.is_empty() {
            return AdvancedCasaMetrics::default();
        }

        let mut vap_sum = 0.0;
        let mut wobble_sum = 0.0;
        let mut frequency_sum = 0.0;
        let mut amplitude_sum = 0.0;
        let mut progressive = 0usize;

        for track in &valid {
            let trajectory = self.micron_trajectory(track);

            let vcl = self.vcl(&trajectory);
            let vap = self.vap(&trajectory);
            vap_sum += vap;
            wobble_sum += if vap > 0.0 { vcl / vap * 100.0 } else { 0.0 };

            let (frequency, amplitude) = self.beat_pattern(&trajectory);
            frequency_sum += frequency;
            amplitude_sum += amplitude;

            if self.vsl(&trajectory) > PROGRESSIVE_VSL {
                progressive += 1;
            }
        }

        let n = valid.len() as f64;
        AdvancedCasaMetrics {
            vap: vap_sum / n,
            wobble: wobble_sum / n,
            beat_frequency: frequency_sum / n,
            amplitude: amplitude_sum / n,
            progressive_motility: progressive as f64 / n * 100.0,
        }
    }

    /// Kinematics of a single track; all zero below the minimum trajectory
    /// length.
    pub fn individual_metrics(&self, track: &TrackedObject) -> IndividualMetrics {
        if track.trajectory.len() < self.config.min_track_length {
            return IndividualMetrics::default();
        }

        let trajectory = self.micron_trajectory(track);
        let vcl = self.vcl(&trajectory);
        let vsl = self.vsl(&trajectory);

        IndividualMetrics {
            vcl,
            vsl,
            linearity: if vcl > 0.0 { vsl / vcl * 100.0 } else { 0.0 },
            is_motile: vcl > MOTILE_VCL,
        }
    }

    fn micron_trajectory(&self, track: &TrackedObject) -> Vec<na::Point2<f64>> {
        let ratio = self.config.pixel_to_micron;
        track
            .trajectory
            .iter()
            .map(|p| na::Point2::new(p.x as f64 * ratio, p.y as f64 * ratio))
            .collect()
    }

    fn elapsed(&self, points: usize) -> f64 {
        (points - 1) as f64 / self.config.frame_rate
    }

    /// Curvilinear velocity: length of the actual path over elapsed time.
    fn vcl(&self, trajectory: &[na::Point2<f64>]) -> f64 {
        if trajectory.len() < 2 {
            return 0.0;
        }

        let elapsed = self.elapsed(trajectory.len());
        if elapsed > 0.0 {
            math::path_length(trajectory) / elapsed
        } else {
            0.0
        }
    }

    /// Straight-line velocity: first-to-last displacement over elapsed
    /// time.
    fn vsl(&self, trajectory: &[na::Point2<f64>]) -> f64 {
        if trajectory.len() < 2 {
            return 0.0;
        }

        let straight = na::distance(&trajectory[0], &trajectory[trajectory.len() - 1]);
        let elapsed = self.elapsed(trajectory.len());
        if elapsed > 0.0 {
            straight / elapsed
        } else {
            0.0
        }
    }

    /// Average-path velocity: VCL over the smoothed trajectory. Falls back
    /// to VSL with fewer than three points.
    fn vap(&self, trajectory: &[na::Point2<f64>]) -> f64 {
        if trajectory.len() < 3 {
            return self.vsl(trajectory);
        }

        self.vcl(&smooth_trajectory(trajectory))
    }

    /// Beat-cross frequency (Hz) and mean lateral amplitude (µm) from the
    /// peaks of the perpendicular deviation off the first-to-last line.
    /// `(0, 0)` for short tracks and for a zero-length mean path.
    fn beat_pattern(&self, trajectory: &[na::Point2<f64>]) -> (f64, f64) {
        if trajectory.len() < MIN_BEAT_POINTS {
            return (0.0, 0.0);
        }

        let start = trajectory[0];
        let end = trajectory[trajectory.len() - 1];
        if na::distance(&start, &end) == 0.0 {
            return (0.0, 0.0);
        }

        let deviations: Vec<f64> = trajectory
            .iter()
            .map(|p| math::perpendicular_distance(p, &start, &end))
            .collect();

        let peaks = find_peaks(&deviations);

        let frequency = if peaks.len() > 1 {
            (peaks.len() - 1) as f64 * self.config.frame_rate / trajectory.len() as f64
        } else {
            0.0
        };

        let amplitude = if peaks.is_empty() {
            0.0
        } else {
            peaks.iter().map(|&i| deviations[i]).sum::<f64>() / peaks.len() as f64
        };

        (frequency, amplitude)
    }
}

/// Centered moving average, window clamped at the sequence boundaries.
/// Sequences of three or fewer points pass through unchanged.
fn smooth_trajectory(trajectory: &[na::Point2<f64>]) -> Vec<na::Point2<f64>> {
    if trajectory.len() <= SMOOTHING_WINDOW {
        return trajectory.to_vec();
    }

    let half = SMOOTHING_WINDOW / 2;
    (0..trajectory.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half).min(trajectory.len() - 1);
            let window = &trajectory[start..=end];

            let n = window.len() as f64;
            let sum = window
                .iter()
                .fold(na::Vector2::zeros(), |acc, p| acc + p.coords);

            na::Point2::from(sum / n)
        })
        .collect()
}

/// Indices of strict local maxima (greater than both neighbors).
fn find_peaks(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();

    for i in 1..data.len().saturating_sub(1) {
        if data[i] > data[i - 1] && data[i] > data[i + 1] {
            peaks.push(i);
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use approx::assert_relative_eq;

    fn track(points: &[(f32, f32)]) -> TrackedObject {
        TrackedObject {
            id: 1,
            bbox: BBox::ltrb(0.0, 0.0, 10.0, 10.0),
            confidence: 0.9,
            frames_since_update: 0,
            velocity: 0.0,
            is_motile: false,
            trajectory: points
                .iter()
                .map(|&(x, y)| na::Point2::new(x, y))
                .collect(),
        }
    }

    fn calculator() -> CasaCalculator {
        CasaCalculator::new(CasaConfig::default())
    }

    #[test]
    fn straight_path_worked_example() {
        // 5 points, 10 px apart, at 30 fps and 0.5 µm/px: path of 20 µm
        // over 4/30 s, so VCL = VSL = 150 µm/s and LIN = 100 %.
        let t = track(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (40.0, 0.0)]);
        let m = calculator().individual_metrics(&t);

        assert_relative_eq!(m.vcl, 150.0, epsilon = 1e-4);
        assert_relative_eq!(m.vsl, 150.0, epsilon = 1e-4);
        assert_relative_eq!(m.linearity, 100.0, epsilon = 1e-4);
        assert!(m.is_motile);
    }

    #[test]
    fn short_trajectory_yields_zero_metrics() {
        let t = track(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let m = calculator().individual_metrics(&t);

        assert_eq!(m, IndividualMetrics::default());
    }

    #[test]
    fn vsl_never_exceeds_vcl() {
        let t = track(&[
            (0.0, 0.0),
            (10.0, 8.0),
            (20.0, -6.0),
            (30.0, 9.0),
            (40.0, -4.0),
            (50.0, 2.0),
        ]);
        let m = calculator().individual_metrics(&t);

        assert!(m.vsl <= m.vcl);
        assert!(m.linearity <= 100.0);
    }

    #[test]
    fn stationary_track_is_not_motile() {
        let t = track(&[(5.0, 5.0); 6]);
        let m = calculator().individual_metrics(&t);

        assert_eq!(m.vcl, 0.0);
        assert_eq!(m.linearity, 0.0);
        assert!(!m.is_motile);
    }

    #[test]
    fn empty_track_list_yields_zero_aggregates() {
        let c = calculator();
        assert_eq!(c.calculate_metrics(&[]), CasaMetrics::default());
        assert_eq!(
            c.calculate_advanced_metrics(&[]),
            AdvancedCasaMetrics::default()
        );

        // tracks below the minimum length are no better than none
        let short = [track(&[(0.0, 0.0), (5.0, 0.0)])];
        assert_eq!(c.calculate_metrics(&short), CasaMetrics::default());
    }

    #[test]
    fn motility_percentage_counts_motile_share() {
        let fast = track(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (40.0, 0.0)]);
        let slow = track(&[(0.0, 0.0), (0.1, 0.0), (0.2, 0.0), (0.3, 0.0), (0.4, 0.0)]);

        let m = calculator().calculate_metrics(&[fast, slow]);
        assert_relative_eq!(m.motility, 50.0);
    }

    #[test]
    fn vap_reflects_boundary_clamped_smoothing() {
        // straight 5-point path: clamped end windows average only two
        // points, pulling both ends half a step inward. 20 µm of raw path
        // becomes 15 µm smoothed, so VAP = 112.5 µm/s against VCL = 150.
        let t = track(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (40.0, 0.0)]);
        let c = calculator();
        let trajectory = c.micron_trajectory(&t);

        assert_relative_eq!(c.vap(&trajectory), 112.5, epsilon = 1e-9);
        assert_relative_eq!(c.vcl(&trajectory), 150.0, epsilon = 1e-9);
    }

    #[test]
    fn smoothing_shortens_zigzag_paths() {
        let t = track(&[
            (0.0, 0.0),
            (10.0, 10.0),
            (20.0, 0.0),
            (30.0, 10.0),
            (40.0, 0.0),
            (50.0, 10.0),
        ]);
        let c = calculator();
        let trajectory = c.micron_trajectory(&t);

        // the smoothed path is shorter, so wobble = VCL/VAP exceeds 100 %
        assert!(c.vap(&trajectory) < c.vcl(&trajectory));

        let advanced = c.calculate_advanced_metrics(&[t]);
        assert!(advanced.wobble > 100.0);
    }

    #[test]
    fn beat_pattern_finds_lateral_oscillation() {
        // 11 points along x with alternating 6 px lateral excursions:
        // 5 strict peaks off the straight mean path
        let points: Vec<(f32, f32)> = (0..11)
            .map(|i| (i as f32 * 10.0, if i % 2 == 1 { 6.0 } else { 0.0 }))
            .collect();
        let t = track(&points);

        let c = calculator();
        let (frequency, amplitude) = c.beat_pattern(&c.micron_trajectory(&t));

        assert_relative_eq!(frequency, 4.0 * 30.0 / 11.0, epsilon = 1e-9);
        // 6 px excursions are 3 µm at 0.5 µm/px
        assert_relative_eq!(amplitude, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn beat_pattern_guards_short_and_degenerate_tracks() {
        let c = calculator();

        let short = c.micron_trajectory(&track(&[(0.0, 0.0); 9]));
        assert_eq!(c.beat_pattern(&short), (0.0, 0.0));

        // zero-length mean path: first and last point coincide
        let mut loop_points: Vec<(f32, f32)> = (0..12)
            .map(|i| {
                let a = i as f32 / 12.0 * std::f32::consts::TAU;
                (a.cos() * 10.0, a.sin() * 10.0)
            })
            .collect();
        loop_points.push(loop_points[0]);

        let closed = c.micron_trajectory(&track(&loop_points));
        assert_eq!(c.beat_pattern(&closed), (0.0, 0.0));
    }

    #[test]
    fn progressive_motility_uses_vsl_threshold() {
        // fast and straight: progressive
        let straight = track(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (40.0, 0.0)]);
        // fast but circling back: high VCL, near-zero VSL
        let circling = track(&[(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0), (0.1, 0.0)]);

        let advanced = calculator().calculate_advanced_metrics(&[straight, circling]);
        assert_relative_eq!(advanced.progressive_motility, 50.0);
    }
}
