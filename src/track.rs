use nalgebra as na;

use crate::bbox::{BBox, Ltrb};
use crate::circular_queue::CircularQueue;
use crate::detection::Detection;

/// Most recent trajectory points considered by the instantaneous speed
/// estimate.
const SPEED_WINDOW: usize = 5;

/// One live tracked object. Owned by the `Tracker`; the trajectory is
/// mutated only through `update`.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: u32,
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
    pub frames_since_update: u32,
    trajectory: CircularQueue<na::Point2<f32>>,
}

impl Track {
    /// Track born from an unmatched detection, trajectory seeded with the
    /// detection centroid.
    pub fn new(id: u32, detection: &Detection, max_trajectory_len: usize) -> Self {
        let mut trajectory = CircularQueue::with_capacity(max_trajectory_len);
        trajectory.push(detection.center());

        Self {
            id,
            bbox: detection.bbox,
            confidence: detection.confidence,
            frames_since_update: 0,
            trajectory,
        }
    }

    /// Apply a matched detection: replace bbox and confidence, append the
    /// new centroid (evicting the oldest point when full) and reset the
    /// staleness counter.
    pub fn update(&mut self, detection: &Detection) {
        self.bbox = detection.bbox;
        self.confidence = detection.confidence;
        self.frames_since_update = 0;
        self.trajectory.push(detection.center());
    }

    #[inline]
    pub fn last_position(&self) -> na::Point2<f32> {
        // trajectory is seeded at construction and never emptied
        *self.trajectory.last().unwrap()
    }

    #[inline]
    pub fn trajectory_len(&self) -> usize {
        self.trajectory.len()
    }

    /// Mean per-step displacement over the last `min(5, len)` trajectory
    /// points, in pixels per frame. Zero with fewer than two points.
    pub fn speed(&self) -> f32 {
        let len = self.trajectory.len();
        let window = len.min(SPEED_WINDOW);
        if window < 2 {
            return 0.0;
        }

        let recent: Vec<_> = self.trajectory.iter().skip(len - window).collect();
        let total: f32 = recent
            .windows(2)
            .map(|w| na::distance(w[0], w[1]))
            .sum();

        total / (window - 1) as f32
    }

    /// Read-only projection for callers, classified against the given
    /// pixel-space motile speed threshold.
    pub fn snapshot(&self, motile_speed: f32) -> TrackedObject {
        let velocity = self.speed();

        TrackedObject {
            id: self.id,
            bbox: self.bbox,
            confidence: self.confidence,
            frames_since_update: self.frames_since_update,
            velocity,
            is_motile: velocity > motile_speed,
            trajectory: self.trajectory.iter().copied().collect(),
        }
    }
}

/// Point-in-time projection of a `Track`, produced fresh each frame.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    pub id: u32,
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
    pub frames_since_update: u32,
    /// Pixels per frame over the recent trajectory.
    pub velocity: f32,
    pub is_motile: bool,
    /// Temporal order, oldest first.
    pub trajectory: Vec<na::Point2<f32>>,
}
