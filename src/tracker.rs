use std::collections::{BTreeMap, HashSet};

use log::debug;
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::track::{Track, TrackedObject};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    /// Live-track population cap.
    pub max_tracks: usize,
    /// Gating radius for detection-to-track matching, in pixels.
    pub max_match_distance: f32,
    /// Trajectory history bound per track.
    pub max_trajectory_len: usize,
    /// Frames a track survives without a matched detection.
    pub max_frames_since_update: u32,
    /// Pixel-per-frame speed above which a track is considered motile.
    pub motile_speed: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_tracks: 50,
            max_match_distance: 100.0,
            max_trajectory_len: 30,
            max_frames_since_update: 10,
            motile_speed: 2.0,
        }
    }
}

/// Stateful per-frame track manager. Single-hypothesis greedy
/// nearest-centroid association: simple and reproducible, not globally
/// optimal under dense crossing trajectories.
///
/// `step` must be called once per frame in strict frame order by a single
/// caller; staleness counters and speed estimates assume no reordering.
pub struct Tracker {
    config: TrackerConfig,
    tracks: BTreeMap<u32, Track>,
    next_id: u32,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Consume one frame of NMS-filtered detections and emit a snapshot of
    /// every surviving track. Return order carries no contract; callers
    /// identify tracks by `id`.
    pub fn step(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        let mut updated: HashSet<u32> = HashSet::new();

        // Greedy assignment in detection input order. Among tracks not yet
        // matched this frame the closest centroid within the gating radius
        // wins; ties go to the first candidate in id order.
        for det in detections {
            let center = det.center();
            let mut best: Option<(u32, f32)> = None;

            for (id, track) in &self.tracks {
                if updated.contains(id) {
                    continue;
                }

                let dist = na::distance(&center, &track.last_position());
                if dist < self.config.max_match_distance
                    && best.map_or(true, |(_, best_dist)| dist < best_dist)
                {
                    best = Some((*id, dist));
                }
            }

            if let Some((id, _)) = best {
                if let Some(track) = self.tracks.get_mut(&id) {
                    track.update(det);
                }
                updated.insert(id);
            } else if self.tracks.len() < self.config.max_tracks {
                let id = self.next_id;
                self.next_id += 1;
                self.tracks
                    .insert(id, Track::new(id, det, self.config.max_trajectory_len));
                // a newborn consumed its detection and is not a candidate
                // for the rest of this frame
                updated.insert(id);
            }
            // population saturated: the detection is dropped
        }

        // Age unmatched tracks, then evict everything past the staleness
        // threshold. A track matched this frame has a zero counter and
        // always survives.
        for (id, track) in self.tracks.iter_mut() {
            if !updated.contains(id) {
                track.frames_since_update += 1;
            }
        }

        let threshold = self.config.max_frames_since_update;
        self.tracks
            .retain(|_, track| track.frames_since_update <= threshold);

        debug!("{} live tracks", self.tracks.len());

        self.tracks
            .values()
            .map(|track| track.snapshot(self.config.motile_speed))
            .collect()
    }
}
