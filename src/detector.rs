use log::debug;
use ndarray::prelude::*;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::detection::Detection;

/// Model output is a flat buffer of `(cx, cy, w, h, confidence, class)`
/// tuples, box components normalized to [0, 1].
pub const OUTPUT_TUPLE_LEN: usize = 6;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Side length of the square model input, in pixels.
    pub input_size: f32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: 640.0,
            confidence_threshold: 0.5,
            iou_threshold: 0.4,
        }
    }
}

/// Decodes raw detector output into pixel-space detections and removes
/// duplicates with greedy NMS. Pure per-frame transform, no state.
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, raw: &[f32]) -> Vec<Detection> {
        let detections = self.decode(raw);
        self.non_maximum_suppression(detections)
    }

    /// Decode the flat model output, scaling normalized boxes to pixel
    /// space and dropping low-confidence rows. A trailing partial tuple is
    /// discarded.
    pub fn decode(&self, raw: &[f32]) -> Vec<Detection> {
        let count = raw.len() / OUTPUT_TUPLE_LEN;
        let view = ArrayView2::from_shape((count, OUTPUT_TUPLE_LEN), &raw[..count * OUTPUT_TUPLE_LEN])
            .expect("prefix length is a multiple of the tuple length");

        let size = self.config.input_size;
        let mut detections = Vec::new();

        for row in view.rows() {
            let &[cx, cy, w, h, confidence, class] = row.as_slice().expect("row-major view")
            else {
                unreachable!()
            };

            if confidence <= self.config.confidence_threshold {
                continue;
            }

            let cx = cx * size;
            let cy = cy * size;
            let w = w * size;
            let h = h * size;

            detections.push(Detection::new(
                BBox::ltrb(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
                confidence,
                class as i32,
            ));
        }

        debug!("decoded {} detections from model output", detections.len());
        detections
    }

    /// Greedy non-maximum suppression: keep a detection only when its IoU
    /// against every already-kept detection stays at or below the
    /// threshold. The sort is stable, so equal confidences keep their
    /// input order and the first-seen one wins.
    pub fn non_maximum_suppression(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        let total = detections.len();
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());

        'candidates: for det in detections {
            for survivor in &kept {
                if det.iou(survivor) > self.config.iou_threshold {
                    continue 'candidates;
                }
            }

            kept.push(det);
        }

        debug!("{} detections left of {} after nms", kept.len(), total);
        kept
    }
}
