// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Weighted box fusion across tile boundaries
//!
//! Overlapping tiles see the same physical object twice, each copy with a
//! positional bias toward its own tile. Plain non-max suppression would throw
//! one copy away; weighted box fusion instead averages the copies, weighted
//! by confidence, which recovers a better box than either tile produced.

use planfuse_core::Detection;
use rustc_hash::FxHashMap;

const IOU_EPSILON: f32 = 1e-6;

/// Per-class weighted box fusion.
#[derive(Debug, Clone, Copy)]
pub struct BoxFusionMerger {
    iou_threshold: f32,
}

impl BoxFusionMerger {
    pub fn new(iou_threshold: f32) -> Self {
        Self { iou_threshold }
    }

    /// Fuse duplicate detections into a deduplicated set.
    ///
    /// After merging, no two detections of the same class overlap above the
    /// IoU threshold, so running the merger on its own output is a no-op.
    pub fn merge(&self, detections: &[Detection]) -> Vec<Detection> {
        if detections.is_empty() {
            return Vec::new();
        }

        let mut by_class: FxHashMap<u32, Vec<Detection>> = FxHashMap::default();
        for det in detections {
            by_class.entry(det.class_id).or_default().push(*det);
        }

        let mut class_ids: Vec<u32> = by_class.keys().copied().collect();
        class_ids.sort_unstable();

        let mut merged = Vec::new();
        for class_id in class_ids {
            let mut remaining = by_class.remove(&class_id).unwrap_or_default();
            remaining.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

            while !remaining.is_empty() {
                let seed = remaining[0];
                let (cluster, rest): (Vec<Detection>, Vec<Detection>) = remaining
                    .into_iter()
                    .partition(|d| iou(&seed.bbox, &d.bbox) > self.iou_threshold);

                merged.push(fuse_cluster(&cluster, class_id));
                remaining = rest;
            }
        }

        tracing::debug!(
            input = detections.len(),
            output = merged.len(),
            "weighted box fusion"
        );
        merged
    }
}

/// Score-weighted centroid of the cluster's coordinates, mean of its scores.
fn fuse_cluster(cluster: &[Detection], class_id: u32) -> Detection {
    if cluster.len() == 1 {
        return cluster[0];
    }

    let weight_sum: f32 = cluster.iter().map(|d| d.score).sum();
    let mut bbox = [0.0f32; 4];

    if weight_sum > IOU_EPSILON {
        for det in cluster {
            for (acc, coord) in bbox.iter_mut().zip(det.bbox) {
                *acc += coord * det.score;
            }
        }
        for coord in &mut bbox {
            *coord /= weight_sum;
        }
    } else {
        for det in cluster {
            for (acc, coord) in bbox.iter_mut().zip(det.bbox) {
                *acc += coord;
            }
        }
        for coord in &mut bbox {
            *coord /= cluster.len() as f32;
        }
    }

    let score = cluster.iter().map(|d| d.score).sum::<f32>() / cluster.len() as f32;
    Detection::new(bbox, score, class_id)
}

/// Intersection over union with an epsilon-guarded denominator.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    intersection / (union + IOU_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn overlapping_same_class_boxes_fuse_into_one() {
        let a = Detection::new([100.0, 100.0, 200.0, 200.0], 0.9, 2);
        let b = Detection::new([110.0, 110.0, 210.0, 210.0], 0.6, 2);
        let merger = BoxFusionMerger::new(0.45);

        let merged = merger.merge(&[a, b]);
        assert_eq!(merged.len(), 1);

        let fused = merged[0];
        assert_relative_eq!(fused.score, 0.75, epsilon = 1e-6);

        // Coordinates lie inside the inputs' convex hull.
        for i in 0..4 {
            let lo = a.bbox[i].min(b.bbox[i]);
            let hi = a.bbox[i].max(b.bbox[i]);
            assert!(fused.bbox[i] >= lo && fused.bbox[i] <= hi);
        }

        // Weighted toward the higher-confidence box.
        assert!(fused.bbox[0] < 105.0);
    }

    #[test]
    fn boxes_below_threshold_are_both_preserved() {
        let a = Detection::new([0.0, 0.0, 100.0, 100.0], 0.9, 2);
        let b = Detection::new([90.0, 90.0, 190.0, 190.0], 0.8, 2);
        let merger = BoxFusionMerger::new(0.45);

        let merged = merger.merge(&[a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn classes_never_fuse_across_each_other() {
        let a = Detection::new([100.0, 100.0, 200.0, 200.0], 0.9, 1);
        let b = Detection::new([100.0, 100.0, 200.0, 200.0], 0.9, 2);
        let merger = BoxFusionMerger::new(0.45);

        let merged = merger.merge(&[a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merging_a_merged_set_is_a_no_op() {
        let detections = vec![
            Detection::new([100.0, 100.0, 200.0, 200.0], 0.9, 2),
            Detection::new([104.0, 98.0, 204.0, 202.0], 0.7, 2),
            Detection::new([400.0, 400.0, 500.0, 500.0], 0.8, 2),
            Detection::new([120.0, 120.0, 180.0, 180.0], 0.85, 1),
        ];
        let merger = BoxFusionMerger::new(0.45);

        let once = merger.merge(&detections);
        let twice = merger.merge(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let merger = BoxFusionMerger::new(0.45);
        assert!(merger.merge(&[]).is_empty());
    }

    #[test]
    fn iou_of_identical_boxes_is_nearly_one() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(iou(&b, &b), 1.0, epsilon = 1e-4);
        assert_relative_eq!(iou(&b, &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }
}
