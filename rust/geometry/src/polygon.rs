// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary mask to validated room polygons
//!
//! Extracts external contours from a segmentation mask, simplifies them with
//! a Douglas-Peucker pass, and validates that each ring is simple. A ring
//! that self-intersects gets exactly one repair attempt: the ring is split at
//! its first self-intersection and the largest valid component is kept.
//! Contours that survive neither validation nor repair are dropped locally
//! and counted, never escalated.

use crate::error::GeometryError;
use geo::{Coord, LineString, Polygon};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;

/// A validated, simple room polygon.
///
/// `pixel_area` is the exact pixel count of the underlying mask region,
/// which is what scale calibration consumes; the simplified ring is only an
/// outline for containment tests and display.
#[derive(Debug, Clone)]
pub struct RoomPolygon {
    poly: Polygon<f64>,
    pixel_area: f64,
}

impl RoomPolygon {
    pub(crate) fn new(poly: Polygon<f64>, pixel_area: f64) -> Self {
        Self { poly, pixel_area }
    }

    /// Mask region size in pixels.
    pub fn pixel_area(&self) -> f64 {
        self.pixel_area
    }

    pub fn as_geo(&self) -> &Polygon<f64> {
        &self.poly
    }

    /// Exterior ring vertices as `[x, y]` pairs, without the closing vertex.
    pub fn exterior_points(&self) -> Vec<[f64; 2]> {
        let coords = &self.poly.exterior().0;
        let open = if coords.len() > 1 && coords.first() == coords.last() {
            &coords[..coords.len() - 1]
        } else {
            &coords[..]
        };
        open.iter().map(|c| [c.x, c.y]).collect()
    }
}

/// Result of polygonizing one mask.
#[derive(Debug, Clone)]
pub struct PolygonizeOutcome {
    pub polygons: Vec<RoomPolygon>,
    /// Contours discarded because validation and repair both failed.
    pub dropped: usize,
}

/// Converts a binary room mask into validated polygons.
#[derive(Debug, Clone, Copy)]
pub struct MaskPolygonizer {
    min_area: f64,
    simplify_ratio: f64,
}

impl MaskPolygonizer {
    /// `min_area` is the minimum region size in pixels; `simplify_ratio`
    /// scales the Douglas-Peucker epsilon by contour perimeter (0.005 keeps
    /// right angles while collapsing raster staircases).
    pub fn new(min_area: f64, simplify_ratio: f64) -> Self {
        Self {
            min_area,
            simplify_ratio,
        }
    }

    /// Extract validated room polygons from a binary mask.
    ///
    /// Non-zero pixels are room interior.
    pub fn polygonize(&self, mask: &GrayImage) -> Result<PolygonizeOutcome, GeometryError> {
        if mask.width() == 0 || mask.height() == 0 {
            return Err(GeometryError::EmptyMask);
        }

        let labeled = connected_components(mask, Connectivity::Eight, Luma([0u8]));
        let mut region_sizes: HashMap<u32, u64> = HashMap::new();
        for pixel in labeled.pixels() {
            let label = pixel.0[0];
            if label != 0 {
                *region_sizes.entry(label).or_insert(0) += 1;
            }
        }

        let contours = find_contours::<i32>(mask);
        let mut polygons = Vec::new();
        let mut dropped = 0usize;

        for contour in contours {
            if contour.border_type != BorderType::Outer || contour.points.is_empty() {
                continue;
            }

            let first = contour.points[0];
            let label = labeled.get_pixel(first.x as u32, first.y as u32).0[0];
            let pixel_area = region_sizes.get(&label).copied().unwrap_or(0) as f64;
            if pixel_area < self.min_area {
                continue;
            }

            let perimeter = arc_length(&contour.points, true);
            let epsilon = self.simplify_ratio * perimeter;
            let simplified = approximate_polygon_dp(&contour.points, epsilon, true);
            if simplified.len() < 3 {
                continue;
            }

            let ring = dedup_ring(&simplified);
            if ring.len() < 3 {
                continue;
            }

            if is_simple_ring(&ring) && shoelace_area(&ring) > 0.0 {
                polygons.push(RoomPolygon::new(ring_to_polygon(&ring), pixel_area));
            } else {
                match repair_ring(&ring) {
                    Some(repaired) => {
                        polygons.push(RoomPolygon::new(ring_to_polygon(&repaired), pixel_area));
                    }
                    None => {
                        tracing::warn!(vertices = ring.len(), "dropping unrepairable contour");
                        dropped += 1;
                    }
                }
            }
        }

        tracing::debug!(
            polygons = polygons.len(),
            dropped,
            "mask polygonization complete"
        );
        Ok(PolygonizeOutcome { polygons, dropped })
    }
}

fn ring_to_polygon(ring: &[Coord<f64>]) -> Polygon<f64> {
    Polygon::new(LineString::from(ring.to_vec()), vec![])
}

fn dedup_ring(points: &[Point<i32>]) -> Vec<Coord<f64>> {
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(points.len());
    for p in points {
        let coord = Coord {
            x: p.x as f64,
            y: p.y as f64,
        };
        if ring.last() != Some(&coord) {
            ring.push(coord);
        }
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Absolute shoelace area of a closed ring.
fn shoelace_area(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i].x * ring[j].y;
        area -= ring[j].x * ring[i].y;
    }
    (area / 2.0).abs()
}

/// True when no pair of non-adjacent ring segments intersects.
fn is_simple_ring(ring: &[Coord<f64>]) -> bool {
    find_self_intersection(ring).is_none()
}

/// First pair of non-adjacent segments that intersect, with the crossing
/// point, or `None` for a simple ring.
fn find_self_intersection(ring: &[Coord<f64>]) -> Option<(usize, usize, Coord<f64>)> {
    let n = ring.len();
    for i in 0..n {
        for j in (i + 1)..n {
            // Segments sharing a vertex are allowed to touch.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (a1, a2) = (ring[i], ring[(i + 1) % n]);
            let (b1, b2) = (ring[j], ring[(j + 1) % n]);
            if let Some(p) = segment_intersection(a1, a2, b1, b2) {
                return Some((i, j, p));
            }
        }
    }
    None
}

fn cross(o: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Intersection point of segments `a1a2` and `b1b2`, if any.
///
/// Collinear overlaps report the midpoint of the first segment, which is
/// enough to flag the ring as non-simple.
fn segment_intersection(
    a1: Coord<f64>,
    a2: Coord<f64>,
    b1: Coord<f64>,
    b2: Coord<f64>,
) -> Option<Coord<f64>> {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        let denom = (a2.x - a1.x) * (b2.y - b1.y) - (a2.y - a1.y) * (b2.x - b1.x);
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let t = ((b1.x - a1.x) * (b2.y - b1.y) - (b1.y - a1.y) * (b2.x - b1.x)) / denom;
        return Some(Coord {
            x: a1.x + t * (a2.x - a1.x),
            y: a1.y + t * (a2.y - a1.y),
        });
    }

    let on = |d: f64, p: Coord<f64>, s1: Coord<f64>, s2: Coord<f64>| {
        d == 0.0
            && p.x >= s1.x.min(s2.x)
            && p.x <= s1.x.max(s2.x)
            && p.y >= s1.y.min(s2.y)
            && p.y <= s1.y.max(s2.y)
    };
    if on(d1, a1, b1, b2) {
        return Some(a1);
    }
    if on(d2, a2, b1, b2) {
        return Some(a2);
    }
    if on(d3, b1, a1, a2) {
        return Some(b1);
    }
    if on(d4, b2, a1, a2) {
        return Some(b2);
    }
    None
}

/// One repair attempt for a self-intersecting ring.
///
/// Splits the ring at its first self-intersection into two loops and keeps
/// the largest loop that is simple with positive area.
pub(crate) fn repair_ring(ring: &[Coord<f64>]) -> Option<Vec<Coord<f64>>> {
    let (i, j, p) = find_self_intersection(ring)?;

    let mut loop_a: Vec<Coord<f64>> = vec![p];
    loop_a.extend_from_slice(&ring[i + 1..=j]);

    let mut loop_b: Vec<Coord<f64>> = vec![p];
    loop_b.extend_from_slice(&ring[j + 1..]);
    loop_b.extend_from_slice(&ring[..=i]);

    [loop_a, loop_b]
        .into_iter()
        .filter(|candidate| {
            candidate.len() >= 3
                && shoelace_area(candidate) > 0.0
                && is_simple_ring(candidate)
        })
        .max_by(|a, b| {
            shoelace_area(a)
                .partial_cmp(&shoelace_area(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
