// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! R-tree backed point-in-polygon assignment

use crate::polygon::RoomPolygon;
use geo::{BoundingRect, Intersects, Point};
use rstar::{RTree, RTreeObject, AABB};

/// Envelope entry mapping a polygon's bounding box to its index.
#[derive(Debug, Clone, Copy)]
struct PolygonEnvelope {
    aabb: AABB<[f64; 2]>,
    index: usize,
}

impl RTreeObject for PolygonEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Assign each point to the polygon containing it, or `None`.
///
/// The index is built once per call; candidates come from a bounding-box
/// query and are confirmed with an exact, boundary-inclusive containment
/// test. Ties (nested or touching polygons) resolve deterministically to the
/// lowest polygon index, matching the polygon iteration order.
pub fn match_points_to_polygons(
    points: &[[f64; 2]],
    polygons: &[RoomPolygon],
) -> Vec<Option<usize>> {
    if polygons.is_empty() || points.is_empty() {
        return vec![None; points.len()];
    }

    let envelopes: Vec<PolygonEnvelope> = polygons
        .iter()
        .enumerate()
        .filter_map(|(index, poly)| {
            poly.as_geo().bounding_rect().map(|rect| PolygonEnvelope {
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
                index,
            })
        })
        .collect();
    let tree = RTree::bulk_load(envelopes);

    points
        .iter()
        .map(|&[x, y]| {
            let mut candidates: Vec<usize> = tree
                .locate_in_envelope_intersecting(&AABB::from_point([x, y]))
                .map(|envelope| envelope.index)
                .collect();
            candidates.sort_unstable();

            let point = Point::new(x, y);
            candidates
                .into_iter()
                .find(|&index| polygons[index].as_geo().intersects(&point))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, Polygon};

    fn rect_room(x1: f64, y1: f64, x2: f64, y2: f64) -> RoomPolygon {
        let poly = Polygon::new(
            LineString::from(vec![
                Coord { x: x1, y: y1 },
                Coord { x: x2, y: y1 },
                Coord { x: x2, y: y2 },
                Coord { x: x1, y: y2 },
            ]),
            vec![],
        );
        RoomPolygon::new(poly, (x2 - x1) * (y2 - y1))
    }

    #[test]
    fn point_inside_exactly_one_polygon_resolves_to_it() {
        let polygons = vec![rect_room(0.0, 0.0, 100.0, 100.0), rect_room(200.0, 0.0, 300.0, 100.0)];
        let matches = match_points_to_polygons(&[[250.0, 50.0]], &polygons);
        assert_eq!(matches, vec![Some(1)]);
    }

    #[test]
    fn point_outside_all_polygons_resolves_to_none() {
        let polygons = vec![rect_room(0.0, 0.0, 100.0, 100.0)];
        let matches = match_points_to_polygons(&[[500.0, 500.0]], &polygons);
        assert_eq!(matches, vec![None]);
    }

    #[test]
    fn shared_boundary_point_resolves_to_first_polygon() {
        // Two rooms sharing the x = 100 wall.
        let polygons = vec![
            rect_room(0.0, 0.0, 100.0, 100.0),
            rect_room(100.0, 0.0, 200.0, 100.0),
        ];
        let matches = match_points_to_polygons(&[[100.0, 50.0]], &polygons);
        assert_eq!(matches, vec![Some(0)]);
    }

    #[test]
    fn nested_polygons_resolve_to_lowest_index() {
        let polygons = vec![
            rect_room(0.0, 0.0, 100.0, 100.0),
            rect_room(25.0, 25.0, 75.0, 75.0),
        ];
        let matches = match_points_to_polygons(&[[50.0, 50.0]], &polygons);
        assert_eq!(matches, vec![Some(0)]);
    }

    #[test]
    fn empty_polygon_set_matches_nothing() {
        let matches = match_points_to_polygons(&[[1.0, 1.0], [2.0, 2.0]], &[]);
        assert_eq!(matches, vec![None, None]);
    }
}
