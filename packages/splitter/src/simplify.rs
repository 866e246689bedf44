//! Boundary simplification on the shared task linework.
//!
//! Removes the Voronoi staircase from preliminary region boundaries
//! without opening gaps or overlaps. All boundaries are reduced to a
//! single shared linework first: unique noded segments are chained into
//! maximal linestrings between junction nodes, each chain is
//! Douglas-Peucker simplified exactly once, and the simplified linework
//! is re-polygonized. Simplifying per-polygon instead would let the two
//! sides of a shared boundary diverge.

use std::collections::BTreeMap;

use fieldtasks_splitter_models::PreliminaryTask;
use geo::{Line, LineString, Polygon, Simplify};

use crate::noding::node_segments;
use crate::polygonize::polygonize;
use crate::segments::{coord_key, polygon_segments, CoordKey};

/// Simplifies the shared boundary linework of the preliminary regions
/// and re-polygonizes it into task faces.
#[must_use]
pub fn simplify_boundaries(regions: &[PreliminaryTask], tolerance: f64) -> Vec<Polygon<f64>> {
    let mut segments: Vec<Line<f64>> = Vec::new();
    for region in regions {
        for part in &region.geometry {
            segments.extend(polygon_segments(part));
        }
    }

    let noded = node_segments(&segments);
    let chains = merge_chains(&noded);
    log::debug!(
        "Simplify: {} unique segments merged into {} chains",
        noded.len(),
        chains.len()
    );

    let simplified: Vec<Line<f64>> = chains
        .iter()
        .map(|chain| chain.simplify(&tolerance))
        .flat_map(|chain| chain.lines().collect::<Vec<_>>())
        .collect();

    // Independent chains may cross after simplification; re-node before
    // extracting faces.
    polygonize(&node_segments(&simplified))
}

/// Chains segments into maximal linestrings. Chains start and end at
/// junction nodes (degree != 2); segments not reachable from a junction
/// form closed loops.
fn merge_chains(segments: &[Line<f64>]) -> Vec<LineString<f64>> {
    let mut incident: BTreeMap<CoordKey, Vec<usize>> = BTreeMap::new();
    for (index, line) in segments.iter().enumerate() {
        incident.entry(coord_key(line.start)).or_default().push(index);
        incident.entry(coord_key(line.end)).or_default().push(index);
    }

    let mut visited = vec![false; segments.len()];
    let mut chains = Vec::new();

    for (&key, list) in &incident {
        if list.len() == 2 {
            continue;
        }
        for &index in list {
            if !visited[index] {
                chains.push(walk(key, index, segments, &incident, &mut visited));
            }
        }
    }

    // Whatever remains is a closed loop of degree-2 nodes.
    for index in 0..segments.len() {
        if !visited[index] {
            chains.push(walk(
                coord_key(segments[index].start),
                index,
                segments,
                &incident,
                &mut visited,
            ));
        }
    }

    chains
}

fn walk(
    start: CoordKey,
    first: usize,
    segments: &[Line<f64>],
    incident: &BTreeMap<CoordKey, Vec<usize>>,
    visited: &mut [bool],
) -> LineString<f64> {
    let mut current = first;
    let mut key = start;
    let line = segments[current];
    let mut coords = vec![if coord_key(line.start) == key {
        line.start
    } else {
        line.end
    }];

    loop {
        visited[current] = true;
        let line = segments[current];
        let (next_key, next_coord) = if coord_key(line.start) == key {
            (coord_key(line.end), line.end)
        } else {
            (coord_key(line.start), line.start)
        };
        coords.push(next_coord);
        key = next_key;

        let list = &incident[&key];
        if list.len() != 2 {
            break;
        }
        let next = if list[0] == current { list[1] } else { list[0] };
        if visited[next] {
            break;
        }
        current = next;
    }

    LineString(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtasks_splitter_models::ClusterUid;
    use geo::{polygon, Area, Coord, MultiPolygon};

    fn region(cid: u32, polygon: Polygon<f64>) -> PreliminaryTask {
        PreliminaryTask {
            cluster: ClusterUid { polyid: 1, cid },
            geometry: MultiPolygon(vec![polygon]),
        }
    }

    #[test]
    fn chains_split_at_junctions() {
        // Two half-squares: the shared bisector is its own chain.
        let left = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.5, y: 0.0),
            (x: 0.5, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let right = polygon![
            (x: 0.5, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.5, y: 1.0),
        ];
        let mut segments = Vec::new();
        segments.extend(polygon_segments(&left));
        segments.extend(polygon_segments(&right));
        let chains = merge_chains(&node_segments(&segments));
        assert_eq!(chains.len(), 3);
    }

    #[test]
    fn isolated_ring_is_a_closed_loop() {
        let ring = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let chains = merge_chains(&node_segments(&polygon_segments(&ring)));
        assert_eq!(chains.len(), 1);
        let chain = &chains[0];
        assert_eq!(chain.0.first(), chain.0.last());
    }

    #[test]
    fn staircase_boundary_is_straightened_without_gaps() {
        // Two regions separated by a zigzag around x = 0.5, with an
        // amplitude well below the tolerance.
        let zigzag: Vec<Coord<f64>> = (0..=10)
            .map(|i| Coord {
                x: if i % 2 == 0 { 0.5 } else { 0.502 },
                y: f64::from(i) * 0.1,
            })
            .collect();

        let mut left_coords = vec![Coord { x: 0.0, y: 0.0 }];
        left_coords.extend(zigzag.iter().copied());
        left_coords.push(Coord { x: 0.0, y: 1.0 });
        left_coords.push(Coord { x: 0.0, y: 0.0 });
        let left = Polygon::new(LineString(left_coords), vec![]);

        let mut right_coords = vec![Coord { x: 1.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }];
        right_coords.extend(zigzag.iter().rev().copied());
        right_coords.push(Coord { x: 1.0, y: 0.0 });
        let right = Polygon::new(LineString(right_coords), vec![]);

        let faces = simplify_boundaries(&[region(0, left), region(1, right)], 0.01);
        assert_eq!(faces.len(), 2);

        let total: f64 = faces.iter().map(Area::unsigned_area).sum();
        assert!((total - 1.0).abs() < 0.02);

        // The staircase flattens: both faces lose their zigzag vertices.
        for face in &faces {
            assert!(face.exterior().0.len() < 12);
        }
    }

    #[test]
    fn single_region_survives_simplification() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let faces = simplify_boundaries(&[region(0, square)], 0.001);
        assert_eq!(faces.len(), 1);
        assert!((faces[0].unsigned_area() - 1.0).abs() < 1e-9);
    }
}
