//! Planar face extraction.
//!
//! Turns a noded segment set into the polygons it encloses. Dangling
//! edges are pruned, the remaining half-edges are sorted by angle around
//! each node, and faces are traced with the interior kept on the left:
//! counter-clockwise rings are faces, clockwise rings are either the
//! unbounded face (dropped) or hole boundaries (assigned to the smallest
//! containing face).
//!
//! Input must already be noded (see [`crate::noding`]); face order is
//! deterministic for a deterministic input order.

use std::collections::BTreeMap;

use geo::{Area, Contains, Coord, Line, LineString, Polygon};

use crate::segments::coord_key;

/// Rings whose absolute signed area falls below this are degenerate
/// artifacts of the walk and are discarded.
const MIN_RING_AREA: f64 = 1e-20;

#[derive(Clone, Copy)]
struct HalfEdge {
    from: usize,
    to: usize,
    twin: usize,
    next: usize,
}

/// Extracts all bounded faces of a noded segment set.
#[must_use]
pub fn polygonize(segments: &[Line<f64>]) -> Vec<Polygon<f64>> {
    let segments = prune_dangles(segments);
    if segments.is_empty() {
        return Vec::new();
    }

    let (coords, mut edges) = build_half_edges(&segments);
    link_next_pointers(&coords, &mut edges);

    let rings = trace_rings(&coords, &edges);

    assemble_polygons(rings)
}

/// Iteratively removes segments with a free endpoint. Dead-end spurs
/// cannot bound a face and would produce zero-area rings in the walk.
fn prune_dangles(segments: &[Line<f64>]) -> Vec<Line<f64>> {
    let mut kept: Vec<Line<f64>> = segments.to_vec();
    loop {
        let mut degree: BTreeMap<(i64, i64), usize> = BTreeMap::new();
        for line in &kept {
            *degree.entry(coord_key(line.start)).or_default() += 1;
            *degree.entry(coord_key(line.end)).or_default() += 1;
        }
        let before = kept.len();
        kept.retain(|line| {
            degree[&coord_key(line.start)] > 1 && degree[&coord_key(line.end)] > 1
        });
        if kept.len() == before {
            return kept;
        }
    }
}

fn build_half_edges(segments: &[Line<f64>]) -> (Vec<Coord<f64>>, Vec<HalfEdge>) {
    let mut node_ids: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    let mut coords: Vec<Coord<f64>> = Vec::new();
    let mut node_of = |coord: Coord<f64>, coords: &mut Vec<Coord<f64>>| {
        *node_ids.entry(coord_key(coord)).or_insert_with(|| {
            coords.push(coord);
            coords.len() - 1
        })
    };

    let mut edges = Vec::with_capacity(segments.len() * 2);
    for line in segments {
        let from = node_of(line.start, &mut coords);
        let to = node_of(line.end, &mut coords);
        let forward = edges.len();
        edges.push(HalfEdge {
            from,
            to,
            twin: forward + 1,
            next: usize::MAX,
        });
        edges.push(HalfEdge {
            from: to,
            to: from,
            twin: forward,
            next: usize::MAX,
        });
    }
    (coords, edges)
}

/// Sorts outgoing edges counter-clockwise around each node and links
/// each half-edge to its face successor: the edge one step clockwise
/// from its twin, which keeps the traced face on the left.
fn link_next_pointers(coords: &[Coord<f64>], edges: &mut [HalfEdge]) {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); coords.len()];
    for (id, edge) in edges.iter().enumerate() {
        outgoing[edge.from].push(id);
    }

    let mut position = vec![0usize; edges.len()];
    for (node, out) in outgoing.iter_mut().enumerate() {
        let origin = coords[node];
        out.sort_by(|&a, &b| {
            let ta = angle_from(origin, coords[edges[a].to]);
            let tb = angle_from(origin, coords[edges[b].to]);
            ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
        });
        for (pos, &edge_id) in out.iter().enumerate() {
            position[edge_id] = pos;
        }
    }

    for id in 0..edges.len() {
        let twin = edges[id].twin;
        let node = edges[twin].from;
        let out = &outgoing[node];
        let pos = position[twin];
        edges[id].next = out[(pos + out.len() - 1) % out.len()];
    }
}

fn angle_from(origin: Coord<f64>, target: Coord<f64>) -> f64 {
    (target.y - origin.y).atan2(target.x - origin.x)
}

fn trace_rings(coords: &[Coord<f64>], edges: &[HalfEdge]) -> Vec<LineString<f64>> {
    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring: Vec<Coord<f64>> = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(coords[edges[current].from]);
            current = edges[current].next;
            if current == start {
                break;
            }
            // A broken next-chain would cycle through an already-used
            // edge; bail out rather than loop forever.
            if used[current] {
                ring.clear();
                break;
            }
        }
        if ring.len() >= 3 {
            ring.push(ring[0]);
            rings.push(LineString(ring));
        }
    }
    rings
}

fn assemble_polygons(rings: Vec<LineString<f64>>) -> Vec<Polygon<f64>> {
    let mut shells: Vec<Polygon<f64>> = Vec::new();
    let mut cw_rings: Vec<(LineString<f64>, f64)> = Vec::new();

    for ring in rings {
        let candidate = Polygon::new(ring, vec![]);
        let area = candidate.signed_area();
        if area > MIN_RING_AREA {
            shells.push(candidate);
        } else if area < -MIN_RING_AREA {
            cw_rings.push((candidate.exterior().clone(), -area));
        }
    }

    // Assign each clockwise ring as a hole of the smallest face that
    // strictly contains it; rings contained by nothing bound the
    // unbounded face and are dropped.
    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    for (ring, ring_area) in cw_rings {
        let ring_poly = Polygon::new(ring.clone(), vec![]);
        let mut best: Option<(usize, f64)> = None;
        for (index, shell) in shells.iter().enumerate() {
            let shell_area = shell.unsigned_area();
            if shell_area > ring_area + MIN_RING_AREA
                && shell.contains(&ring_poly)
                && best.is_none_or(|(_, area)| shell_area < area)
            {
                best = Some((index, shell_area));
            }
        }
        if let Some((index, _)) = best {
            holes[index].push(ring);
        }
    }

    shells
        .into_iter()
        .zip(holes)
        .map(|(shell, interior)| Polygon::new(shell.exterior().clone(), interior))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noding::node_segments;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Line<f64>> {
        let corners = [
            Coord { x: x0, y: y0 },
            Coord { x: x1, y: y0 },
            Coord { x: x1, y: y1 },
            Coord { x: x0, y: y1 },
        ];
        (0..4)
            .map(|i| Line::new(corners[i], corners[(i + 1) % 4]))
            .collect()
    }

    #[test]
    fn single_ring_yields_one_face() {
        let faces = polygonize(&square(0.0, 0.0, 1.0, 1.0));
        assert_eq!(faces.len(), 1);
        assert!((faces[0].unsigned_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bisected_square_yields_two_faces() {
        let mut segments = square(0.0, 0.0, 1.0, 1.0);
        segments.push(Line::new(Coord { x: 0.5, y: 0.0 }, Coord { x: 0.5, y: 1.0 }));
        let faces = polygonize(&node_segments(&segments));
        assert_eq!(faces.len(), 2);
        for face in &faces {
            assert!((face.unsigned_area() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn dangling_spur_is_pruned() {
        let mut segments = square(0.0, 0.0, 1.0, 1.0);
        // A dead-end poking into the square.
        segments.push(Line::new(Coord { x: 0.5, y: 0.0 }, Coord { x: 0.5, y: 0.5 }));
        let faces = polygonize(&node_segments(&segments));
        assert_eq!(faces.len(), 1);
    }

    #[test]
    fn nested_ring_becomes_hole_and_inner_face() {
        let mut segments = square(0.0, 0.0, 4.0, 4.0);
        segments.extend(square(1.0, 1.0, 2.0, 2.0));
        let faces = polygonize(&node_segments(&segments));
        assert_eq!(faces.len(), 2);

        let outer = faces
            .iter()
            .find(|f| !f.interiors().is_empty())
            .expect("outer face with hole");
        assert!((outer.unsigned_area() - 15.0).abs() < 1e-12);

        let inner = faces.iter().find(|f| f.interiors().is_empty()).unwrap();
        assert!((inner.unsigned_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_yields_no_faces() {
        assert!(polygonize(&[]).is_empty());
    }
}
