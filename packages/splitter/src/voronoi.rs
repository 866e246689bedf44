//! Voronoi tessellation of the generator sites.
//!
//! Tessellates the generator sites and clips each cell to the
//! sub-polygon containing its generator. Cells are materialized from
//! the Delaunay triangulation: a site's Voronoi cell is the
//! intersection of the half-planes toward its Delaunay neighbours, so a
//! bounding rectangle covering the AOI is clipped against each
//! neighbour's perpendicular bisector. Cell coordinates are snapped to
//! the quantization grid so that adjacent cells agree on their shared
//! walls coordinate-for-coordinate.

use std::collections::{BTreeMap, BTreeSet};

use fieldtasks_splitter_models::{ClusterUid, GeneratorSite, SubPolygon};
use geo::{BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use spade::handles::FixedVertexHandle;
use spade::{DelaunayTriangulation, InsertionError, Point2, Triangulation as _};

use crate::segments::{snap, snap_polygon};

/// A Voronoi cell clipped to its sub-polygon.
#[derive(Debug, Clone)]
pub struct VoronoiCell {
    /// Cluster identity inherited from the generator site.
    pub cluster: ClusterUid,
    /// Clipped cell geometry.
    pub geometry: MultiPolygon<f64>,
}

/// Computes the clipped Voronoi tessellation of the generator sites.
///
/// # Errors
///
/// Returns [`InsertionError`] if the triangulation rejects a site, which
/// the caller treats as a signal to coarsen densification and retry.
pub fn voronoi_cells(
    sites: &[GeneratorSite],
    subpolygons: &[SubPolygon],
) -> Result<Vec<VoronoiCell>, InsertionError> {
    let regions: BTreeMap<u32, &MultiPolygon<f64>> = subpolygons
        .iter()
        .map(|sub| (sub.polyid, &sub.geometry))
        .collect();
    let envelope = envelope_ring(subpolygons);

    let mut delaunay: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    let mut handles: Vec<FixedVertexHandle> = Vec::with_capacity(sites.len());
    let mut position_of: BTreeMap<usize, Coord<f64>> = BTreeMap::new();
    for site in sites {
        let handle = delaunay.insert(Point2::new(site.position.x(), site.position.y()))?;
        position_of.entry(handle.index()).or_insert(site.position.0);
        handles.push(handle);
    }

    // Delaunay neighbours per vertex: the edges of every inner face. A
    // site's Voronoi cell is exactly the intersection of the bisector
    // half-planes toward its Delaunay neighbours.
    let mut neighbours: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for face in delaunay.inner_faces() {
        let vertex_ids = face.vertices().map(|vertex| vertex.fix().index());
        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            neighbours
                .entry(vertex_ids[a])
                .or_default()
                .insert(vertex_ids[b]);
            neighbours
                .entry(vertex_ids[b])
                .or_default()
                .insert(vertex_ids[a]);
        }
    }
    if neighbours.is_empty() && position_of.len() > 1 {
        // Degenerate (collinear) triangulation: fall back to all-pairs
        // bisectors, which over-constrains but stays correct.
        for &a in position_of.keys() {
            for &b in position_of.keys() {
                if a != b {
                    neighbours.entry(a).or_default().insert(b);
                }
            }
        }
    }

    let mut cells = Vec::with_capacity(sites.len());
    let mut seen = BTreeSet::new();
    for (site, handle) in sites.iter().zip(handles) {
        if !seen.insert(handle.index()) {
            // Two sites collapsed onto one triangulation vertex.
            continue;
        }
        let Some(region) = regions.get(&site.cluster.polyid) else {
            continue;
        };
        let origin = site.position.0;

        let mut ring = envelope.clone();
        if let Some(ids) = neighbours.get(&handle.index()) {
            for id in ids {
                ring = bisector_clip(ring, origin, position_of[id]);
                if ring.len() < 3 {
                    break;
                }
            }
        }
        let Some(cell) = ring_to_polygon(ring) else {
            continue;
        };

        let clipped = region.intersection(&MultiPolygon(vec![cell]));
        if clipped.0.is_empty() {
            continue;
        }
        cells.push(VoronoiCell {
            cluster: site.cluster,
            geometry: MultiPolygon(clipped.0.iter().map(snap_polygon).collect()),
        });
    }

    log::debug!("Voronoi produced {} clipped cells", cells.len());
    Ok(cells)
}

/// A rectangle comfortably containing every sub-polygon, as an open
/// counter-clockwise ring.
fn envelope_ring(subpolygons: &[SubPolygon]) -> Vec<Coord<f64>> {
    let mut min = Coord {
        x: f64::INFINITY,
        y: f64::INFINITY,
    };
    let mut max = Coord {
        x: f64::NEG_INFINITY,
        y: f64::NEG_INFINITY,
    };
    for sub in subpolygons {
        if let Some(rect) = sub.geometry.bounding_rect() {
            min.x = min.x.min(rect.min().x);
            min.y = min.y.min(rect.min().y);
            max.x = max.x.max(rect.max().x);
            max.y = max.y.max(rect.max().y);
        }
    }
    let margin = ((max.x - min.x) + (max.y - min.y)).max(1e-3);
    vec![
        Coord {
            x: min.x - margin,
            y: min.y - margin,
        },
        Coord {
            x: max.x + margin,
            y: min.y - margin,
        },
        Coord {
            x: max.x + margin,
            y: max.y + margin,
        },
        Coord {
            x: min.x - margin,
            y: max.y + margin,
        },
    ]
}

/// Sutherland-Hodgman clip of a convex ring by the half-plane of points
/// at least as close to `site` as to `other`.
fn bisector_clip(ring: Vec<Coord<f64>>, site: Coord<f64>, other: Coord<f64>) -> Vec<Coord<f64>> {
    let mid = Coord {
        x: (site.x + other.x) / 2.0,
        y: (site.y + other.y) / 2.0,
    };
    let direction = Coord {
        x: other.x - site.x,
        y: other.y - site.y,
    };
    let side = |p: Coord<f64>| (p.x - mid.x) * direction.x + (p.y - mid.y) * direction.y;

    let mut clipped = Vec::with_capacity(ring.len() + 1);
    for i in 0..ring.len() {
        let current = ring[i];
        let next = ring[(i + 1) % ring.len()];
        let (side_current, side_next) = (side(current), side(next));

        if side_current <= 0.0 {
            clipped.push(current);
        }
        if (side_current < 0.0 && side_next > 0.0) || (side_current > 0.0 && side_next < 0.0) {
            let t = side_current / (side_current - side_next);
            clipped.push(Coord {
                x: t.mul_add(next.x - current.x, current.x),
                y: t.mul_add(next.y - current.y, current.y),
            });
        }
    }
    clipped
}

/// Closes and snaps an open ring into a polygon, rejecting rings that
/// collapse under quantization.
fn ring_to_polygon(ring: Vec<Coord<f64>>) -> Option<Polygon<f64>> {
    let mut coords: Vec<Coord<f64>> = ring.into_iter().map(snap).collect();
    coords.dedup();
    if coords.len() >= 2 && coords[0] == coords[coords.len() - 1] {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }
    coords.push(coords[0]);
    Some(Polygon::new(LineString(coords), vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Point};

    fn single_region() -> Vec<SubPolygon> {
        let geometry = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        vec![SubPolygon {
            polyid: 1,
            geometry: MultiPolygon(vec![geometry]),
            feature_count: 0,
            area_m2: 0.0,
        }]
    }

    fn site(x: f64, y: f64, cid: u32) -> GeneratorSite {
        GeneratorSite {
            position: Point::new(x, y),
            cluster: ClusterUid { polyid: 1, cid },
        }
    }

    #[test]
    fn single_site_claims_the_whole_region() {
        let cells = voronoi_cells(&[site(0.5, 0.5, 0)], &single_region()).unwrap();
        assert_eq!(cells.len(), 1);
        assert!((cells[0].geometry.unsigned_area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn two_sites_split_the_region_down_the_middle() {
        let cells =
            voronoi_cells(&[site(0.25, 0.5, 0), site(0.75, 0.5, 1)], &single_region()).unwrap();
        assert_eq!(cells.len(), 2);
        for cell in &cells {
            assert!((cell.geometry.unsigned_area() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn cells_tile_the_region() {
        let sites: Vec<GeneratorSite> = (0..5)
            .flat_map(|i| {
                (0..5).map(move |j| {
                    site(0.1 + f64::from(i) * 0.2, 0.1 + f64::from(j) * 0.2, 0)
                })
            })
            .collect();
        let cells = voronoi_cells(&sites, &single_region()).unwrap();
        assert_eq!(cells.len(), 25);
        let total: f64 = cells.iter().map(|c| c.geometry.unsigned_area()).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_sites_yield_a_single_cell() {
        let cells =
            voronoi_cells(&[site(0.5, 0.5, 0), site(0.5, 0.5, 1)], &single_region()).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].cluster.cid, 0);
    }

    #[test]
    fn bisector_clip_halves_a_square() {
        let ring = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 2.0, y: 0.0 },
            Coord { x: 2.0, y: 2.0 },
            Coord { x: 0.0, y: 2.0 },
        ];
        let clipped = bisector_clip(ring, Coord { x: 0.5, y: 1.0 }, Coord { x: 1.5, y: 1.0 });
        let polygon = ring_to_polygon(clipped).unwrap();
        assert!((polygon.unsigned_area() - 2.0).abs() < 1e-9);
    }
}
