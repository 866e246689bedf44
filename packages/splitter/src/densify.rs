//! Densify: building perimeters into Voronoi generator sites.
//!
//! Converts clustered building footprints into Voronoi generator sites:
//! each footprint boundary is densified so no segment exceeds the
//! configured interval, and the resulting vertices are dumped as points
//! carrying their cluster identity. Duplicate positions keep the first
//! site in `(polyid, cid, building, vertex)` order, so the outcome does
//! not depend on map iteration order.

use std::collections::BTreeSet;

use fieldtasks_splitter_models::{Building, ClusterUid, GeneratorSite};
use geo::{Densify, Point};

use crate::segments::coord_key;

/// Dumps densified perimeter vertices for the given clustered
/// buildings. `clustered` must be ordered by `(polyid, cid)`, with
/// buildings in stable order within a cluster.
#[must_use]
pub fn densify_buildings(
    clustered: &[(ClusterUid, &Building)],
    max_segment_degrees: f64,
) -> Vec<GeneratorSite> {
    let mut seen = BTreeSet::new();
    let mut sites = Vec::new();

    for (cluster, building) in clustered {
        let dense = building.footprint.densify(max_segment_degrees);
        for ring in
            std::iter::once(dense.exterior()).chain(dense.interiors().iter())
        {
            // The closing coordinate duplicates the first.
            let coords = &ring.0[..ring.0.len().saturating_sub(1)];
            for coord in coords {
                if seen.insert(coord_key(*coord)) {
                    sites.push(GeneratorSite {
                        position: Point(*coord),
                        cluster: *cluster,
                    });
                }
            }
        }
    }

    log::debug!(
        "Densify produced {} generator sites from {} buildings",
        sites.len(),
        clustered.len()
    );
    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn building() -> Building {
        let footprint = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.001, y: 0.0),
            (x: 0.001, y: 0.001),
            (x: 0.0, y: 0.001),
        ];
        Building {
            centroid: Point::new(0.0005, 0.0005),
            footprint,
        }
    }

    #[test]
    fn no_densified_segment_exceeds_the_interval() {
        let b = building();
        let uid = ClusterUid { polyid: 1, cid: 0 };
        let sites = densify_buildings(&[(uid, &b)], 0.000_25);

        // 0.001 degree edges at a 0.00025 interval: 4 subdivisions per
        // edge, 16 perimeter vertices.
        assert_eq!(sites.len(), 16);
        assert!(sites.iter().all(|s| s.cluster == uid));
    }

    #[test]
    fn coarser_interval_yields_fewer_sites() {
        let b = building();
        let uid = ClusterUid { polyid: 1, cid: 0 };
        let fine = densify_buildings(&[(uid, &b)], 0.000_1);
        let coarse = densify_buildings(&[(uid, &b)], 0.000_5);
        assert!(fine.len() > coarse.len());
    }

    #[test]
    fn shared_corner_keeps_first_cluster() {
        let b = building();
        // Same footprint claimed by two clusters; first one wins every
        // duplicated vertex.
        let first = ClusterUid { polyid: 1, cid: 0 };
        let second = ClusterUid { polyid: 1, cid: 1 };
        let sites = densify_buildings(&[(first, &b), (second, &b)], 0.000_25);
        assert!(sites.iter().all(|s| s.cluster == first));
    }
}
