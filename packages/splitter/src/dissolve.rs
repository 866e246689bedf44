//! DissolveByCluster: one preliminary region per cluster.
//!
//! Merges Voronoi cells sharing a cluster id into one preliminary
//! region per cluster. The dissolve works at the segment level: a cell
//! wall shared by two cells of the same cluster is interior and
//! vanishes; every other wall is part of the cluster's boundary. The
//! boundary segments are then re-noded (reconciling walls the two sides
//! subdivided differently) and polygonized, and faces are kept when
//! they contain at least one of the cluster's generator sites.

use std::collections::BTreeMap;

use fieldtasks_splitter_models::{ClusterUid, GeneratorSite, PreliminaryTask};
use geo::{Intersects, Line, MultiPolygon, Point};

use crate::noding::node_segments;
use crate::polygonize::polygonize;
use crate::segments::{polygon_segments, segment_key, SegmentKey};
use crate::voronoi::VoronoiCell;

/// Dissolves cells into one preliminary region per cluster, ordered by
/// cluster id.
#[must_use]
pub fn dissolve_by_cluster(
    cells: &[VoronoiCell],
    sites: &[GeneratorSite],
) -> Vec<PreliminaryTask> {
    let mut walls: BTreeMap<SegmentKey, (Line<f64>, Vec<ClusterUid>)> = BTreeMap::new();
    for cell in cells {
        for part in &cell.geometry {
            for line in polygon_segments(part) {
                if let Some(key) = segment_key(&line) {
                    walls
                        .entry(key)
                        .or_insert_with(|| (line, Vec::new()))
                        .1
                        .push(cell.cluster);
                }
            }
        }
    }

    let mut cluster_sites: BTreeMap<ClusterUid, Vec<Point<f64>>> = BTreeMap::new();
    for site in sites {
        cluster_sites
            .entry(site.cluster)
            .or_default()
            .push(site.position);
    }

    let clusters: Vec<ClusterUid> = {
        let mut ids: Vec<ClusterUid> = cells.iter().map(|cell| cell.cluster).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };

    let mut regions = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let boundary: Vec<Line<f64>> = walls
            .values()
            .filter(|(_, owners)| {
                owners.iter().filter(|owner| **owner == cluster).count() == 1
            })
            .map(|(line, _)| *line)
            .collect();

        let faces = polygonize(&node_segments(&boundary));
        let generators: &[Point<f64>] =
            cluster_sites.get(&cluster).map_or(&[], Vec::as_slice);
        let kept: Vec<_> = faces
            .into_iter()
            .filter(|face| generators.iter().any(|point| face.intersects(point)))
            .collect();

        if kept.is_empty() {
            log::warn!("Cluster {cluster} dissolved to nothing; its cells will be unassigned");
            continue;
        }
        regions.push(PreliminaryTask {
            cluster,
            geometry: MultiPolygon(kept),
        });
    }

    log::debug!("Dissolve produced {} preliminary regions", regions.len());
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Polygon};

    fn half(x0: f64, x1: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: 0.0),
            (x: x1, y: 0.0),
            (x: x1, y: 1.0),
            (x: x0, y: 1.0),
        ]
    }

    fn cell(x0: f64, x1: f64, cid: u32) -> VoronoiCell {
        VoronoiCell {
            cluster: ClusterUid { polyid: 1, cid },
            geometry: MultiPolygon(vec![half(x0, x1)]),
        }
    }

    fn site(x: f64, y: f64, cid: u32) -> GeneratorSite {
        GeneratorSite {
            position: Point::new(x, y),
            cluster: ClusterUid { polyid: 1, cid },
        }
    }

    #[test]
    fn same_cluster_cells_dissolve_into_one_region() {
        let cells = [cell(0.0, 0.5, 0), cell(0.5, 1.0, 0)];
        let sites = [site(0.25, 0.5, 0), site(0.75, 0.5, 0)];
        let regions = dissolve_by_cluster(&cells, &sites);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].geometry.0.len(), 1);
        assert!((regions[0].geometry.unsigned_area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn distinct_clusters_stay_separate() {
        let cells = [cell(0.0, 0.5, 0), cell(0.5, 1.0, 1)];
        let sites = [site(0.25, 0.5, 0), site(0.75, 0.5, 1)];
        let regions = dissolve_by_cluster(&cells, &sites);
        assert_eq!(regions.len(), 2);
        for region in &regions {
            assert!((region.geometry.unsigned_area() - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn regions_are_ordered_by_cluster_id() {
        let cells = [cell(0.5, 1.0, 1), cell(0.0, 0.5, 0)];
        let sites = [site(0.75, 0.5, 1), site(0.25, 0.5, 0)];
        let regions = dissolve_by_cluster(&cells, &sites);
        let ids: Vec<u32> = regions.iter().map(|r| r.cluster.cid).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
