//! The nine-stage splitting pipeline.
//!
//! Runs LineSplit, FeatureBind, LowCountMerge, Cluster, Densify,
//! Voronoi, DissolveByCluster, Simplify, and SmallMerge in order. Each
//! stage consumes the previous stage's output; nothing is mutated
//! across stage boundaries except the final in-place merge. The whole
//! run is deterministic: ids follow stable traversal orders and the
//! clustering rng is seeded from configuration.

use fieldtasks_splitter_models::{
    Building, ClusterUid, PreliminaryTask, SplitConfig, SubPolygon, TaskPolygon,
};
use geo::{Area, LineString, Point, Polygon};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bind::{bind_points, count_per_region, RegionIndex};
use crate::cluster::{cluster_count, kmeans};
use crate::densify::densify_buildings;
use crate::dissolve::dissolve_by_cluster;
use crate::merge::{low_count_merge, small_task_merge};
use crate::simplify::simplify_boundaries;
use crate::split::line_split;
use crate::voronoi::voronoi_cells;
use crate::SplitError;

/// Densify-and-tessellate attempts before giving up: the initial try
/// plus three retries at doubled intervals.
const VORONOI_ATTEMPTS: usize = 4;

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Final task polygons, `taskid` dense and ascending.
    pub tasks: Vec<TaskPolygon>,
    /// Sub-polygons after line splitting and low-count merging.
    pub subpolygon_count: usize,
    /// Clusters formed across all sub-polygons.
    pub cluster_count: usize,
}

/// Splits an AOI into task polygons.
///
/// Degraded inputs degrade the pipeline rather than failing it: with no
/// splitter lines the AOI is one sub-polygon, and with no buildings the
/// sub-polygons themselves become the tasks.
///
/// # Errors
///
/// Returns [`SplitError::InvalidAoi`] for an empty or zero-area AOI and
/// [`SplitError::Voronoi`] if tessellation keeps failing after the
/// densification interval has been coarsened.
pub fn split_aoi(
    aoi: &Polygon<f64>,
    split_lines: &[LineString<f64>],
    buildings: &[Building],
    config: &SplitConfig,
) -> Result<SplitOutcome, SplitError> {
    validate_aoi(aoi)?;
    let min_features = config.resolved_min_features();

    // LineSplit: polygonize the AOI along the splitter linework.
    let subpolygons = line_split(aoi, split_lines);

    // FeatureBind: bind each building to the sub-polygon holding its centroid.
    let subpolygons = bind_buildings(subpolygons, buildings);
    let assigned: usize = subpolygons.iter().map(|sub| sub.feature_count).sum();

    if assigned == 0 {
        log::info!("No buildings inside the AOI; sub-polygons become the tasks");
        let subpolygon_count = subpolygons.len();
        return Ok(SplitOutcome {
            tasks: subpolygons_as_tasks(subpolygons),
            subpolygon_count,
            cluster_count: 0,
        });
    }

    // LowCountMerge: fold low-count sub-polygons into their neighbours, then
    // re-bind against the merged regions.
    let subpolygons = low_count_merge(subpolygons, min_features, config.merge_rule);
    let subpolygons = bind_buildings(subpolygons, buildings);
    log::info!(
        "{} sub-polygons after low-count merge, {} buildings bound",
        subpolygons.len(),
        assigned
    );

    // Cluster: group each sub-polygon's buildings around the target size.
    let (clustered, cluster_total) = cluster_subpolygons(&subpolygons, buildings, config);

    // Densify perimeters into generator sites and tessellate,
    // coarsening the interval if the tessellation backend balks.
    let mut interval = config.segmentize_degrees;
    let mut attempt = 0;
    let (sites, cells) = loop {
        attempt += 1;
        let sites = densify_buildings(&clustered, interval);
        match voronoi_cells(&sites, &subpolygons) {
            Ok(cells) => break (sites, cells),
            Err(error) => {
                if attempt >= VORONOI_ATTEMPTS {
                    return Err(SplitError::Voronoi { attempts: attempt });
                }
                interval *= 2.0;
                log::warn!(
                    "Voronoi tessellation failed ({error}); retrying with interval {interval}"
                );
            }
        }
    };

    // Dissolve cells into one region per cluster. Sub-polygons that
    // kept zero buildings pass through as their own regions so the
    // tiling stays complete.
    let mut preliminary = dissolve_by_cluster(&cells, &sites);
    for sub in &subpolygons {
        if sub.feature_count == 0 {
            preliminary.push(PreliminaryTask {
                cluster: ClusterUid {
                    polyid: sub.polyid,
                    cid: 0,
                },
                geometry: sub.geometry.clone(),
            });
        }
    }
    preliminary.sort_by_key(|region| region.cluster);

    // Simplify the shared boundary linework once and re-polygonize.
    let faces = simplify_boundaries(&preliminary, config.simplify_degrees);
    let subpolygon_count = subpolygons.len();
    if faces.is_empty() {
        log::warn!("Boundary simplification produced no faces; sub-polygons become the tasks");
        return Ok(SplitOutcome {
            tasks: subpolygons_as_tasks(subpolygons),
            subpolygon_count,
            cluster_count: cluster_total,
        });
    }
    let tasks = faces_to_tasks(faces, buildings);

    // SmallMerge: absorb undersized tasks into their neighbours.
    let tasks = small_task_merge(tasks, min_features);
    log::info!("Split complete: {} tasks", tasks.len());

    Ok(SplitOutcome {
        tasks,
        subpolygon_count,
        cluster_count: cluster_total,
    })
}

fn validate_aoi(aoi: &Polygon<f64>) -> Result<(), SplitError> {
    if aoi.exterior().0.len() < 4 {
        return Err(SplitError::InvalidAoi {
            reason: "the AOI exterior ring has fewer than four coordinates".to_string(),
        });
    }
    if aoi.unsigned_area() <= 0.0 {
        return Err(SplitError::InvalidAoi {
            reason: "the AOI has zero area".to_string(),
        });
    }
    Ok(())
}

/// Binds building centroids to sub-polygons and refreshes each
/// sub-polygon's feature count.
fn bind_buildings(mut subpolygons: Vec<SubPolygon>, buildings: &[Building]) -> Vec<SubPolygon> {
    let regions: Vec<(u32, &Polygon<f64>)> = subpolygons
        .iter()
        .flat_map(|sub| sub.geometry.iter().map(|part| (sub.polyid, part)))
        .collect();
    let index = RegionIndex::new(regions);

    let centroids: Vec<Point<f64>> = buildings.iter().map(|b| b.centroid).collect();
    let assignments = bind_points(&index, &centroids);
    let unassigned = assignments.iter().filter(|a| a.is_none()).count();
    if unassigned > 0 {
        log::warn!("{unassigned} building centroids fall outside every sub-polygon");
    }

    let counts = count_per_region(&assignments);
    for sub in &mut subpolygons {
        sub.feature_count = counts.get(&sub.polyid).copied().unwrap_or(0);
    }
    subpolygons
}

/// K-means each sub-polygon's buildings; returns the clustered
/// buildings ordered by `(polyid, cid, building)` plus the cluster
/// total.
fn cluster_subpolygons<'a>(
    subpolygons: &[SubPolygon],
    buildings: &'a [Building],
    config: &SplitConfig,
) -> (Vec<(ClusterUid, &'a Building)>, usize) {
    let regions: Vec<(u32, &Polygon<f64>)> = subpolygons
        .iter()
        .flat_map(|sub| sub.geometry.iter().map(|part| (sub.polyid, part)))
        .collect();
    let index = RegionIndex::new(regions);
    let centroids: Vec<Point<f64>> = buildings.iter().map(|b| b.centroid).collect();
    let assignments = bind_points(&index, &centroids);

    let mut rng = StdRng::seed_from_u64(config.kmeans_seed);
    let mut clustered: Vec<(ClusterUid, usize)> = Vec::new();
    let mut cluster_total = 0;

    for sub in subpolygons {
        let members: Vec<usize> = assignments
            .iter()
            .enumerate()
            .filter_map(|(i, assigned)| (*assigned == Some(sub.polyid)).then_some(i))
            .collect();
        if members.is_empty() {
            continue;
        }

        let k = cluster_count(members.len(), config.target_cluster_size);
        let member_centroids: Vec<Point<f64>> =
            members.iter().map(|&i| buildings[i].centroid).collect();
        let cids = kmeans(&member_centroids, k, &mut rng);
        cluster_total += k;
        log::debug!(
            "Sub-polygon {}: {} buildings into {k} clusters",
            sub.polyid,
            members.len()
        );

        for (&building, &cid) in members.iter().zip(&cids) {
            clustered.push((
                ClusterUid {
                    polyid: sub.polyid,
                    cid,
                },
                building,
            ));
        }
    }

    clustered.sort_by_key(|(uid, building)| (*uid, *building));
    (
        clustered
            .into_iter()
            .map(|(uid, building)| (uid, &buildings[building]))
            .collect(),
        cluster_total,
    )
}

/// Turns the simplified faces into tasks with containment-derived counts.
fn faces_to_tasks(faces: Vec<Polygon<f64>>, buildings: &[Building]) -> Vec<TaskPolygon> {
    let identified: Vec<(u32, Polygon<f64>)> = faces
        .into_iter()
        .enumerate()
        .map(|(index, face)| (index as u32 + 1, face))
        .collect();
    let regions: Vec<(u32, &Polygon<f64>)> = identified
        .iter()
        .map(|(taskid, face)| (*taskid, face))
        .collect();
    let index = RegionIndex::new(regions);

    let centroids: Vec<Point<f64>> = buildings.iter().map(|b| b.centroid).collect();
    let counts = count_per_region(&bind_points(&index, &centroids));

    identified
        .into_iter()
        .map(|(taskid, face)| TaskPolygon {
            taskid,
            geometry: geo::MultiPolygon(vec![face]),
            building_count: counts.get(&taskid).copied().unwrap_or(0),
        })
        .collect()
}

/// Degraded output: each sub-polygon becomes a task as-is.
fn subpolygons_as_tasks(subpolygons: Vec<SubPolygon>) -> Vec<TaskPolygon> {
    subpolygons
        .into_iter()
        .enumerate()
        .map(|(index, sub)| TaskPolygon {
            taskid: index as u32 + 1,
            geometry: sub.geometry,
            building_count: sub.feature_count,
        })
        .collect()
}
