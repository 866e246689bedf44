//! The two merge passes: low-count sub-polygons and small tasks.
//!
//! Both passes work on a polygon adjacency graph: an arena of records
//! indexed by id, with adjacency as id-keyed maps of shared geodesic
//! boundary length. Adjacency comes from the quantized boundary
//! segments two regions have in common, so corner contacts never count
//! as neighbours. Merges are id-level operations: union the geometry,
//! update the survivor, drop the victim, and splice the victim's
//! adjacencies into the survivor's.

use std::collections::BTreeMap;

use fieldtasks_splitter_models::{MergeRule, SubPolygon, TaskPolygon};
use geo::{BooleanOps, GeodesicArea, GeodesicLength, LineString, MultiPolygon};

use crate::segments::{polygon_segments, segment_key, SegmentKey};

type Adjacency = BTreeMap<u32, BTreeMap<u32, f64>>;

/// Shared geodesic boundary length between every pair of regions.
fn shared_lengths(entries: &[(u32, &MultiPolygon<f64>)]) -> Adjacency {
    let mut owners: BTreeMap<SegmentKey, (LineString<f64>, Vec<u32>)> = BTreeMap::new();
    for (id, geometry) in entries {
        for part in geometry.iter() {
            for line in polygon_segments(part) {
                if let Some(key) = segment_key(&line) {
                    owners
                        .entry(key)
                        .or_insert_with(|| (LineString(vec![line.start, line.end]), Vec::new()))
                        .1
                        .push(*id);
                }
            }
        }
    }

    let mut adjacency: Adjacency = BTreeMap::new();
    for (segment, ids) in owners.into_values() {
        let mut distinct = ids;
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != 2 {
            continue;
        }
        let length = segment.geodesic_length();
        let (a, b) = (distinct[0], distinct[1]);
        *adjacency.entry(a).or_default().entry(b).or_default() += length;
        *adjacency.entry(b).or_default().entry(a).or_default() += length;
    }
    adjacency
}

/// Splices the victim's adjacency entries into the target's and removes
/// the victim from the graph.
fn absorb(adjacency: &mut Adjacency, target: u32, victim: u32) {
    let victim_edges = adjacency.remove(&victim).unwrap_or_default();
    for (neighbour, length) in victim_edges {
        if neighbour == target {
            continue;
        }
        *adjacency
            .entry(target)
            .or_default()
            .entry(neighbour)
            .or_default() += length;
        if let Some(edges) = adjacency.get_mut(&neighbour) {
            edges.remove(&victim);
            *edges.entry(target).or_default() += length;
        }
    }
    if let Some(edges) = adjacency.get_mut(&target) {
        edges.remove(&victim);
    }
}

/// Merges sub-polygons with fewer than `min_features` buildings
/// into a neighbour.
///
/// Neighbour choice follows the configured rule; under
/// [`MergeRule::LargestNeighbour`] that is greatest building count,
/// then greatest area, then lowest `polyid`. Isolated islands are
/// retained as-is. Processing is a single pass in ascending `polyid`.
#[must_use]
pub fn low_count_merge(
    subpolygons: Vec<SubPolygon>,
    min_features: usize,
    rule: MergeRule,
) -> Vec<SubPolygon> {
    let entries: Vec<(u32, &MultiPolygon<f64>)> = subpolygons
        .iter()
        .map(|sub| (sub.polyid, &sub.geometry))
        .collect();
    let mut adjacency = shared_lengths(&entries);

    let ids: Vec<u32> = subpolygons.iter().map(|sub| sub.polyid).collect();
    let mut records: BTreeMap<u32, SubPolygon> = subpolygons
        .into_iter()
        .map(|sub| (sub.polyid, sub))
        .collect();

    for id in ids {
        let Some(record) = records.get(&id) else {
            continue; // Already merged away.
        };
        if record.feature_count >= min_features {
            continue;
        }

        let Some(target) = select_neighbour(&adjacency, &records, id, rule) else {
            log::debug!("Sub-polygon {id} has no eligible neighbour; retained as-is");
            continue;
        };

        let victim = records.remove(&id).expect("record exists");
        let survivor = records.get_mut(&target).expect("neighbour exists");
        log::debug!(
            "Merging sub-polygon {id} ({} buildings) into {target} ({} buildings)",
            victim.feature_count,
            survivor.feature_count
        );
        survivor.geometry = survivor.geometry.union(&victim.geometry);
        survivor.feature_count += victim.feature_count;
        survivor.area_m2 += victim.area_m2;
        absorb(&mut adjacency, target, id);
    }

    records.into_values().collect()
}

/// Picks the merge target among the live neighbours of `id`.
fn select_neighbour(
    adjacency: &Adjacency,
    records: &BTreeMap<u32, SubPolygon>,
    id: u32,
    rule: MergeRule,
) -> Option<u32> {
    let neighbours = adjacency.get(&id)?;
    let mut best: Option<(&SubPolygon, u32)> = None;
    for neighbour in neighbours.keys() {
        let Some(candidate) = records.get(neighbour) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((current, _)) => match rule {
                MergeRule::LargestNeighbour => {
                    candidate.feature_count > current.feature_count
                        || (candidate.feature_count == current.feature_count
                            && candidate.area_m2 > current.area_m2)
                }
                MergeRule::FewestBuildings => {
                    candidate.feature_count < current.feature_count
                        || (candidate.feature_count == current.feature_count
                            && candidate.area_m2 > current.area_m2)
                }
            },
        };
        if better {
            best = Some((candidate, *neighbour));
        }
    }
    best.map(|(_, id)| id)
}

/// Merges undersized tasks into neighbours.
///
/// A task is small when its geodesic area falls below `mean - stddev`
/// of all task areas, or its building count falls below `min_features`.
/// Each small task merges into the non-small neighbour sharing the
/// longest boundary (tie: lowest `taskid`); tasks with no eligible
/// neighbour are left alone. Survivors are renumbered densely.
#[must_use]
pub fn small_task_merge(tasks: Vec<TaskPolygon>, min_features: usize) -> Vec<TaskPolygon> {
    if tasks.is_empty() {
        return tasks;
    }

    let areas: BTreeMap<u32, f64> = tasks
        .iter()
        .map(|task| (task.taskid, task.geometry.geodesic_area_unsigned()))
        .collect();
    let mean = areas.values().sum::<f64>() / areas.len() as f64;
    let variance =
        areas.values().map(|area| (area - mean).powi(2)).sum::<f64>() / areas.len() as f64;
    let min_area = mean - variance.sqrt();

    let small: BTreeMap<u32, bool> = tasks
        .iter()
        .map(|task| {
            (
                task.taskid,
                areas[&task.taskid] < min_area || task.building_count < min_features,
            )
        })
        .collect();

    let entries: Vec<(u32, &MultiPolygon<f64>)> = tasks
        .iter()
        .map(|task| (task.taskid, &task.geometry))
        .collect();
    let mut adjacency = shared_lengths(&entries);

    let ids: Vec<u32> = tasks.iter().map(|task| task.taskid).collect();
    let mut records: BTreeMap<u32, TaskPolygon> = tasks
        .into_iter()
        .map(|task| (task.taskid, task))
        .collect();

    for id in ids {
        if !small[&id] || !records.contains_key(&id) {
            continue;
        }

        // Longest shared boundary among live non-small neighbours;
        // BTreeMap order plus strict comparison gives lowest-id ties.
        let mut best: Option<(u32, f64)> = None;
        if let Some(neighbours) = adjacency.get(&id) {
            for (neighbour, length) in neighbours {
                if small.get(neighbour).copied().unwrap_or(true)
                    || !records.contains_key(neighbour)
                {
                    continue;
                }
                if best.is_none_or(|(_, current)| *length > current) {
                    best = Some((*neighbour, *length));
                }
            }
        }
        let Some((target, _)) = best else {
            log::debug!("Task {id} is small but has no non-small neighbour; retained");
            continue;
        };

        let victim = records.remove(&id).expect("record exists");
        let survivor = records.get_mut(&target).expect("neighbour exists");
        log::debug!(
            "Merging small task {id} ({} buildings) into {target}",
            victim.building_count
        );
        survivor.geometry = survivor.geometry.union(&victim.geometry);
        survivor.building_count += victim.building_count;
        absorb(&mut adjacency, target, id);
    }

    records
        .into_values()
        .enumerate()
        .map(|(index, mut task)| {
            task.taskid = index as u32 + 1;
            task
        })
        .collect()
}
