//! LineSplit: polygonizing the AOI along linear features.
//!
//! Polygonizes the AOI with the selected linear features: splitter
//! polylines are clipped to the AOI, merged with the AOI boundary into a
//! noded planar linework, and the enclosed faces become `SubPolygon`s.
//! `polyid`s follow face-extraction order, which is stable for stable
//! input order.

use fieldtasks_splitter_models::SubPolygon;
use geo::{
    BooleanOps, Contains, GeodesicArea, InteriorPoint, Line, LineString, MultiLineString,
    MultiPolygon, Polygon,
};

use crate::noding::node_segments;
use crate::polygonize::polygonize;
use crate::segments::polygon_segments;

/// Splits the AOI into sub-polygons along the given linework.
///
/// With no lines, or no line intersecting the AOI, the result is a
/// single `SubPolygon` equal to the AOI.
#[must_use]
pub fn line_split(aoi: &Polygon<f64>, lines: &[LineString<f64>]) -> Vec<SubPolygon> {
    if lines.is_empty() {
        log::info!("No splitter lines supplied; AOI becomes a single sub-polygon");
        return vec![whole_aoi(aoi)];
    }

    let clipped = aoi.clip(&MultiLineString(lines.to_vec()), false);
    let mut segments: Vec<Line<f64>> = clipped
        .iter()
        .flat_map(|line| line.lines())
        .collect();
    if segments.is_empty() {
        log::info!("No splitter line intersects the AOI; AOI becomes a single sub-polygon");
        return vec![whole_aoi(aoi)];
    }

    segments.extend(polygon_segments(aoi));
    let faces = polygonize(&node_segments(&segments));

    let subpolygons: Vec<SubPolygon> = faces
        .into_iter()
        .filter(|face| {
            // Faces carved out of an AOI hole sit outside the AOI proper.
            face.interior_point()
                .is_some_and(|point| aoi.contains(&point))
        })
        .enumerate()
        .map(|(index, face)| SubPolygon {
            polyid: index as u32 + 1,
            area_m2: face.geodesic_area_unsigned(),
            geometry: MultiPolygon(vec![face]),
            feature_count: 0,
        })
        .collect();

    if subpolygons.is_empty() {
        // Polygonization ate everything (degenerate linework); fall back
        // to the unsplit AOI rather than emitting an empty tiling.
        log::warn!("Line splitting produced no faces; falling back to the unsplit AOI");
        return vec![whole_aoi(aoi)];
    }

    log::debug!("LineSplit produced {} sub-polygons", subpolygons.len());
    subpolygons
}

fn whole_aoi(aoi: &Polygon<f64>) -> SubPolygon {
    SubPolygon {
        polyid: 1,
        geometry: MultiPolygon(vec![aoi.clone()]),
        feature_count: 0,
        area_m2: aoi.geodesic_area_unsigned(),
    }
}
