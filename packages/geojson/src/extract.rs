//! Data extract parsing.
//!
//! Consumes an OSM data extract `FeatureCollection` and sorts its
//! members into the two inputs the splitter cares about: building
//! footprints (polygons carrying a `building` tag) and splitter
//! polylines (ways matching the configured [`SplitTagFilter`]).

use fieldtasks_splitter_models::{Building, SplitTagFilter};
use geo::{Centroid, LineString, MultiLineString, MultiPolygon, Polygon};
use geojson::{FeatureCollection, GeoJson};
use serde_json::Map;

use crate::{tags::normalize_tags, GeoJsonError};

/// The splitter-relevant contents of a data extract.
#[derive(Debug, Clone, Default)]
pub struct ExtractInputs {
    /// Building footprints, in input order.
    pub buildings: Vec<Building>,
    /// Linear features matching the splitter predicate, in input order.
    pub split_lines: Vec<LineString<f64>>,
}

/// Parses a data extract from a raw `GeoJSON` string.
///
/// Features that are neither buildings nor matching polylines are
/// silently skipped, as are geometry types the splitter cannot use.
///
/// # Errors
///
/// Returns [`GeoJsonError`] if the input is not a valid `GeoJSON`
/// `FeatureCollection`.
pub fn parse_extract(raw: &str, filter: &SplitTagFilter) -> Result<ExtractInputs, GeoJsonError> {
    let geojson: GeoJson = raw.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(GeoJsonError::InvalidExtract {
            reason: "the data extract must be a FeatureCollection".to_string(),
        });
    };
    Ok(extract_from_collection(&collection, filter))
}

/// Sorts an already-decoded `FeatureCollection` into splitter inputs.
#[must_use]
pub fn extract_from_collection(
    collection: &FeatureCollection,
    filter: &SplitTagFilter,
) -> ExtractInputs {
    let mut inputs = ExtractInputs::default();
    let empty = Map::new();

    for feature in &collection.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let tags = normalize_tags(feature.properties.as_ref().unwrap_or(&empty));

        if tags.contains_key("building") {
            append_buildings(&geometry.value, &mut inputs.buildings);
        } else if filter.matches(&tags) {
            append_lines(&geometry.value, &mut inputs.split_lines);
        }
    }

    log::info!(
        "Extract parsed: {} buildings, {} splitter lines",
        inputs.buildings.len(),
        inputs.split_lines.len()
    );
    inputs
}

fn append_buildings(value: &geojson::Value, out: &mut Vec<Building>) {
    match value {
        geojson::Value::Polygon(_) => {
            if let Ok(footprint) = Polygon::<f64>::try_from(value.clone()) {
                push_building(footprint, out);
            }
        }
        geojson::Value::MultiPolygon(_) => {
            if let Ok(multi) = MultiPolygon::<f64>::try_from(value.clone()) {
                for footprint in multi {
                    push_building(footprint, out);
                }
            }
        }
        other => {
            log::debug!("Skipping building with non-areal geometry: {other:?}");
        }
    }
}

fn push_building(footprint: Polygon<f64>, out: &mut Vec<Building>) {
    // A degenerate footprint has no centroid and cannot be bound to a
    // region; drop it here rather than special-casing later stages.
    if let Some(centroid) = footprint.centroid() {
        out.push(Building {
            footprint,
            centroid,
        });
    }
}

fn append_lines(value: &geojson::Value, out: &mut Vec<LineString<f64>>) {
    match value {
        geojson::Value::LineString(_) => {
            if let Ok(line) = LineString::<f64>::try_from(value.clone()) {
                out.push(line);
            }
        }
        geojson::Value::MultiLineString(_) => {
            if let Ok(multi) = MultiLineString::<f64>::try_from(value.clone()) {
                out.extend(multi);
            }
        }
        other => {
            log::debug!("Skipping splitter way with non-linear geometry: {other:?}");
        }
    }
}
