//! AOI polygon parsing.
//!
//! Accepts a bare `Polygon` or `MultiPolygon` geometry, a `Feature`
//! wrapping one, or a `FeatureCollection` with a single member. A
//! `MultiPolygon` is reduced to its convex hull, and the reduction is
//! flagged on the returned value so callers can surface it.

use geo::{ConvexHull, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, Value};

use crate::GeoJsonError;

/// An AOI polygon ready for splitting.
#[derive(Debug, Clone)]
pub struct ParsedAoi {
    /// The AOI geometry in WGS 84.
    pub polygon: Polygon<f64>,
    /// Whether the input was a `MultiPolygon` reduced to its convex hull.
    pub from_convex_hull: bool,
}

/// Parses an AOI from a raw `GeoJSON` string.
///
/// # Errors
///
/// Returns [`GeoJsonError`] if the input is not valid `GeoJSON`, contains
/// no geometry, contains more than one feature, or holds a geometry type
/// other than `Polygon`/`MultiPolygon`.
pub fn parse_aoi(raw: &str) -> Result<ParsedAoi, GeoJsonError> {
    let geojson: GeoJson = raw.parse()?;
    aoi_from_geojson(&geojson)
}

/// Parses an AOI from an already-decoded `GeoJson` value.
///
/// # Errors
///
/// Same conditions as [`parse_aoi`].
pub fn aoi_from_geojson(geojson: &GeoJson) -> Result<ParsedAoi, GeoJsonError> {
    let geometry = single_geometry(geojson)?;
    aoi_from_value(&geometry.value)
}

/// Extracts the single geometry an AOI input is allowed to carry.
fn single_geometry(geojson: &GeoJson) -> Result<geojson::Geometry, GeoJsonError> {
    match geojson {
        GeoJson::Geometry(geometry) => Ok(geometry.clone()),
        GeoJson::Feature(feature) => feature_geometry(feature),
        GeoJson::FeatureCollection(collection) => match collection.features.as_slice() {
            [] => Err(GeoJsonError::InvalidAoi {
                reason: "the input AOI contains no geometries".to_string(),
            }),
            [feature] => feature_geometry(feature),
            _ => Err(GeoJsonError::InvalidAoi {
                reason: "the input AOI cannot contain multiple geometries".to_string(),
            }),
        },
    }
}

fn feature_geometry(feature: &Feature) -> Result<geojson::Geometry, GeoJsonError> {
    feature
        .geometry
        .clone()
        .ok_or_else(|| GeoJsonError::InvalidAoi {
            reason: "the input AOI feature has no geometry".to_string(),
        })
}

fn aoi_from_value(value: &Value) -> Result<ParsedAoi, GeoJsonError> {
    match value {
        Value::Polygon(_) => {
            let polygon: Polygon<f64> =
                value
                    .clone()
                    .try_into()
                    .map_err(|e: geojson::Error| GeoJsonError::InvalidAoi {
                        reason: format!("malformed polygon coordinates: {e}"),
                    })?;
            validate(&polygon)?;
            Ok(ParsedAoi {
                polygon,
                from_convex_hull: false,
            })
        }
        Value::MultiPolygon(_) => {
            let multi: MultiPolygon<f64> =
                value
                    .clone()
                    .try_into()
                    .map_err(|e: geojson::Error| GeoJsonError::InvalidAoi {
                        reason: format!("malformed multipolygon coordinates: {e}"),
                    })?;
            if multi.0.is_empty() {
                return Err(GeoJsonError::InvalidAoi {
                    reason: "the input AOI multipolygon is empty".to_string(),
                });
            }
            log::warn!("AOI is a MultiPolygon; reducing to its convex hull");
            let polygon = multi.convex_hull();
            validate(&polygon)?;
            Ok(ParsedAoi {
                polygon,
                from_convex_hull: true,
            })
        }
        other => Err(GeoJsonError::InvalidAoi {
            reason: format!("unsupported AOI geometry type: {}", type_name(other)),
        }),
    }
}

fn validate(polygon: &Polygon<f64>) -> Result<(), GeoJsonError> {
    // A closed ring needs at least a triangle plus the closing coordinate.
    if polygon.exterior().0.len() < 4 {
        return Err(GeoJsonError::InvalidAoi {
            reason: "the AOI exterior ring has fewer than four coordinates".to_string(),
        });
    }
    Ok(())
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SQUARE_AOI;

    #[test]
    fn parses_bare_polygon() {
        let aoi = parse_aoi(SQUARE_AOI).unwrap();
        assert!(!aoi.from_convex_hull);
        assert_eq!(aoi.polygon.exterior().0.len(), 5);
    }

    #[test]
    fn parses_feature_wrapped_polygon() {
        let raw = format!(r#"{{"type": "Feature", "properties": {{}}, "geometry": {SQUARE_AOI}}}"#);
        let aoi = parse_aoi(&raw).unwrap();
        assert!(!aoi.from_convex_hull);
    }

    #[test]
    fn parses_single_member_feature_collection() {
        let raw = format!(
            r#"{{"type": "FeatureCollection", "features": [
                {{"type": "Feature", "properties": {{}}, "geometry": {SQUARE_AOI}}}
            ]}}"#
        );
        let aoi = parse_aoi(&raw).unwrap();
        assert!(!aoi.from_convex_hull);
    }

    #[test]
    fn multipolygon_reduces_to_convex_hull() {
        let raw = r#"{
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
                [[[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 1.0], [2.0, 0.0]]]
            ]
        }"#;
        let aoi = parse_aoi(raw).unwrap();
        assert!(aoi.from_convex_hull);
        // The hull spans both parts.
        use geo::BoundingRect;
        let rect = aoi.polygon.bounding_rect().unwrap();
        assert!((rect.max().x - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_empty_feature_collection() {
        let raw = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(matches!(
            parse_aoi(raw),
            Err(GeoJsonError::InvalidAoi { .. })
        ));
    }

    #[test]
    fn rejects_multiple_features() {
        let feature = format!(r#"{{"type": "Feature", "properties": {{}}, "geometry": {SQUARE_AOI}}}"#);
        let raw = format!(r#"{{"type": "FeatureCollection", "features": [{feature}, {feature}]}}"#);
        assert!(matches!(
            parse_aoi(&raw),
            Err(GeoJsonError::InvalidAoi { .. })
        ));
    }

    #[test]
    fn rejects_point_geometry() {
        let raw = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        assert!(matches!(
            parse_aoi(raw),
            Err(GeoJsonError::InvalidAoi { .. })
        ));
    }
}
