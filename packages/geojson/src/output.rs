//! Task polygon output encoding.
//!
//! Encodes the final task set as a `GeoJSON` `FeatureCollection` with a
//! `building_count` property per feature, ordered by ascending `taskid`.

use fieldtasks_splitter_models::TaskPolygon;
use geojson::{Feature, FeatureCollection, Geometry};
use serde_json::{json, Map};

/// Encodes tasks as a `FeatureCollection`.
///
/// Single-part task geometries are written as `Polygon`, multi-part ones
/// as `MultiPolygon`. Features appear in ascending `taskid` order.
#[must_use]
pub fn tasks_to_feature_collection(tasks: &[TaskPolygon]) -> FeatureCollection {
    let mut sorted: Vec<&TaskPolygon> = tasks.iter().collect();
    sorted.sort_by_key(|task| task.taskid);

    let features = sorted
        .into_iter()
        .map(|task| {
            let value = if task.geometry.0.len() == 1 {
                geojson::Value::from(&task.geometry.0[0])
            } else {
                geojson::Value::from(&task.geometry)
            };

            let mut properties = Map::new();
            properties.insert("building_count".to_string(), json!(task.building_count));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(value)),
                id: Some(geojson::feature::Id::Number(task.taskid.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn task(taskid: u32, building_count: usize) -> TaskPolygon {
        TaskPolygon {
            taskid,
            geometry: MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0),
            ]]),
            building_count,
        }
    }

    #[test]
    fn orders_features_by_taskid() {
        let collection = tasks_to_feature_collection(&[task(2, 7), task(1, 3)]);
        let ids: Vec<_> = collection
            .features
            .iter()
            .map(|f| f.id.clone().unwrap())
            .collect();
        assert_eq!(
            ids,
            vec![
                geojson::feature::Id::Number(1.into()),
                geojson::feature::Id::Number(2.into())
            ]
        );
    }

    #[test]
    fn writes_building_count_property() {
        let collection = tasks_to_feature_collection(&[task(1, 3)]);
        let count = collection.features[0]
            .properties
            .as_ref()
            .unwrap()
            .get("building_count")
            .unwrap();
        assert_eq!(count, &serde_json::json!(3));
    }

    #[test]
    fn single_part_geometry_is_a_polygon() {
        let collection = tasks_to_feature_collection(&[task(1, 0)]);
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert!(matches!(geometry.value, geojson::Value::Polygon(_)));
    }
}
