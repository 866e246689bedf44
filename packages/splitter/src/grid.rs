//! Square-grid splitting.
//!
//! The simple alternative to the feature-aware pipeline: divide the AOI
//! bounding box into squares of a given size in meters, clip each cell
//! to the AOI, and optionally keep only cells that fully contain at
//! least one extract footprint. Cell size converts to degrees at the
//! AOI centroid latitude.

use fieldtasks_splitter_models::TaskPolygon;
use geo::{Area, BooleanOps, BoundingRect, Centroid, Coord, Polygon, Rect, Relate};

use crate::units::meters_to_degrees;

/// Splits the AOI into clipped grid squares.
///
/// With `footprints`, only cells containing at least one footprint are
/// kept and each task's `building_count` reflects the contained
/// footprints; without, every non-empty cell is kept with a count of
/// zero.
#[must_use]
pub fn split_by_squares(
    aoi: &Polygon<f64>,
    meters: f64,
    footprints: Option<&[Polygon<f64>]>,
) -> Vec<TaskPolygon> {
    let Some(bounds) = aoi.bounding_rect() else {
        return Vec::new();
    };
    let reference_lat = aoi.centroid().map_or(0.0, |c| c.y());
    let (height, width) = meters_to_degrees(meters, reference_lat);

    let mut tasks = Vec::new();
    let mut y = bounds.min().y;
    while y < bounds.max().y {
        let mut x = bounds.min().x;
        while x < bounds.max().x {
            let cell = Rect::new(
                Coord { x, y },
                Coord {
                    x: x + width,
                    y: y + height,
                },
            )
            .to_polygon();
            x += width;

            let clipped = aoi.intersection(&cell);
            if clipped.unsigned_area() <= 0.0 {
                continue;
            }

            let building_count = footprints.map_or(0, |footprints| {
                footprints
                    .iter()
                    .filter(|footprint| clipped.relate(*footprint).is_contains())
                    .count()
            });
            if footprints.is_some() && building_count == 0 {
                continue;
            }

            tasks.push(TaskPolygon {
                taskid: tasks.len() as u32 + 1,
                geometry: clipped,
                building_count,
            });
        }
        y += height;
    }

    log::info!("Square split produced {} tasks", tasks.len());
    tasks
}
