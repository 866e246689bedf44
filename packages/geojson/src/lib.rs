#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` ingest and egress for the fieldtasks splitter.
//!
//! Parses the AOI polygon from any of the accepted `GeoJSON` shapes,
//! normalizes OSM tag maps into flat string mappings, extracts building
//! footprints and splitter polylines from a data extract, and encodes the
//! final task polygons back into a `FeatureCollection`.

pub mod aoi;
pub mod extract;
pub mod output;
pub mod tags;

use thiserror::Error;

pub use aoi::{parse_aoi, ParsedAoi};
pub use extract::{parse_extract, ExtractInputs};
pub use output::tasks_to_feature_collection;
pub use tags::normalize_tags;

/// Errors that can occur while decoding or encoding `GeoJSON` inputs.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    /// The raw input was not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),

    /// The raw input was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The AOI input was structurally unusable.
    #[error("Invalid AOI: {reason}")]
    InvalidAoi {
        /// Description of what was wrong with the input.
        reason: String,
    },

    /// The data extract was structurally unusable.
    #[error("Invalid data extract: {reason}")]
    InvalidExtract {
        /// Description of what was wrong with the input.
        reason: String,
    },
}
