#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::cargo_common_metadata,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

//! Feature-aware AOI task splitting.
//!
//! Partitions an Area of Interest polygon into contiguous task polygons
//! sized for field survey work. Task boundaries follow linear features
//! (roads, waterways, railways) where present, and otherwise bisect the
//! empty space between clusters of buildings via a Voronoi tessellation
//! of densified building perimeters.
//!
//! The pipeline is single-threaded and deterministic: identical inputs
//! and configuration produce identical output, including identifiers.
//! See [`pipeline::split_aoi`] for the entry point.

pub mod bind;
pub mod cluster;
pub mod densify;
pub mod dissolve;
pub mod grid;
pub mod merge;
pub mod noding;
pub mod pipeline;
pub mod polygonize;
pub mod segments;
pub mod simplify;
pub mod split;
pub mod units;
pub mod voronoi;

use thiserror::Error;

pub use pipeline::{split_aoi, SplitOutcome};

/// Errors that can occur while splitting an AOI.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The AOI polygon is unusable (empty, degenerate, or zero-area).
    #[error("Invalid AOI: {reason}")]
    InvalidAoi {
        /// Description of what was wrong with the AOI.
        reason: String,
    },

    /// The Voronoi tessellation failed even after coarsening the
    /// densification interval.
    #[error("Voronoi tessellation failed after {attempts} attempts")]
    Voronoi {
        /// How many densify-and-tessellate attempts were made.
        attempts: usize,
    },
}
