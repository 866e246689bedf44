#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for splitting an AOI polygon into field survey tasks.
//!
//! Two splitting modes: `features` runs the feature-aware pipeline
//! (task boundaries follow roads, waterways, and railways, and group
//! buildings into clusters near the target size), `squares` divides
//! the AOI into a simple clipped meter grid.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fieldtasks_geojson::{parse_aoi, parse_extract, tasks_to_feature_collection};
use fieldtasks_splitter::units::meters_to_degree_threshold;
use fieldtasks_splitter::{grid, split_aoi};
use fieldtasks_splitter_models::{MergeRule, SplitConfig, SplitTagFilter, TaskPolygon};
use geo::Centroid;

#[derive(Parser)]
#[command(name = "fieldtasks", about = "Splits an AOI polygon into field survey tasks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by both splitting modes.
#[derive(Args)]
struct CommonArgs {
    /// Polygon AOI as a `GeoJSON` file.
    #[arg(short, long)]
    boundary: PathBuf,

    /// Output `GeoJSON` file.
    #[arg(short, long, default_value = "tasks.geojson")]
    outfile: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Split along roads, waterways, and railways, grouping buildings
    /// into clusters near the target size
    Features {
        #[command(flatten)]
        common: CommonArgs,

        /// OSM data extract `GeoJSON` with building polygons and
        /// splitter polylines.
        #[arg(short, long)]
        extract: PathBuf,

        /// Desired number of buildings per task.
        #[arg(short, long, default_value_t = 10)]
        number: usize,

        /// Low-count / small-task threshold; defaults to half of
        /// `--number`.
        #[arg(long)]
        min_features: Option<usize>,

        /// Seed for the deterministic clustering stage.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Densification interval in meters (converted at the AOI
        /// centroid latitude).
        #[arg(long)]
        segmentize: Option<f64>,

        /// Boundary simplification tolerance in meters (converted at
        /// the AOI centroid latitude).
        #[arg(long)]
        simplify: Option<f64>,

        /// Merge low-count regions into the neighbour with the fewest
        /// buildings instead of the most.
        #[arg(long)]
        fewest_neighbour: bool,
    },
    /// Split into a grid of squares clipped to the AOI
    Squares {
        #[command(flatten)]
        common: CommonArgs,

        /// Square size in meters.
        #[arg(short, long, default_value_t = 50.0)]
        meters: f64,

        /// Optional extract; when given, only cells containing at
        /// least one building are kept.
        #[arg(short, long)]
        extract: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Features {
            common,
            extract,
            number,
            min_features,
            seed,
            segmentize,
            simplify,
            fewest_neighbour,
        } => {
            let aoi = parse_aoi(&std::fs::read_to_string(&common.boundary)?)?;
            if aoi.from_convex_hull {
                log::warn!("Multi-part AOI was reduced to its convex hull");
            }
            let inputs = parse_extract(
                &std::fs::read_to_string(&extract)?,
                &SplitTagFilter::default(),
            )?;

            // Meter thresholds convert to degrees at the AOI centroid.
            let reference_lat = aoi.polygon.centroid().map_or(0.0, |c| c.y());
            let mut config = SplitConfig {
                target_cluster_size: number,
                min_features,
                kmeans_seed: seed,
                ..SplitConfig::default()
            };
            if let Some(meters) = segmentize {
                config.segmentize_degrees = meters_to_degree_threshold(meters, reference_lat);
            }
            if let Some(meters) = simplify {
                config.simplify_degrees = meters_to_degree_threshold(meters, reference_lat);
            }
            if fewest_neighbour {
                config.merge_rule = MergeRule::FewestBuildings;
            }

            let outcome = split_aoi(
                &aoi.polygon,
                &inputs.split_lines,
                &inputs.buildings,
                &config,
            )?;
            write_tasks(&common.outfile, &outcome.tasks)?;
        }
        Commands::Squares {
            common,
            meters,
            extract,
        } => {
            let aoi = parse_aoi(&std::fs::read_to_string(&common.boundary)?)?;
            if aoi.from_convex_hull {
                log::warn!("Multi-part AOI was reduced to its convex hull");
            }

            let footprints = match extract {
                Some(path) => Some(
                    parse_extract(&std::fs::read_to_string(&path)?, &SplitTagFilter::default())?
                        .buildings
                        .into_iter()
                        .map(|building| building.footprint)
                        .collect::<Vec<_>>(),
                ),
                None => None,
            };

            let tasks = grid::split_by_squares(&aoi.polygon, meters, footprints.as_deref());
            write_tasks(&common.outfile, &tasks)?;
        }
    }

    Ok(())
}

fn write_tasks(path: &Path, tasks: &[TaskPolygon]) -> Result<(), Box<dyn std::error::Error>> {
    let collection = tasks_to_feature_collection(tasks);
    std::fs::write(path, geojson::GeoJson::from(collection).to_string())?;
    log::info!("Wrote {} tasks to {}", tasks.len(), path.display());
    Ok(())
}
