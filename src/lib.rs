//! relation-geojson - Fetch an OpenStreetMap relation from Overpass and save it as GeoJSON

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod osm;
pub mod output;
pub mod pipeline;

pub use pipeline::{PipelineOutcome, report, run};
