use crate::api::{FetchOutcome, Fetcher, build_relation_query, classify_response};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::osm::convert;
use crate::output::{output_path, write_geojson};
use std::io::{self, Write};
use std::path::PathBuf;

/// How a run ended when no error occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Written { path: PathBuf, features: usize },
    /// Overpass answered with a non-200 status; nothing was written
    FetchFailed { status: u16 },
}

/// Fetch one relation, convert it and write it to disk
///
/// # Steps
/// 1. Build the Overpass QL query for `config.relation_id`
/// 2. Send it to `config.endpoint_url` (single attempt)
/// 3. Stop with `FetchFailed` on any status other than 200
/// 4. Convert the OSM JSON to a FeatureCollection
/// 5. Write `relation_<id>.geojson` into `config.output_dir`
pub fn run(config: &PipelineConfig, fetcher: &dyn Fetcher) -> Result<PipelineOutcome, PipelineError> {
    let query = build_relation_query(config.relation_id);
    let response = fetcher.fetch(&config.endpoint_url, &query)?;

    let document = match classify_response(response)? {
        FetchOutcome::Success(document) => document,
        FetchOutcome::Failure { status } => return Ok(PipelineOutcome::FetchFailed { status }),
    };

    let collection = convert(&document)?;

    let path = output_path(&config.output_dir, config.relation_id);
    write_geojson(&path, &collection)?;

    Ok(PipelineOutcome::Written {
        path,
        features: collection.features.len(),
    })
}

/// Print the one-line summary of a run
pub fn report<W: Write>(outcome: &PipelineOutcome, out: &mut W) -> io::Result<()> {
    match outcome {
        PipelineOutcome::Written { path, .. } => {
            writeln!(out, "GeoJSON file saved as '{}'", path.display())
        }
        PipelineOutcome::FetchFailed { status } => writeln!(
            out,
            "Failed to fetch data from Overpass API. Status code: {}",
            status
        ),
    }
}
