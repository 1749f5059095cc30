use crate::domain::RelationId;
use crate::error::WriteError;
use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where the GeoJSON for `relation` goes inside `dir`
pub fn output_path(dir: &Path, relation: RelationId) -> PathBuf {
    dir.join(relation.output_file_name())
}

/// Write a FeatureCollection as indented UTF-8 JSON, replacing any existing file
///
/// # Arguments
/// * `path` - Output file path
/// * `collection` - Features to write
pub fn write_geojson(path: &Path, collection: &FeatureCollection) -> Result<(), WriteError> {
    let io_error = |source: std::io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);

    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    collection
        .serialize(&mut serializer)
        .map_err(|e| io_error(e.into()))?;

    writer.flush().map_err(io_error)?;

    Ok(())
}
