use std::path::PathBuf;
use thiserror::Error;

/// The request never produced an HTTP response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to send request to {endpoint}")]
    Transport {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// The response body could not be turned into GeoJSON.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to parse Overpass JSON response")]
    InvalidJson(#[from] serde_json::Error),

    /// Overpass answers 200 with a partial result when the query hits a limit.
    #[error("Overpass API reported an error: {0}")]
    Remark(String),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write GeoJSON file: {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
