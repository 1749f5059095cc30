use serde::Deserialize;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::OVERPASS_URL;
use crate::domain::RelationId;

/// Relation fetched when nothing else is configured
pub const DEFAULT_RELATION_ID: u64 = 6386965;

const DEFAULT_RELATION: RelationId = match NonZeroU64::new(DEFAULT_RELATION_ID) {
    Some(id) => RelationId::from_non_zero(id),
    None => panic!("default relation id must be non-zero"),
};

const CONFIG_FILE_NAME: &str = "relation-geojson.toml";

/// Everything one pipeline run needs
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub relation_id: RelationId,
    pub endpoint_url: String,
    pub output_dir: PathBuf,
    /// `None` waits for the server indefinitely
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relation_id: DEFAULT_RELATION,
            endpoint_url: OVERPASS_URL.to_string(),
            output_dir: PathBuf::from("."),
            timeout: None,
        }
    }
}

impl PipelineConfig {
    pub fn new(relation_id: RelationId, endpoint_url: impl Into<String>) -> Self {
        Self {
            relation_id,
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fill in whatever the file sets; CLI values are applied afterwards
    pub fn with_file_config(mut self, file: &FileConfig) -> Self {
        if let Some(id) = file.relation_id {
            self.relation_id = id;
        }
        if let Some(ref url) = file.endpoint_url {
            self.endpoint_url = url.clone();
        }
        if let Some(ref dir) = file.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        self
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub relation_id: Option<RelationId>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub verbose: bool,
}

impl FileConfig {
    /// First parseable config file from the usual locations, if any
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    /// Load an explicitly requested config file. Unlike `load`, a missing or
    /// broken file is an error.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::{Context, bail};

        if !path.exists() {
            bail!("Config file not found: {:?}", path);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).context("Failed to parse config file")
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(CONFIG_FILE_NAME),
        PathBuf::from(format!(".{}", CONFIG_FILE_NAME)),
    ];

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("relation-geojson").join("config.toml"));
        paths.push(config_dir.join(CONFIG_FILE_NAME));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{}", CONFIG_FILE_NAME)));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.relation_id.get(), DEFAULT_RELATION_ID);
        assert_eq!(config.endpoint_url, "https://overpass-api.de/api/interpreter");
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_file_config_overrides_defaults() {
        let file: FileConfig = toml::from_str(
            r#"
            relation_id = 62422
            endpoint_url = "http://localhost:12345/api/interpreter"
            timeout_secs = 90
            "#,
        )
        .unwrap();

        let config = PipelineConfig::default().with_file_config(&file);
        assert_eq!(config.relation_id.get(), 62422);
        assert_eq!(config.endpoint_url, "http://localhost:12345/api/interpreter");
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert!(!file.verbose);
    }

    #[test]
    fn test_builder_keeps_unset_defaults() {
        let relation = RelationId::new(62422).unwrap();
        let config = PipelineConfig::new(relation, "http://localhost:12345/api/interpreter");
        assert_eq!(config.relation_id, relation);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.timeout.is_none());

        let config = config
            .with_output_dir("boundaries")
            .with_timeout(Some(Duration::from_secs(30)));
        assert_eq!(config.endpoint_url, "http://localhost:12345/api/interpreter");
        assert_eq!(config.output_dir, PathBuf::from("boundaries"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_file_config_rejects_zero_relation() {
        let result: Result<FileConfig, _> = toml::from_str("relation_id = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        assert!(FileConfig::from_path(&path).is_err());

        std::fs::write(&path, "output_dir = \"boundaries\"\nverbose = true\n").unwrap();
        let file = FileConfig::from_path(&path).unwrap();
        assert_eq!(file.output_dir, Some(PathBuf::from("boundaries")));
        assert!(file.verbose);
    }
}
