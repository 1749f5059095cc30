use serde::Deserialize;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// Identifier of an OSM relation. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "u64")]
pub struct RelationId(NonZeroU64);

impl RelationId {
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    pub const fn from_non_zero(id: NonZeroU64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// File name the converted relation is written to, e.g. `relation_6386965.geojson`
    pub fn output_file_name(self) -> String {
        format!("relation_{}.geojson", self.0)
    }
}

impl TryFrom<u64> for RelationId {
    type Error = String;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::new(id).ok_or_else(|| "relation id must be a positive integer".to_string())
    }
}

impl FromStr for RelationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u64 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid relation id '{}': {}", s, e))?;
        Self::try_from(id)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
