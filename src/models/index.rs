//! Vector index descriptors and entries.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::Metadata;

/// Similarity metric of a vector index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::Dotproduct => write!(f, "dotproduct"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" => Ok(Metric::Euclidean),
            "dotproduct" | "dot_product" | "dot" => Ok(Metric::Dotproduct),
            _ => Err(format!("unknown metric: {}", s)),
        }
    }
}

/// Cloud provider and region an index is hosted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingSpec {
    pub cloud: String,
    pub region: String,
}

/// What to create when the index does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    pub hosting: HostingSpec,
}

/// An existing index as reported by the vector database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    /// Data-plane host that accepts upserts.
    pub host: String,
    pub ready: bool,
}

/// One vector with its metadata, as written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}
