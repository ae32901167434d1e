//! Ingestion manifest: which source files to ingest for which works.
//!
//! ```yaml
//! works:
//!   - author: "0059"
//!     work: "030"
//!     path: plato/respublica.txt
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use textus_segmenter::validate_identifier;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub author: String,
    pub work: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub works: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse a manifest, resolving relative paths against `base_dir`.
    pub fn from_yaml_str(yaml: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest: Manifest =
            serde_yaml_ng::from_str(yaml).map_err(|e| PipelineError::YamlParse(e.to_string()))?;

        for entry in &mut manifest.works {
            validate_identifier(&entry.author)?;
            validate_identifier(&entry.work)?;
            if entry.path.is_relative() {
                entry.path = base_dir.join(&entry.path);
            }
        }

        Ok(manifest)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path).await?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml_str(&yaml, base_dir)
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }
}
