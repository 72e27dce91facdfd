//! JSON run reports with a deterministic configuration fingerprint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use zoneflow_core::config::StrategyConfig;

use crate::runner::SymbolResult;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything needed to audit a run after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    /// BLAKE3 over the canonical JSON of `config`.
    pub config_fingerprint: String,
    pub config: StrategyConfig,
    pub results: Vec<SymbolResult>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Deterministic hash of a configuration.
///
/// Two runs with identical configuration share a fingerprint regardless of
/// where the values came from (file, environment or defaults).
pub fn config_fingerprint(config: &StrategyConfig) -> Result<String, ReportError> {
    let json = serde_json::to_string(config)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

impl RunReport {
    pub fn new(config: &StrategyConfig, results: Vec<SymbolResult>) -> Result<Self, ReportError> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            config_fingerprint: config_fingerprint(config)?,
            config: config.clone(),
            results,
        })
    }

    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.gate.passed)
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), fingerprint = %self.config_fingerprint, "report written");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
