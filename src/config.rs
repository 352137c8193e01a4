use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use crate::data::clean::DEFAULT_Z_THRESHOLD;

#[derive(Parser, Debug, Clone)]
#[command(name = "asv-quality")]
#[command(about = "Cleans ASV water-quality observations and serves them over HTTP")]
pub struct Config {
    /// Observation table to load at startup (.csv, .json or .parquet)
    #[arg(long, env = "DATA_FILE", default_value = "data/raw.csv")]
    pub data_file: PathBuf,

    /// Address to bind
    #[arg(long, env = "ASV_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "ASV_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Rows with |z| at or above this in any required field are dropped at load
    #[arg(long, env = "ASV_Z_THRESHOLD", default_value_t = DEFAULT_Z_THRESHOLD)]
    pub z_threshold: f64,
}

impl Config {
    pub fn ingest(&self) -> Result<IngestConfig> {
        IngestConfig::new(self.data_file.clone(), self.z_threshold)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the observations come from and how hard they are cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub data_file: PathBuf,
    pub z_threshold: f64,
}

impl IngestConfig {
    pub fn new(data_file: impl Into<PathBuf>, z_threshold: f64) -> Result<Self> {
        if !z_threshold.is_finite() || z_threshold <= 0.0 {
            bail!("z-score threshold must be a positive number, got {z_threshold}");
        }
        Ok(Self {
            data_file: data_file.into(),
            z_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "asv-quality",
            "--data-file",
            "data/mission.parquet",
            "--port",
            "8080",
            "--z-threshold",
            "2.5",
        ])
        .unwrap();
        assert_eq!(config.bind_addr(), format!("{}:8080", config.host));
        let ingest = config.ingest().unwrap();
        assert_eq!(ingest.data_file, PathBuf::from("data/mission.parquet"));
        assert_eq!(ingest.z_threshold, 2.5);
    }

    #[test]
    fn rejects_non_positive_threshold() {
        assert!(IngestConfig::new("raw.csv", 0.0).is_err());
        assert!(IngestConfig::new("raw.csv", f64::NAN).is_err());
        assert!(IngestConfig::new("raw.csv", 3.0).is_ok());
    }
}
