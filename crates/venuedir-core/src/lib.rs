mod app_config;
mod config;
mod report;
mod venues;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use report::{default_report_filename, BrandReport, REPORT_METHOD};
pub use venues::{load_venues, VenueConfig, VenuesFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read venues file {path}: {source}")]
    VenuesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse venues file: {0}")]
    VenuesFileParse(#[from] serde_yaml::Error),

    #[error("venues file validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
