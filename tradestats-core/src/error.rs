use thiserror::Error;

use crate::config::ConfigError;
use crate::ingest::LoadError;
use crate::metrics::MetricsError;
use crate::schema::SchemaError;

/// Anything that can abort building a report.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
