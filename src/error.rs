use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostReportError {
    #[error("Invalid month '{0}': expected YYYYMM or YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid view mode '{0}': expected 'monthly' or 'ytd'")]
    InvalidMode(String),

    #[error("Rollup invariant violated at '{path}' ({side}): node total {node_total} != children total {children_total}")]
    RollupViolation {
        path: String,
        side: &'static str,
        node_total: f64,
        children_total: f64,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CostReportError>;
