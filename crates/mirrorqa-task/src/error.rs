//! Error types for the measurement task (C7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to write output file {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
