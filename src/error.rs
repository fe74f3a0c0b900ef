//! Error types for the monthly case-count pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CovidError>;

/// Fatal failures of a pipeline run.
///
/// An empty country selection is not represented here: it is a soft condition,
/// reported through the log and [`crate::filter::SelectionReport::is_empty_selection`].
#[derive(Error, Debug)]
pub enum CovidError {
    /// Input missing or unreadable, or output not writable
    #[error("could not access {}: {source}", .path.display())]
    DataAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed csv or missing required column
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Failure inside the dataframe engine while grouping or filtering
    #[error("table error: {0}")]
    Table(#[from] polars::prelude::PolarsError),

    /// Date value that none of the accepted formats can parse
    #[error("could not parse date {value:?} at line {line}")]
    Parse { line: u64, value: String },

    /// Failure inside the charting backend
    #[error("render error: {0}")]
    Render(String),

    /// Invalid configuration file
    #[error("configuration error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl CovidError {
    pub fn data_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CovidError::DataAccess {
            path: path.into(),
            source,
        }
    }

    pub fn render(e: impl std::fmt::Display) -> Self {
        CovidError::Render(e.to_string())
    }
}
