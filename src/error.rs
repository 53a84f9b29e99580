use thiserror::Error;

use crate::config::ConfigError;
use crate::decode::CellError;
use crate::log::EventRow;
use crate::log::LoadError;
use crate::render::encoder::EncodingError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] LoadError),

    #[error("Line {line} (time {time}, cell \"{coordinate}\", payload \"{payload}\"): {source}")]
    Row {
        line: usize,
        time: f64,
        coordinate: String,
        payload: String,
        #[source]
        source: CellError,
    },

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Attaches the offending row to a cell error
    pub fn row(row: &EventRow, source: CellError) -> Self {
        Self::Row {
            line: row.line,
            time: row.time,
            coordinate: row.coordinate.clone(),
            payload: row.payload.clone(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
