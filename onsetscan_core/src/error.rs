//! Error types for the onset pipeline.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Boxed cause carried by [`Error::Decode`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    /// The external transcoder could not be started or exited non-zero.
    #[error("{program} failed ({status}): {output}")]
    ExternalTool {
        program: String,
        /// Exit status as text, or "spawn failed" when the process never ran.
        status: String,
        /// Combined stdout and stderr of the process.
        output: String,
    },

    /// Audio could not be opened, parsed or decoded, or ended before the offset.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("cannot analyze an empty signal")]
    EmptySignal,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn external_tool(program: &str, status: ExitStatus, output: String) -> Self {
        Error::ExternalTool {
            program: program.to_string(),
            status: status.to_string(),
            output,
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Error::Decode {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
