use std::fs::File;
use std::io::BufReader;
use thiserror::Error;

/// Error types that can occur while building or transforming network weights
///
/// # Variants
///
/// - `FormatError` - the serialized weights are malformed or their sizes are inconsistent
/// - `PreconditionError` - a fold or normalization was requested on a block that cannot take it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("Format error: {0}")]
    FormatError(String),
    #[error("Precondition error: {0}")]
    PreconditionError(String),
}

/// Input/Output error types that can occur while loading serialized weights
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations
/// - `JsonError` - Wraps JSON deserialization errors
/// - `Weight` - The document parsed but could not be turned into a weight tree
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO error: {0}")]
    StdIoError(std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(serde_json::Error),
    #[error(transparent)]
    Weight(#[from] WeightError),
}

impl IoError {
    pub fn load_in_buf_reader(path: &str) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }
}
