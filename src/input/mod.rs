use std::path::{Path, PathBuf};

pub mod folds;
pub mod reader;
pub mod records;
pub mod sequence;

pub use folds::{FoldSet, FoldStatus, load_folds};
pub use sequence::{FrameIdParser, SequenceInput, UnparsedLine, load_sequence_entries};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Fails with `MissingInput` when a required input file is absent, so the
/// caller sees the path instead of a bare `NotFound`.
pub fn require_file(path: &Path) -> Result<PathBuf, InputError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(InputError::MissingInput(format!(
            "{} does not exist or is not a file",
            path.display()
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
