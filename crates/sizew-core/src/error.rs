use std::io;

use thiserror::Error;

/// Errors the engine can observe internally.
///
/// None of these cross the public `measure_directory` boundary as `Err` —
/// per the error design, filesystem and cache-I/O failures are absorbed and
/// logged, not propagated. `try_measure_directory` exposes `InvalidInput`
/// for callers that want it.
#[derive(Error, Debug)]
pub enum SizewError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type SizewResult<T> = Result<T, SizewError>;
