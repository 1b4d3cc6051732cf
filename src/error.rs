//! Errors raised while loading, ranking, and writing citation graphs.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The input ended before a complete header could be read.
    #[error("truncated header")]
    TruncatedHeader,

    /// The input ended inside a record; `offset` is where the record began.
    #[error("truncated record at byte {offset}")]
    TruncatedRecord { offset: usize },

    #[error("negative {field} ({value}) at byte {offset}")]
    NegativeField { field: &'static str, value: i32, offset: usize },

    #[error("node {node} outside id space (max id {max_id})")]
    NodeOutOfRange { node: u32, max_id: u32 },

    #[error("node {node} cites {target}, outside id space (max id {max_id})")]
    TargetOutOfRange { node: u32, target: u32, max_id: u32 },

    #[error("node {node} appears in more than one record")]
    DuplicateRecord { node: u32 },

    #[error("cannot allocate an id space of {nodes} nodes")]
    IdSpaceTooLarge { nodes: usize },

    #[error("id {id} does not fit in a signed 32-bit field")]
    IdTooLarge { id: u32 },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
