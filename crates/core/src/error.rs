//! Error taxonomy for the analysis pipeline and the graph store.
//!
//! Extraction failures are recovered locally (the offending file is skipped
//! and reported in the [`BuildReport`](crate::pipeline::BuildReport));
//! builder and store errors propagate to the caller. Query operations never
//! raise for missing nodes; they return empty results.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the build pipeline.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The analyze target does not exist or is not a directory.
    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    /// Two distinct entities produced the same stable identifier.
    ///
    /// This is diagnostic evidence of an ID-construction bug and aborts the
    /// build rather than silently merging the entities.
    #[error("identifier collision on `{id}`: {first} vs {second}")]
    IdentifierCollision {
        id: String,
        first: String,
        second: String,
    },

    /// The cancellation signal fired between files or phases.
    #[error("build cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while extracting a single file.
///
/// Always recoverable: the pipeline logs the file as skipped and continues.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse source: {0}")]
    ParseFailed(String),

    #[error("unsupported extension: {0}")]
    UnsupportedExtension(String),
}

/// Errors raised by the graph store back-ends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store open failed: {0}")]
    Open(#[source] rusqlite::Error),

    #[error("store write failed: {0}")]
    Write(#[source] rusqlite::Error),

    #[error("store read failed: {0}")]
    Read(#[source] rusqlite::Error),

    /// The in-memory back-end could not flush its image to disk.
    /// The store stays usable but is marked dirty.
    #[error("store flush failed: {0}")]
    Flush(#[source] rusqlite::Error),

    /// A persisted row no longer matches the node/edge model.
    #[error("corrupt store row: {0}")]
    Corrupt(String),

    #[error("store io failed: {0}")]
    Io(#[from] std::io::Error),
}
