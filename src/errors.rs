//! Typed error hierarchy for Vizzy.
//!
//! - `BatchError`: a reorder batch that is malformed or does not describe
//!   the scope's full item set
//! - `GalleryError`: storage-layer failures for projects, images and orders
//! - `SyncError`: client-side failures while pushing an order to the server

use thiserror::Error;
use vizzy_common::identity::IdentityError;

/// Problems with the contents of a reorder batch. Always detected before
/// any write is committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("{field} array is required")]
    MissingArray { field: &'static str },

    #[error("ID missing at index {index}")]
    MissingId { index: usize },

    #[error("Invalid ID at index {index}")]
    InvalidId { index: usize },

    #[error("Invalid version: expected an integer")]
    InvalidVersion,

    #[error("Duplicate ID {id} at index {index}")]
    DuplicateId { index: usize, id: i64 },

    #[error("Unknown ID {id} at index {index}")]
    UnknownItem { index: usize, id: i64 },

    #[error("Batch lists {submitted} of {expected} items; a reorder must include every item")]
    Incomplete { expected: usize, submitted: usize },
}

/// Errors from the gallery storage layer.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: i64 },

    #[error("Image {id} not found")]
    ImageNotFound { id: i64 },

    #[error("Invalid project name: {0}")]
    InvalidName(#[from] IdentityError),

    #[error("Invalid image phase '{0}'")]
    InvalidPhase(String),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("Stale reorder for {scope}: version {submitted} is not newer than {current}")]
    StaleVersion {
        scope: String,
        submitted: i64,
        current: i64,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Errors from pushing a reorder to the server.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Server applied {updated} of {total} updates")]
    PartialApplication { updated: usize, total: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
