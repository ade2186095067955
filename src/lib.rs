//! Vizzy: project gallery server, HTTP client and reorder sync.
//!
//! Naming, filtering and drag-ordering logic lives in `vizzy-common`; this
//! crate persists it and moves it over the wire.

pub mod client;
pub mod config;
pub mod errors;
pub mod gallery;
pub mod sync;
