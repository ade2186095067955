//! Gallery server: project and image metadata with atomic batch reorders.
//!
//! - `models`: projects, images, phases, order scopes and API views
//! - `db`: SQLite storage behind [`db::DbHandle`], including the reorder transaction
//! - `api`: axum routes and the JSON error mapping
//! - `ws`: WebSocket change feed
//! - `server`: config, router assembly, CORS and startup

pub mod api;
pub mod db;
pub mod models;
pub mod server;
pub mod ws;

pub use db::{DbHandle, GalleryDb};
pub use models::{Image, ImagePhase, OrderScope, Project, ReorderOutcome};
pub use server::{ServerConfig, start_server};
