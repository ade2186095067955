//! Gallery server commands: `vizzy serve` and `vizzy init`.

use anyhow::{Context, Result};
use std::path::Path;

use vizzy::config::{ServerOverrides, VizzyConfig};
use vizzy::gallery::{GalleryDb, start_server};

pub async fn cmd_serve(config: &VizzyConfig, overrides: ServerOverrides) -> Result<()> {
    let server = config.server_config(overrides);
    tracing::info!(
        host = %server.host,
        port = server.port,
        allowed_origin = %server.allowed_origin,
        "starting gallery server"
    );
    start_server(server).await
}

pub fn cmd_init(config: &VizzyConfig, db_path: Option<&Path>, force: bool) -> Result<()> {
    std::fs::create_dir_all(&config.vizzy_dir).with_context(|| {
        format!("Failed to create {}", config.vizzy_dir.display())
    })?;

    let config_path = config.config_file();
    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
    } else {
        // Environment overrides are not persisted.
        let mut toml = VizzyConfig::from_file(config.project_dir.clone())?.toml;
        if let Some(path) = db_path {
            toml.server.db_path = path.to_path_buf();
        }
        toml.save(&config_path)?;
        println!("Wrote {}", config_path.display());
    }

    let db_path = config.db_path(db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    GalleryDb::new(&db_path)?;
    println!("Gallery database initialized at {}", db_path.display());
    Ok(())
}
