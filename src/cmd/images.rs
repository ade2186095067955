//! Image commands: `vizzy images`.

use anyhow::{Context, Result};
use console::style;
use std::str::FromStr;

use super::super::ImagesCommands;
use super::projects::commit_order;
use vizzy::client::GalleryClient;
use vizzy::gallery::models::{Image, ImagePhase, OrderScope};
use vizzy::sync::ReorderSync;
use vizzy_common::ordering::{OrderedList, move_onto};
use vizzy_common::storage::format_bytes;

pub async fn cmd_images(server_url: &str, command: ImagesCommands) -> Result<()> {
    let client = GalleryClient::new(server_url);
    match command {
        ImagesCommands::List { project_id, phase } => {
            let phases = ImagePhase::parse_list(phase.as_deref()).map_err(anyhow::Error::msg)?;
            let list = client.list_images(project_id, &phases).await?;
            if list.images.is_empty() {
                println!("No images.");
            }
            for image in &list.images {
                print_image(image);
            }
        }
        ImagesCommands::Add {
            project_id,
            filename,
            size,
            phase,
        } => {
            let size = match size {
                Some(size) => size,
                None => std::fs::metadata(&filename)
                    .with_context(|| format!("Failed to read {}; pass --size", filename))?
                    .len() as i64,
            };
            let phase = phase
                .as_deref()
                .map(ImagePhase::from_str)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let name = std::path::Path::new(&filename)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&filename)
                .to_string();
            let image = client.add_image(project_id, &name, size, phase).await?;
            println!("{} image {}", style("Added").green().bold(), image.id);
        }
        ImagesCommands::Move {
            project_id,
            id,
            onto,
        } => {
            let listed = client.list_images(project_id, &[]).await?;
            let mut list = OrderedList::new(listed.images);
            if !move_onto(&mut list, id, onto) {
                anyhow::bail!("Cannot move image {} onto {}", id, onto);
            }
            let scope = OrderScope::Images { project_id };
            let sync = ReorderSync::new(client);
            sync.seed(scope, listed.version);
            commit_order(&sync, scope, &list.ids()).await?;
            for image in list.items() {
                print_image(image);
            }
        }
        ImagesCommands::Reorder { project_id, ids } => {
            let listed = client.list_images(project_id, &[]).await?;
            let scope = OrderScope::Images { project_id };
            let sync = ReorderSync::new(client);
            sync.seed(scope, listed.version);
            commit_order(&sync, scope, &ids).await?;
        }
    }
    Ok(())
}

fn print_image(image: &Image) {
    println!(
        "{:>3}  {:>4}  {}  {}  {}",
        image.display_order,
        image.id,
        image.filename,
        style(format_bytes(image.size_bytes.max(0) as u64)).dim(),
        image.phase.map(|p| p.name()).unwrap_or("-")
    );
}
