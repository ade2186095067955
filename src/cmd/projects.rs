//! Project commands: `vizzy list`, `vizzy rename` and `vizzy projects`.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};

use super::super::ProjectsCommands;
use vizzy::client::GalleryClient;
use vizzy::gallery::models::{OrderScope, Project};
use vizzy::sync::{ReorderSync, SyncOutcome};
use vizzy_common::identity::RenameSession;
use vizzy_common::ordering::{OrderedList, move_onto};
use vizzy_common::storage::format_bytes;
use vizzy_common::view::{ViewAction, ViewState, ViewStore};

pub async fn cmd_list(
    server_url: &str,
    cities: Vec<String>,
    project_types: Vec<String>,
    search: Option<String>,
) -> Result<()> {
    let client = GalleryClient::new(server_url);
    let list = client.list_projects().await?;

    let mut store = ViewStore::new(ViewState::default());
    for city in cities {
        store.dispatch(ViewAction::ToggleCity(city.to_uppercase()));
    }
    for project_type in project_types {
        store.dispatch(ViewAction::ToggleProjectType(project_type.to_uppercase()));
    }
    if let Some(term) = search {
        store.dispatch(ViewAction::SetSearch(term));
    }

    let filters = &store.state().filters;
    let shown = filters.apply(&list.projects);
    if filters.has_active() {
        println!(
            "{} {} of {} projects ({} filters)",
            style("Showing").dim(),
            shown.len(),
            list.projects.len(),
            filters.active_count()
        );
    }
    if shown.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    for project in shown {
        print_project(project);
    }
    Ok(())
}

fn print_project(project: &Project) {
    println!(
        "{:>3}  {}  {}  {}",
        project.id,
        style(&project.display_name).bold(),
        style(&project.name).dim(),
        style(format!(
            "{} images, {}",
            project.image_count,
            format_bytes(project.total_size.max(0) as u64)
        ))
        .dim()
    );
}

pub async fn cmd_rename(server_url: &str, id: i64, name: Option<String>) -> Result<()> {
    let client = GalleryClient::new(server_url);
    let list = client.list_projects().await?;
    let project = list
        .projects
        .iter()
        .find(|p| p.id == id)
        .with_context(|| format!("Project {} not found", id))?;

    let mut session = RenameSession::start(&project.name);
    let text = match name {
        Some(text) => text,
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(session.prefix().to_string())
            .with_initial_text(session.text().to_string())
            .interact_text()
            .context("Failed to read project name")?,
    };
    session.set_text(text);
    let full_name = session.finish()?;

    let renamed = client.rename_project(id, &full_name).await?;
    println!("{} {}", style("Renamed to").green(), renamed.name);
    Ok(())
}

pub async fn cmd_projects(server_url: &str, command: ProjectsCommands) -> Result<()> {
    match command {
        ProjectsCommands::Move { id, onto } => {
            let client = GalleryClient::new(server_url);
            let listed = client.list_projects().await?;
            let mut list = OrderedList::new(listed.projects);
            if !move_onto(&mut list, id, onto) {
                anyhow::bail!("Cannot move project {} onto {}", id, onto);
            }

            let sync = ReorderSync::new(client);
            sync.seed(OrderScope::Projects, listed.version);
            commit_order(&sync, OrderScope::Projects, &list.ids()).await?;
            for project in list.items() {
                print_project(project);
            }
        }
    }
    Ok(())
}

/// Push a working order and report the outcome.
pub(crate) async fn commit_order(
    sync: &ReorderSync<GalleryClient>,
    scope: OrderScope,
    ids: &[i64],
) -> Result<()> {
    match sync.commit(scope, ids).await {
        Ok(SyncOutcome::Applied(outcome)) => {
            println!(
                "{} {}/{} positions (version {})",
                style("Saved").green().bold(),
                outcome.updated,
                outcome.total,
                outcome.version
            );
            Ok(())
        }
        Ok(SyncOutcome::Superseded { version }) => {
            println!("Order version {} was superseded by a newer one.", version);
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{} order not saved; the server order is unchanged",
                style("✗").red()
            );
            Err(e).context("Failed to save order")
        }
    }
}
