use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info, warn};
use vizzy_common::identity::{self, IdentityError};

use super::models::*;
use crate::errors::{BatchError, GalleryError};

/// Async-safe handle to the gallery database.
///
/// Wraps `GalleryDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads. The mutex also makes every batch
/// transaction the only writer while it runs.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<GalleryDb>>,
}

impl DbHandle {
    pub fn new(db: GalleryDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&GalleryDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| GalleryError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. Only for startup and tests.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, GalleryDb>> {
        self.inner
            .lock()
            .map_err(|_| GalleryError::LockPoisoned.into())
    }
}

pub struct GalleryDb {
    conn: Connection,
}

const PROJECT_SELECT: &str = "
    SELECT p.id, p.name, p.display_order, p.created_at, p.updated_at,
           COUNT(i.id), COALESCE(SUM(i.size_bytes), 0)
    FROM projects p
    LEFT JOIN images i ON i.project_id = p.id";

const IMAGE_SELECT: &str =
    "SELECT id, project_id, filename, size_bytes, phase, display_order, created_at FROM images";

impl GalleryDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    display_order INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS images (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    filename TEXT NOT NULL,
                    size_bytes INTEGER NOT NULL DEFAULT 0,
                    display_order INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS order_versions (
                    scope TEXT PRIMARY KEY,
                    version INTEGER NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_projects_order ON projects(display_order);
                CREATE INDEX IF NOT EXISTS idx_images_project ON images(project_id, display_order);
                ",
            )
            .context("Failed to create tables")?;

        // Additive migrations (columns are nullable, safe to re-run).
        // We only ignore "duplicate column" errors; any other error is propagated.
        match self.conn.execute("ALTER TABLE images ADD COLUMN phase TEXT", []) {
            Ok(_) => {}
            Err(e) if e.to_string().contains("duplicate column") => {}
            Err(e) => return Err(anyhow::anyhow!("Failed to add phase column: {}", e)),
        }

        Ok(())
    }

    // ── Project CRUD ──────────────────────────────────────────────────

    pub fn create_project(&self, name: &str) -> Result<Project> {
        let name = validated_name(name)?;
        let next: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(display_order), -1) + 1 FROM projects",
                [],
                |row| row.get(0),
            )
            .context("Failed to get next project order")?;
        self.conn
            .execute(
                "INSERT INTO projects (name, display_order) VALUES (?1, ?2)",
                params![name, next],
            )
            .context("Failed to insert project")?;
        let id = self.conn.last_insert_rowid();
        debug!(project_id = id, display_order = next, "project created");
        self.get_project(id)?
            .context("Project not found after insert")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let sql = format!("{PROJECT_SELECT} GROUP BY p.id ORDER BY p.display_order, p.id");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], project_from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let sql = format!("{PROJECT_SELECT} WHERE p.id = ?1 GROUP BY p.id");
        self.conn
            .query_row(&sql, params![id], project_from_row)
            .optional()
            .context("Failed to query project")
    }

    pub fn rename_project(&self, id: i64, name: &str) -> Result<Project> {
        let name = validated_name(name)?;
        let count = self
            .conn
            .execute(
                "UPDATE projects SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![name, id],
            )
            .context("Failed to rename project")?;
        if count == 0 {
            return Err(GalleryError::ProjectNotFound { id }.into());
        }
        self.get_project(id)?
            .context("Project not found after rename")
    }

    /// Delete a project (and its images) and close the gap it leaves in the
    /// project order.
    pub fn delete_project(&self, id: i64) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let count = tx
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .context("Failed to delete project")?;
        if count > 0 {
            tx.execute(
                "DELETE FROM order_versions WHERE scope = ?1",
                params![OrderScope::Images { project_id: id }.key()],
            )
            .context("Failed to delete image order version")?;
            renumber(&tx, OrderScope::Projects)?;
        }
        tx.commit().context("Failed to commit project delete")?;
        Ok(count > 0)
    }

    // ── Image metadata ────────────────────────────────────────────────

    pub fn add_image(
        &self,
        project_id: i64,
        filename: &str,
        size_bytes: i64,
        phase: Option<ImagePhase>,
    ) -> Result<Image> {
        self.require_project(project_id)?;
        let next: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(display_order), -1) + 1 FROM images WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .context("Failed to get next image order")?;
        self.conn
            .execute(
                "INSERT INTO images (project_id, filename, size_bytes, phase, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    project_id,
                    filename,
                    size_bytes,
                    phase.map(|p| p.as_str()),
                    next
                ],
            )
            .context("Failed to insert image")?;
        let id = self.conn.last_insert_rowid();
        self.get_image(id)?.context("Image not found after insert")
    }

    /// Images of a project in display order, optionally restricted to the
    /// given phases.
    pub fn list_images(&self, project_id: i64, phases: &[ImagePhase]) -> Result<Vec<Image>> {
        self.require_project(project_id)?;
        let sql = format!("{IMAGE_SELECT} WHERE project_id = ?1 ORDER BY display_order, id");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_images")?;
        let rows = stmt
            .query_map(params![project_id], ImageRow::from_row)
            .context("Failed to query images")?;
        let mut images = Vec::new();
        for row in rows {
            let image = row.context("Failed to read image row")?.into_image()?;
            let keep = phases.is_empty()
                || image.phase.map(|p| phases.contains(&p)).unwrap_or(false);
            if keep {
                images.push(image);
            }
        }
        Ok(images)
    }

    pub fn get_image(&self, id: i64) -> Result<Option<Image>> {
        let sql = format!("{IMAGE_SELECT} WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], ImageRow::from_row)
            .optional()
            .context("Failed to query image")?;
        row.map(ImageRow::into_image).transpose()
    }

    pub fn update_image_phase(&self, id: i64, phase: Option<ImagePhase>) -> Result<Image> {
        let count = self
            .conn
            .execute(
                "UPDATE images SET phase = ?1 WHERE id = ?2",
                params![phase.map(|p| p.as_str()), id],
            )
            .context("Failed to update image phase")?;
        if count == 0 {
            return Err(GalleryError::ImageNotFound { id }.into());
        }
        self.get_image(id)?
            .context("Image not found after update")
    }

    /// Delete an image and close the gap it leaves in its project's order.
    /// Returns the owning project id when something was deleted.
    pub fn delete_image(&self, id: i64) -> Result<Option<i64>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let project_id: Option<i64> = tx
            .query_row(
                "SELECT project_id FROM images WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up image")?;
        if let Some(project_id) = project_id {
            tx.execute("DELETE FROM images WHERE id = ?1", params![id])
                .context("Failed to delete image")?;
            renumber(&tx, OrderScope::Images { project_id })?;
        }
        tx.commit().context("Failed to commit image delete")?;
        Ok(project_id)
    }

    /// Total bytes across all stored images.
    pub fn storage_used(&self) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(size_bytes), 0) FROM images",
                [],
                |row| row.get(0),
            )
            .context("Failed to sum image sizes")
    }

    // ── Ordering ──────────────────────────────────────────────────────

    /// Last applied order version for a scope; 0 if never reordered.
    pub fn order_version(&self, scope: OrderScope) -> Result<i64> {
        order_version(&self.conn, &scope)
    }

    /// Apply a complete new order to a scope as one transaction.
    ///
    /// `ids[i]` receives `display_order = i`. Either every item is updated
    /// or, on the first failure, the transaction is rolled back and the
    /// previously committed order stays untouched. `version`, if given,
    /// must be newer than the scope's current version; without it the
    /// server assigns the next one.
    pub fn reorder(
        &self,
        scope: OrderScope,
        ids: &[i64],
        version: Option<i64>,
    ) -> Result<ReorderOutcome> {
        if let OrderScope::Images { project_id } = scope {
            self.require_project(project_id)?;
        }

        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        match apply_reorder(&tx, scope, ids, version) {
            Ok(outcome) => {
                tx.commit().context("Failed to commit reorder")?;
                info!(
                    scope = %scope,
                    updated = outcome.updated,
                    total = outcome.total,
                    version = outcome.version,
                    "reorder committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(scope = %scope, error = %e, "reorder rolled back");
                tx.rollback().context("Failed to roll back reorder")?;
                Err(e)
            }
        }
    }

    fn require_project(&self, id: i64) -> Result<()> {
        let exists: bool = self
            .conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM projects WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .context("Failed to check project")?;
        if exists {
            Ok(())
        } else {
            Err(GalleryError::ProjectNotFound { id }.into())
        }
    }
}

fn validated_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GalleryError::InvalidName(IdentityError::EmptyName).into());
    }
    Ok(name)
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let name: String = row.get(1)?;
    Ok(Project {
        id: row.get(0)?,
        display_name: identity::display_name(&name).to_string(),
        name,
        display_order: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        image_count: row.get(5)?,
        total_size: row.get(6)?,
    })
}

fn scope_ids(conn: &Connection, scope: &OrderScope) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    match scope {
        OrderScope::Projects => {
            let mut stmt = conn
                .prepare("SELECT id FROM projects ORDER BY display_order, id")
                .context("Failed to prepare scope query")?;
            for id in stmt.query_map([], |row| row.get(0))? {
                ids.push(id.context("Failed to read project id")?);
            }
        }
        OrderScope::Images { project_id } => {
            let mut stmt = conn
                .prepare("SELECT id FROM images WHERE project_id = ?1 ORDER BY display_order, id")
                .context("Failed to prepare scope query")?;
            for id in stmt.query_map(params![project_id], |row| row.get(0))? {
                ids.push(id.context("Failed to read image id")?);
            }
        }
    }
    Ok(ids)
}

fn order_version(conn: &Connection, scope: &OrderScope) -> Result<i64> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT version FROM order_versions WHERE scope = ?1",
            params![scope.key()],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to read order version")?;
    Ok(version.unwrap_or(0))
}

fn set_display_order(conn: &Connection, scope: &OrderScope, id: i64, order: i64) -> Result<usize> {
    let count = match scope {
        OrderScope::Projects => conn.execute(
            "UPDATE projects SET display_order = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![order, id],
        ),
        OrderScope::Images { project_id } => conn.execute(
            "UPDATE images SET display_order = ?1 WHERE id = ?2 AND project_id = ?3",
            params![order, id, project_id],
        ),
    }
    .context("Failed to update display order")?;
    Ok(count)
}

/// Close gaps after a delete: rewrite the scope as 0..n in its current order.
fn renumber(conn: &Connection, scope: OrderScope) -> Result<()> {
    for (index, id) in scope_ids(conn, &scope)?.into_iter().enumerate() {
        set_display_order(conn, &scope, id, index as i64)?;
    }
    Ok(())
}

/// Validate the batch against the scope and write every position. Runs
/// inside the caller's transaction; any error leaves it for rollback.
fn apply_reorder(
    conn: &Connection,
    scope: OrderScope,
    ids: &[i64],
    requested: Option<i64>,
) -> Result<ReorderOutcome> {
    let current = order_version(conn, &scope)?;
    let version = match requested {
        Some(v) if v <= current => {
            return Err(GalleryError::StaleVersion {
                scope: scope.key(),
                submitted: v,
                current,
            }
            .into());
        }
        Some(v) => v,
        None => current + 1,
    };

    let existing: HashSet<i64> = scope_ids(conn, &scope)?.into_iter().collect();
    let mut seen = HashSet::with_capacity(ids.len());
    for (index, &id) in ids.iter().enumerate() {
        if !existing.contains(&id) {
            return Err(GalleryError::from(BatchError::UnknownItem { index, id }).into());
        }
        if !seen.insert(id) {
            return Err(GalleryError::from(BatchError::DuplicateId { index, id }).into());
        }
    }
    if ids.len() != existing.len() {
        return Err(GalleryError::from(BatchError::Incomplete {
            expected: existing.len(),
            submitted: ids.len(),
        })
        .into());
    }

    let mut updated = 0;
    for (index, &id) in ids.iter().enumerate() {
        let count = set_display_order(conn, &scope, id, index as i64)?;
        if count != 1 {
            return Err(GalleryError::from(BatchError::UnknownItem { index, id }).into());
        }
        updated += count;
        debug!(scope = %scope, id, display_order = index, "reorder item");
    }

    conn.execute(
        "INSERT INTO order_versions (scope, version) VALUES (?1, ?2)
         ON CONFLICT(scope) DO UPDATE SET version = excluded.version, updated_at = datetime('now')",
        params![scope.key(), version],
    )
    .context("Failed to store order version")?;

    Ok(ReorderOutcome {
        updated,
        total: ids.len(),
        version,
    })
}

/// Intermediate row struct for images; `phase` is parsed after the read.
struct ImageRow {
    id: i64,
    project_id: i64,
    filename: String,
    size_bytes: i64,
    phase: Option<String>,
    display_order: i64,
    created_at: String,
}

impl ImageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            filename: row.get(2)?,
            size_bytes: row.get(3)?,
            phase: row.get(4)?,
            display_order: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_image(self) -> Result<Image> {
        let phase = self
            .phase
            .as_deref()
            .map(ImagePhase::from_str)
            .transpose()
            .map_err(GalleryError::InvalidPhase)?;
        Ok(Image {
            id: self.id,
            project_id: self.project_id,
            filename: self.filename,
            size_bytes: self.size_bytes,
            phase,
            display_order: self.display_order,
            created_at: self.created_at,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
