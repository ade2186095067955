use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info};
use vizzy_common::storage::StorageUsage;

use super::db::DbHandle;
#[cfg(test)]
use super::db::GalleryDb;
use super::models::*;
use super::ws::{WsMessage, broadcast_message};
use crate::errors::{BatchError, GalleryError};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub ws_tx: broadcast::Sender<String>,
    /// Storage quota reported by `/api/storage`.
    pub storage_limit: u64,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct RenameProjectRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct AddImageRequest {
    pub filename: String,
    #[serde(default)]
    pub size_bytes: i64,
    pub phase: Option<ImagePhase>,
}

#[derive(Deserialize)]
pub struct UpdateImageRequest {
    pub phase: Option<ImagePhase>,
}

#[derive(Deserialize)]
pub struct ImageQuery {
    /// Comma-separated phase codes, e.g. `SD,DD`.
    pub phase: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    MethodNotAllowed,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<GalleryError>() {
            Some(GalleryError::ProjectNotFound { .. } | GalleryError::ImageNotFound { .. }) => {
                ApiError::NotFound(e.to_string())
            }
            Some(
                GalleryError::InvalidName(_)
                | GalleryError::InvalidPhase(_)
                | GalleryError::Batch(_),
            ) => ApiError::BadRequest(e.to_string()),
            Some(GalleryError::StaleVersion { .. }) => ApiError::Conflict(e.to_string()),
            _ => {
                error!(error = %format!("{:#}", e), "request failed");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(e: BatchError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).patch(rename_project).delete(delete_project),
        )
        .route(
            "/api/projects/{id}/images",
            get(list_images).post(add_image),
        )
        .route(
            "/api/projects/{id}/reorder-images",
            post(reorder_images)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/reorder-projects",
            post(reorder_projects)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/api/images/{id}", patch(update_image).delete(delete_image))
        .route("/api/storage", get(storage_usage))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Pull the ordered id list and optional version out of a reorder body.
///
/// `field` names the array (`images` or `projects`). Ids may be JSON numbers
/// or numeric strings. The first malformed entry fails the whole batch.
pub fn parse_batch(body: &Value, field: &'static str) -> Result<(Vec<i64>, Option<i64>), BatchError> {
    let items = body
        .get(field)
        .and_then(Value::as_array)
        .ok_or(BatchError::MissingArray { field })?;

    let mut ids = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let id = match item.get("id") {
            None | Some(Value::Null) => return Err(BatchError::MissingId { index }),
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        };
        ids.push(id.ok_or(BatchError::InvalidId { index })?);
    }

    let version = match body.get("version") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_i64().ok_or(BatchError::InvalidVersion)?),
    };
    Ok((ids, version))
}

const IMAGES_REORDERED: &str = "Images reordered successfully";
const PROJECTS_REORDERED: &str = "Projects reordered successfully";

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn list_projects(State(state): State<SharedState>) -> Result<Json<ProjectList>, ApiError> {
    let list = state
        .db
        .call(|db| {
            Ok(ProjectList {
                projects: db.list_projects()?,
                version: db.order_version(OrderScope::Projects)?,
            })
        })
        .await?;
    Ok(Json(list))
}

async fn create_project(
    State(state): State<SharedState>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let project = state
        .db
        .call(move |db| db.create_project(&req.name))
        .await?;
    info!(project_id = project.id, name = %project.name, "project created");
    broadcast_message(
        &state.ws_tx,
        &WsMessage::ProjectCreated {
            project: project.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Project>, ApiError> {
    let Path(id) = path?;
    let project = state.db.call(move |db| db.get_project(id)).await?;
    project
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))
}

async fn rename_project(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<RenameProjectRequest>, JsonRejection>,
) -> Result<Json<Project>, ApiError> {
    let Path(id) = path?;
    let Json(req) = body?;
    let project = state
        .db
        .call(move |db| db.rename_project(id, &req.name))
        .await?;
    info!(project_id = id, name = %project.name, "project renamed");
    broadcast_message(
        &state.ws_tx,
        &WsMessage::ProjectRenamed {
            project: project.clone(),
        },
    );
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let deleted = state.db.call(move |db| db.delete_project(id)).await?;
    match deleted {
        true => {
            info!(project_id = id, "project deleted");
            broadcast_message(&state.ws_tx, &WsMessage::ProjectDeleted { project_id: id });
            Ok(StatusCode::NO_CONTENT)
        }
        false => Err(ApiError::NotFound(format!("Project {} not found", id))),
    }
}

async fn list_images(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> Result<Json<ImageList>, ApiError> {
    let Path(project_id) = path?;
    let Query(query) = query?;
    let phases =
        ImagePhase::parse_list(query.phase.as_deref()).map_err(ApiError::BadRequest)?;
    let list = state
        .db
        .call(move |db| {
            Ok(ImageList {
                project_id,
                images: db.list_images(project_id, &phases)?,
                version: db.order_version(OrderScope::Images { project_id })?,
            })
        })
        .await?;
    Ok(Json(list))
}

async fn add_image(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<AddImageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(project_id) = path?;
    let Json(req) = body?;
    if req.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("filename is required".into()));
    }
    if req.size_bytes < 0 {
        return Err(ApiError::BadRequest("size_bytes must not be negative".into()));
    }
    let image = state
        .db
        .call(move |db| db.add_image(project_id, req.filename.trim(), req.size_bytes, req.phase))
        .await?;
    info!(project_id, image_id = image.id, "image added");
    broadcast_message(
        &state.ws_tx,
        &WsMessage::ImageAdded {
            image: image.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(image)))
}

async fn update_image(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateImageRequest>, JsonRejection>,
) -> Result<Json<Image>, ApiError> {
    let Path(id) = path?;
    let Json(req) = body?;
    let image = state
        .db
        .call(move |db| db.update_image_phase(id, req.phase))
        .await?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::ImageUpdated {
            image: image.clone(),
        },
    );
    Ok(Json(image))
}

async fn delete_image(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let project_id = state.db.call(move |db| db.delete_image(id)).await?;
    match project_id {
        Some(project_id) => {
            info!(project_id, image_id = id, "image deleted");
            broadcast_message(
                &state.ws_tx,
                &WsMessage::ImageDeleted {
                    project_id,
                    image_id: id,
                },
            );
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::NotFound(format!("Image {} not found", id))),
    }
}

async fn reorder_images(
    State(state): State<SharedState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ReorderResponse>, ApiError> {
    let Path(project_id) = path?;
    let Json(body) = body?;
    let (ids, version) = parse_batch(&body, "images")?;
    let image_ids = ids.clone();
    let outcome = state
        .db
        .call(move |db| db.reorder(OrderScope::Images { project_id }, &ids, version))
        .await?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::ImagesReordered {
            project_id,
            image_ids,
            version: outcome.version,
        },
    );
    Ok(Json(ReorderResponse {
        message: IMAGES_REORDERED.to_string(),
        outcome,
    }))
}

async fn reorder_projects(
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ReorderResponse>, ApiError> {
    let Json(body) = body?;
    let (ids, version) = parse_batch(&body, "projects")?;
    let project_ids = ids.clone();
    let outcome = state
        .db
        .call(move |db| db.reorder(OrderScope::Projects, &ids, version))
        .await?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::ProjectsReordered {
            project_ids,
            version: outcome.version,
        },
    );
    Ok(Json(ReorderResponse {
        message: PROJECTS_REORDERED.to_string(),
        outcome,
    }))
}

async fn storage_usage(State(state): State<SharedState>) -> Result<Json<StorageUsage>, ApiError> {
    let used = state.db.call(|db| db.storage_used()).await?;
    Ok(Json(StorageUsage::new(used.max(0) as u64, state.storage_limit)))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        db: DbHandle,
        ws_tx: broadcast::Sender<String>,
    }

    fn test_app() -> TestApp {
        let db = DbHandle::new(GalleryDb::new_in_memory().unwrap());
        let (ws_tx, _) = broadcast::channel(16);
        let state = Arc::new(AppState {
            db: db.clone(),
            ws_tx: ws_tx.clone(),
            storage_limit: 10_000,
        });
        TestApp {
            router: api_router().with_state(state),
            db,
            ws_tx,
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    /// Seeds a project with three images and returns (project_id, image ids).
    fn seed(app: &TestApp) -> (i64, Vec<i64>) {
        let db = app.db.lock_sync().unwrap();
        let project = db.create_project("DAL-ES-24-117-Lakeside").unwrap();
        let ids = ["a.jpg", "b.jpg", "c.jpg"]
            .iter()
            .map(|f| db.add_image(project.id, f, 100, None).unwrap().id)
            .collect();
        (project.id, ids)
    }

    fn image_order(app: &TestApp, project_id: i64) -> Vec<(i64, i64)> {
        app.db
            .lock_sync()
            .unwrap()
            .list_images(project_id, &[])
            .unwrap()
            .into_iter()
            .map(|i| (i.id, i.display_order))
            .collect()
    }

    // ── parse_batch ──

    #[test]
    fn test_parse_batch_accepts_numbers_and_numeric_strings() {
        let body = json!({"images": [{"id": 5}, {"id": "2"}, {"id": 9}], "version": 3});
        assert_eq!(parse_batch(&body, "images").unwrap(), (vec![5, 2, 9], Some(3)));
    }

    #[test]
    fn test_parse_batch_reports_missing_id_index() {
        let body = json!({"images": [{"id": 5}, {}, {"id": 9}]});
        assert_eq!(
            parse_batch(&body, "images").unwrap_err(),
            BatchError::MissingId { index: 1 }
        );
    }

    #[test]
    fn test_parse_batch_rejects_non_array() {
        let body = json!({"images": "5,2,9"});
        assert_eq!(
            parse_batch(&body, "images").unwrap_err(),
            BatchError::MissingArray { field: "images" }
        );
        assert_eq!(
            parse_batch(&json!({}), "projects").unwrap_err(),
            BatchError::MissingArray { field: "projects" }
        );
    }

    #[test]
    fn test_parse_batch_rejects_bad_id_and_version() {
        let body = json!({"images": [{"id": true}]});
        assert_eq!(
            parse_batch(&body, "images").unwrap_err(),
            BatchError::InvalidId { index: 0 }
        );
        let body = json!({"images": [], "version": "later"});
        assert_eq!(
            parse_batch(&body, "images").unwrap_err(),
            BatchError::InvalidVersion
        );
    }

    // ── basic routes ──

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app();
        let response = app.router.oneshot(empty_request("GET", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_list_projects_empty() {
        let app = test_app();
        let response = app
            .router
            .oneshot(empty_request("GET", "/api/projects"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let list: Value = body_json(response.into_body()).await;
        assert_eq!(list, json!({"projects": [], "version": 0}));
    }

    #[tokio::test]
    async fn test_create_project_broadcasts() {
        let app = test_app();
        let mut rx = app.ws_tx.subscribe();
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/projects",
                json!({"name": "AUS-HS-31-002-Westlake"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let project: Project = body_json(response.into_body()).await;
        assert_eq!(project.display_name, "Westlake");
        assert_eq!(project.display_order, 0);

        let event: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(event["type"], "ProjectCreated");
    }

    #[tokio::test]
    async fn test_create_project_blank_name_is_bad_request() {
        let app = test_app();
        let response = app
            .router
            .oneshot(json_request("POST", "/api/projects", json!({"name": " "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_project_not_found() {
        let app = test_app();
        let response = app
            .router
            .oneshot(empty_request("GET", "/api/projects/99"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = body_json(response.into_body()).await;
        assert_eq!(body["error"], "Project 99 not found");
    }

    #[tokio::test]
    async fn test_non_numeric_path_id_is_json_bad_request() {
        let app = test_app();
        for (method, uri) in [
            ("GET", "/api/projects/abc"),
            ("DELETE", "/api/images/x1"),
            ("GET", "/api/projects/abc/images"),
        ] {
            let response = app
                .router
                .clone()
                .oneshot(empty_request(method, uri))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
            let body: Value = body_json(response.into_body()).await;
            assert!(body["error"].is_string(), "{} {}: {}", method, uri, body);
        }

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/projects/abc/reorder-images",
                json!({"images": []}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(response.into_body()).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_rename_and_delete_project() {
        let app = test_app();
        let (project_id, _) = seed(&app);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/projects/{}", project_id),
                json!({"name": "DAL-ES-24-117-Lakeside North"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let project: Project = body_json(response.into_body()).await;
        assert_eq!(project.display_name, "Lakeside North");

        let uri = format!("/api/projects/{}", project_id);
        let response = app
            .router
            .clone()
            .oneshot(empty_request("DELETE", &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.router.oneshot(empty_request("DELETE", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_and_filter_images() {
        let app = test_app();
        let (project_id, _) = seed(&app);
        let uri = format!("/api/projects/{}/images", project_id);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &uri,
                json!({"filename": "site.png", "size_bytes": 50, "phase": "SD"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let image: Image = body_json(response.into_body()).await;
        assert_eq!(image.display_order, 3);

        let response = app
            .router
            .clone()
            .oneshot(empty_request("GET", &format!("{}?phase=SD,DD", uri)))
            .await
            .unwrap();
        let list: ImageList = body_json(response.into_body()).await;
        assert_eq!(list.images.len(), 1);
        assert_eq!(list.images[0].filename, "site.png");

        let response = app
            .router
            .oneshot(empty_request("GET", &format!("{}?phase=XX", uri)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_image_requires_filename() {
        let app = test_app();
        let (project_id, _) = seed(&app);
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                &format!("/api/projects/{}/images", project_id),
                json!({"filename": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_delete_image() {
        let app = test_app();
        let (project_id, ids) = seed(&app);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/images/{}", ids[1]),
                json!({"phase": "Final"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let image: Image = body_json(response.into_body()).await;
        assert_eq!(image.phase, Some(ImagePhase::Final));

        let response = app
            .router
            .clone()
            .oneshot(empty_request("DELETE", &format!("/api/images/{}", ids[0])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(image_order(&app, project_id), vec![(ids[1], 0), (ids[2], 1)]);
    }

    #[tokio::test]
    async fn test_storage_usage() {
        let app = test_app();
        seed(&app);
        let response = app
            .router
            .oneshot(empty_request("GET", "/api/storage"))
            .await
            .unwrap();
        let usage: StorageUsage = body_json(response.into_body()).await;
        assert_eq!(usage.used, 300);
        assert_eq!(usage.limit, 10_000);
        assert_eq!(usage.percent, 3);
    }

    // ── reorder-images ──

    #[tokio::test]
    async fn test_reorder_images_applies_full_order() {
        let app = test_app();
        let (project_id, ids) = seed(&app);
        let mut rx = app.ws_tx.subscribe();
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/projects/{}/reorder-images", project_id),
                json!({"images": [{"id": c}, {"id": a}, {"id": b}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = body_json(response.into_body()).await;
        assert_eq!(
            body,
            json!({
                "message": "Images reordered successfully",
                "updated": 3,
                "total": 3,
                "version": 1
            })
        );
        assert_eq!(image_order(&app, project_id), vec![(c, 0), (a, 1), (b, 2)]);

        let event: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(event["type"], "ImagesReordered");
        assert_eq!(event["data"]["image_ids"], json!([c, a, b]));
    }

    #[tokio::test]
    async fn test_reorder_images_missing_id_leaves_order_unchanged() {
        let app = test_app();
        let (project_id, ids) = seed(&app);
        let before = image_order(&app, project_id);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/projects/{}/reorder-images", project_id),
                json!({"images": [{"id": ids[2]}, {"name": "no id"}, {"id": ids[0]}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(response.into_body()).await;
        assert_eq!(body["error"], "ID missing at index 1");
        assert_eq!(image_order(&app, project_id), before);
    }

    #[tokio::test]
    async fn test_reorder_images_unknown_id_rolls_back() {
        let app = test_app();
        let (project_id, ids) = seed(&app);
        let before = image_order(&app, project_id);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/projects/{}/reorder-images", project_id),
                json!({"images": [{"id": ids[1]}, {"id": ids[0]}, {"id": 4040}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(image_order(&app, project_id), before);
    }

    #[tokio::test]
    async fn test_reorder_images_requires_array() {
        let app = test_app();
        let (project_id, _) = seed(&app);
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                &format!("/api/projects/{}/reorder-images", project_id),
                json!({"images": {"id": 1}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(response.into_body()).await;
        assert_eq!(body["error"], "images array is required");
    }

    #[tokio::test]
    async fn test_reorder_images_invalid_json_is_bad_request() {
        let app = test_app();
        let (project_id, _) = seed(&app);
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/projects/{}/reorder-images", project_id))
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reorder_images_wrong_method_is_405_json() {
        let app = test_app();
        let (project_id, _) = seed(&app);
        let response = app
            .router
            .oneshot(empty_request(
                "GET",
                &format!("/api/projects/{}/reorder-images", project_id),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = body_json(response.into_body()).await;
        assert_eq!(body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_reorder_images_options_is_empty_ok() {
        let app = test_app();
        let (project_id, _) = seed(&app);
        let response = app
            .router
            .oneshot(empty_request(
                "OPTIONS",
                &format!("/api/projects/{}/reorder-images", project_id),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_reorder_images_unknown_project_is_404() {
        let app = test_app();
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/projects/77/reorder-images",
                json!({"images": []}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reorder_images_stale_version_is_conflict() {
        let app = test_app();
        let (project_id, ids) = seed(&app);
        let uri = format!("/api/projects/{}/reorder-images", project_id);
        let newer = json!({"images": [{"id": ids[2]}, {"id": ids[1]}, {"id": ids[0]}], "version": 4});
        let older = json!({"images": [{"id": ids[0]}, {"id": ids[1]}, {"id": ids[2]}], "version": 3});

        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", &uri, newer))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", &uri, older))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            image_order(&app, project_id),
            vec![(ids[2], 0), (ids[1], 1), (ids[0], 2)]
        );

        let response = app
            .router
            .oneshot(empty_request("GET", &format!("/api/projects/{}/images", project_id)))
            .await
            .unwrap();
        let list: ImageList = body_json(response.into_body()).await;
        assert_eq!(list.version, 4);
    }

    // ── reorder-projects ──

    #[tokio::test]
    async fn test_reorder_projects() {
        let app = test_app();
        let (first, second) = {
            let db = app.db.lock_sync().unwrap();
            (
                db.create_project("A").unwrap().id,
                db.create_project("B").unwrap().id,
            )
        };
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/reorder-projects",
                json!({"projects": [{"id": second}, {"id": first}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: ReorderResponse = body_json(response.into_body()).await;
        assert_eq!(body.message, "Projects reordered successfully");
        assert_eq!((body.outcome.updated, body.outcome.total), (2, 2));

        let response = app
            .router
            .oneshot(empty_request("GET", "/api/projects"))
            .await
            .unwrap();
        let list: ProjectList = body_json(response.into_body()).await;
        let names: Vec<&str> = list.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(list.version, 1);
    }

    #[tokio::test]
    async fn test_reorder_projects_incomplete_is_bad_request() {
        let app = test_app();
        let first = {
            let db = app.db.lock_sync().unwrap();
            let first = db.create_project("A").unwrap().id;
            db.create_project("B").unwrap();
            first
        };
        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/reorder-projects",
                json!({"projects": [{"id": first}]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
