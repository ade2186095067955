//! Integration tests for Vizzy
//!
//! CLI behaviour through the built binary, and the client/sync stack against
//! a real server bound to a local port.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use vizzy::client::GalleryClient;
use vizzy::errors::SyncError;
use vizzy::gallery::models::OrderScope;
use vizzy::gallery::server::{ServerConfig, build_router, open_state};
use vizzy::sync::{ReorderSync, SyncOutcome};
use vizzy_common::ordering::{OrderedList, move_onto};

/// Helper to create a vizzy Command isolated from the caller's environment
fn vizzy() -> Command {
    let mut cmd = cargo_bin_cmd!("vizzy");
    for key in [
        "VIZZY_HOST",
        "VIZZY_PORT",
        "VIZZY_DB_PATH",
        "VIZZY_ALLOWED_ORIGIN",
        "VIZZY_STORAGE_LIMIT",
        "VIZZY_SERVER_URL",
        "VIZZY_LOG",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Start a server on an ephemeral port, returning its base URL.
async fn spawn_server(dir: &TempDir) -> String {
    let config = ServerConfig {
        db_path: dir.path().join("gallery.db"),
        storage_limit: 1024 * 1024,
        ..ServerConfig::default()
    };
    let state = open_state(&config).unwrap();
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_vizzy_help() {
        vizzy()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("images"));
    }

    #[test]
    fn test_vizzy_version() {
        vizzy().arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_config_and_database() {
        let dir = TempDir::new().unwrap();

        vizzy()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Gallery database initialized"));

        assert!(dir.path().join(".vizzy/vizzy.toml").exists());
        assert!(dir.path().join(".vizzy/gallery.db").exists());
    }

    #[test]
    fn test_init_is_idempotent_and_keeps_config() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".vizzy")).unwrap();
        fs::write(dir.path().join(".vizzy/vizzy.toml"), "[server]\nport = 4242\n").unwrap();

        vizzy()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Config already exists"));

        let content = fs::read_to_string(dir.path().join(".vizzy/vizzy.toml")).unwrap();
        assert!(content.contains("4242"));
    }

    #[test]
    fn test_init_with_custom_db_path() {
        let dir = TempDir::new().unwrap();

        vizzy()
            .current_dir(dir.path())
            .args(["init", "--db-path", "data/photos.db"])
            .assert()
            .success();

        assert!(dir.path().join("data/photos.db").exists());
        let content = fs::read_to_string(dir.path().join(".vizzy/vizzy.toml")).unwrap();
        assert!(content.contains("data/photos.db"));
    }

    #[test]
    fn test_init_does_not_persist_environment_overrides() {
        let dir = TempDir::new().unwrap();

        vizzy()
            .current_dir(dir.path())
            .env("VIZZY_PORT", "5555")
            .env("VIZZY_ALLOWED_ORIGIN", "http://studio.local")
            .arg("init")
            .assert()
            .success();

        let content = fs::read_to_string(dir.path().join(".vizzy/vizzy.toml")).unwrap();
        assert!(!content.contains("5555"));
        assert!(!content.contains("studio.local"));
        assert!(content.contains("3141"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".vizzy")).unwrap();
        fs::write(dir.path().join(".vizzy/vizzy.toml"), "[server\n").unwrap();

        vizzy()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("vizzy.toml"));
    }

    #[test]
    fn test_reorder_requires_ids() {
        vizzy()
            .args(["images", "reorder", "1"])
            .assert()
            .failure();
    }

    #[test]
    fn test_list_without_server_fails() {
        let dir = TempDir::new().unwrap();
        vizzy()
            .current_dir(dir.path())
            .args(["--server", "http://127.0.0.1:9", "list"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Client and sync against a live server
// =============================================================================

mod live_server {
    use super::*;

    #[tokio::test]
    async fn test_drag_and_commit_round_trip() {
        let dir = TempDir::new().unwrap();
        let url = spawn_server(&dir).await;
        let client = GalleryClient::new(&url);

        let project = client.create_project("DAL-ES-24-117-Lakeside").await.unwrap();
        let mut ids = Vec::new();
        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
            ids.push(client.add_image(project.id, name, 10, None).await.unwrap().id);
        }

        let listed = client.list_images(project.id, &[]).await.unwrap();
        let mut list = OrderedList::new(listed.images);
        assert!(move_onto(&mut list, ids[0], ids[2]));
        assert_eq!(list.ids(), vec![ids[1], ids[2], ids[0], ids[3]]);

        let scope = OrderScope::Images { project_id: project.id };
        let sync = ReorderSync::new(client.clone());
        sync.seed(scope, listed.version);
        let outcome = sync.commit(scope, &list.ids()).await.unwrap();
        assert!(matches!(
            outcome,
            SyncOutcome::Applied(o) if o.updated == 4 && o.total == 4 && o.version == 1
        ));

        let reloaded = client.list_images(project.id, &[]).await.unwrap();
        let stored: Vec<i64> = reloaded.images.iter().map(|i| i.id).collect();
        assert_eq!(stored, list.ids());
        assert_eq!(reloaded.version, 1);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected_by_server() {
        let dir = TempDir::new().unwrap();
        let url = spawn_server(&dir).await;
        let client = GalleryClient::new(&url);

        let a = client.create_project("A").await.unwrap();
        let b = client.create_project("B").await.unwrap();

        client
            .reorder(OrderScope::Projects, &[b.id, a.id], 3)
            .await
            .unwrap();
        let err = client
            .reorder(OrderScope::Projects, &[a.id, b.id], 2)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rejected { status: 409, .. }));

        let listed = client.list_projects().await.unwrap();
        let names: Vec<&str> = listed.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(listed.version, 3);
    }

    #[tokio::test]
    async fn test_bad_batch_surfaces_server_message() {
        let dir = TempDir::new().unwrap();
        let url = spawn_server(&dir).await;
        let client = GalleryClient::new(&url);
        let project = client.create_project("HOU-MS-Spring").await.unwrap();
        let image = client.add_image(project.id, "x.png", 1, None).await.unwrap();

        let err = client
            .reorder(OrderScope::Images { project_id: project.id }, &[image.id, 999], 1)
            .await
            .unwrap_err();
        match err {
            SyncError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("999"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cli_commands_against_server() {
        let dir = TempDir::new().unwrap();
        let url = spawn_server(&dir).await;
        let client = GalleryClient::new(&url);
        let project = client.create_project("AUS-HS-31-002-Westlake").await.unwrap();
        let first = client.add_image(project.id, "one.jpg", 2048, None).await.unwrap();
        let second = client.add_image(project.id, "two.jpg", 2048, None).await.unwrap();

        let project_id = project.id.to_string();
        let (a, b) = (first.id.to_string(), second.id.to_string());
        let work_dir = dir.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            vizzy()
                .current_dir(&work_dir)
                .args(["--server", &url, "list", "--city", "aus"])
                .assert()
                .success()
                .stdout(predicate::str::contains("Westlake"));

            vizzy()
                .current_dir(&work_dir)
                .args(["--server", &url, "images", "reorder", &project_id, &b, &a])
                .assert()
                .success()
                .stdout(predicate::str::contains("Saved"));

            vizzy()
                .current_dir(&work_dir)
                .args(["--server", &url, "storage"])
                .assert()
                .success()
                .stdout(predicate::str::contains("4 KB of 1 MB"));
        })
        .await
        .unwrap();

        let listed = client.list_images(project.id, &[]).await.unwrap();
        assert_eq!(listed.images[0].id, second.id);
        assert_eq!(listed.images[1].id, first.id);
    }
}
