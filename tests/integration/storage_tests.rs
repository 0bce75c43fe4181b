//! End-to-end tests for rename and file lookup on the converted tree.

use serde_json::json;

use super::test_utils::{list_dir, TestEnv};

/// Convert a PDF under `order` and return the artifact names.
async fn convert_pages(env: &TestEnv, order: &str) -> Vec<String> {
    let source = env.upload("doc.pdf", b"%PDF doc");
    let (status, body) = env
        .post_json("/api/convert", json!({ "file_path": source, "order_id": order }))
        .await;
    assert_eq!(status, 200, "{}", body);

    body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| {
            std::path::Path::new(f.as_str().unwrap())
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

// =============================================================================
// Rename
// =============================================================================

#[tokio::test]
async fn test_rename_returns_relative_path_and_url() {
    let env = TestEnv::new(1);
    let pages = convert_pages(&env, "o1").await;

    let (status, body) = env
        .post_json(
            "/api/rename",
            json!({ "original_path": format!("o1/{}", pages[0]), "new_name": "cover.png" }),
        )
        .await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["new_path"], "o1/cover.png");
    assert_eq!(body["new_url"], "http://localhost:9090/files/o1/cover.png");
    assert_eq!(list_dir(&env.converted().join("o1")), vec!["cover.png"]);
}

#[tokio::test]
async fn test_rename_overwrites_existing_file() {
    let env = TestEnv::new(2);
    let pages = convert_pages(&env, "o1").await;
    let order_dir = env.converted().join("o1");
    let second = std::fs::read(order_dir.join(&pages[1])).unwrap();

    let (status, _) = env
        .post_json(
            "/api/rename",
            json!({ "original_path": format!("o1/{}", pages[1]), "new_name": pages[0] }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(list_dir(&order_dir), vec![pages[0].clone()]);
    assert_eq!(std::fs::read(order_dir.join(&pages[0])).unwrap(), second);
}

#[tokio::test]
async fn test_rename_missing_file() {
    let env = TestEnv::new(1);

    let (status, body) = env
        .post_json(
            "/api/rename",
            json!({ "original_path": "o1/missing.png", "new_name": "x.png" }),
        )
        .await;

    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_rename_rejects_path_in_new_name() {
    let env = TestEnv::new(1);
    let pages = convert_pages(&env, "o1").await;

    for new_name in ["../escape.png", "sub/x.png", ".."] {
        let (status, _) = env
            .post_json(
                "/api/rename",
                json!({ "original_path": format!("o1/{}", pages[0]), "new_name": new_name }),
            )
            .await;
        assert_eq!(status, 400, "{}", new_name);
    }
    assert_eq!(list_dir(&env.converted().join("o1")), pages);
}

#[tokio::test]
async fn test_rename_rejects_absolute_path_outside_converted_tree() {
    let env = TestEnv::new(1);
    let outside = env.dir.path().join("outside.png");
    std::fs::write(&outside, b"not converted").unwrap();

    let (status, body) = env
        .post_json(
            "/api/rename",
            json!({ "original_path": outside, "new_name": "stolen.png" }),
        )
        .await;

    assert_eq!(status, 400, "{}", body);
    assert_eq!(body["success"], false);
    assert!(outside.is_file());
    assert!(!env.dir.path().join("stolen.png").exists());
}

#[tokio::test]
async fn test_rename_requires_fields() {
    let env = TestEnv::new(1);
    let (status, _) = env
        .post_json("/api/rename", json!({ "original_path": "o1/a.png" }))
        .await;
    assert_eq!(status, 400);
}

// =============================================================================
// File Info
// =============================================================================

#[tokio::test]
async fn test_file_info_top_level() {
    let env = TestEnv::new(1);
    std::fs::write(env.converted().join("flat.png"), b"123456").unwrap();

    let (status, body) = env.get_json("/file-info/flat.png").await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "flat.png");
    assert_eq!(body["url"], "http://localhost:9090/files/flat.png");
    assert_eq!(body["mime_type"], "image/png");
    assert_eq!(body["size"], 6);
}

#[tokio::test]
async fn test_file_info_finds_nested_file() {
    let env = TestEnv::new(1);
    let pages = convert_pages(&env, "o1").await;

    let (status, body) = env.get_json(&format!("/file-info/{}", pages[0])).await;

    assert_eq!(status, 200);
    assert_eq!(
        body["url"],
        format!("http://localhost:9090/files/o1/{}", pages[0])
    );
}

#[tokio::test]
async fn test_file_info_not_found() {
    let env = TestEnv::new(1);
    let (status, body) = env.get_json("/file-info/nothing.png").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_file_info_directory_is_bad_request() {
    let env = TestEnv::new(1);
    std::fs::create_dir_all(env.converted().join("o1")).unwrap();

    let (status, _) = env.get_json("/file-info/o1").await;
    assert_eq!(status, 400);
}
