//! End-to-end tests for the conversion endpoints.

use http::StatusCode;
use http_body_util::BodyExt;
use serde_json::json;

use convert_svc::naming::derive_source_id;

use super::test_utils::{list_dir, TestEnv};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let env = TestEnv::new(1);

    for uri in ["/health", "/api/health"] {
        let (status, body) = env.get_json(uri).await;
        assert_eq!(status, 200, "{}", uri);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "convert-svc");
        assert!(body["version"].is_string());
    }
}

// =============================================================================
// Single Conversion
// =============================================================================

#[tokio::test]
async fn test_convert_pdf_with_order() {
    let env = TestEnv::new(3);
    let source = env.upload("contract.pdf", b"%PDF-1.7 contract");
    let sid = derive_source_id(&source, None);

    let (status, body) = env
        .post_json(
            "/api/convert",
            json!({ "file_path": source, "order_id": "20250609-fca939e7" }),
        )
        .await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["success"], true);

    let order_dir = env.converted().join("20250609-fca939e7");
    let expected: Vec<_> = (1..=3)
        .map(|page| order_dir.join(format!("fca939-{}-{}.png", sid, page)))
        .collect();
    let files: Vec<_> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| std::path::PathBuf::from(f.as_str().unwrap()))
        .collect();
    assert_eq!(files, expected);

    // Page order follows the rasterizer's page numbers
    for (i, file) in files.iter().enumerate() {
        let content = std::fs::read(file).unwrap();
        assert!(content.ends_with(format!("#page{}", i + 1).as_bytes()));
    }

    // No temp outputs left behind
    assert!(list_dir(&order_dir).iter().all(|n| !n.starts_with("tmp_")));
    // Original kept by default
    assert!(source.exists());
}

#[tokio::test]
async fn test_convert_is_deterministic_for_same_content() {
    let env = TestEnv::new(1);
    let first = env.upload("a.pdf", b"%PDF same bytes");
    let second = env.upload("b.pdf", b"%PDF same bytes");

    let (_, a) = env
        .post_json("/api/convert", json!({ "file_path": first, "order_id": "o1" }))
        .await;
    let (_, b) = env
        .post_json("/api/convert", json!({ "file_path": second, "order_id": "o1" }))
        .await;

    assert_eq!(a["files"], b["files"]);
}

#[tokio::test]
async fn test_convert_with_explicit_source_id() {
    let env = TestEnv::new(2);
    let source = env.upload("scan.pdf", b"%PDF scan");

    let (status, body) = env
        .post_json(
            "/api/convert",
            json!({ "file_path": source, "order_id": "TEST-ORDER-123", "source_id": "doc42" }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(
        list_dir(&env.converted().join("TEST-ORDER-123")),
        vec!["TEST-ORD-doc42-1.png", "TEST-ORD-doc42-2.png"]
    );
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_convert_image_without_order_uses_output_dir_name() {
    let env = TestEnv::new(1);
    let source = env.upload("photo.JPG", b"\xff\xd8\xff fake jpeg");
    let sid = derive_source_id(&source, None);

    let (status, body) = env
        .post_json("/api/convert", json!({ "file_path": source }))
        .await;

    assert_eq!(status, 200, "{}", body);
    // "converted" is simplified to its first eight characters
    let expected = env.converted().join(format!("converte-{}-1.png", sid));
    assert_eq!(body["files"][0], expected.display().to_string());
    assert_eq!(std::fs::read(&expected).unwrap(), b"\xff\xd8\xff fake jpeg");
}

#[tokio::test]
async fn test_convert_with_explicit_output_dir() {
    let env = TestEnv::new(1);
    let source = env.upload("a.pdf", b"%PDF a");
    let out = env.dir.path().join("elsewhere").join("batch-7");

    let (status, _) = env
        .post_json(
            "/api/convert",
            json!({ "file_path": source, "output_dir": out, "order_id": "ignored-for-dir" }),
        )
        .await;

    assert_eq!(status, 200);
    let names = list_dir(&out);
    assert_eq!(names.len(), 1);
    // Order id still names the file, the directory comes from output_dir
    assert!(names[0].starts_with("ignored-"), "{:?}", names);
}

#[tokio::test]
async fn test_convert_office_document() {
    let env = TestEnv::new(2);
    let source = env.upload("report.docx", b"PK\x03\x04 docx bytes");
    let sid = derive_source_id(&source, None);

    let (status, body) = env
        .post_json("/api/convert", json!({ "file_path": source, "order_id": "o-abcdefgh" }))
        .await;

    assert_eq!(status, 200, "{}", body);
    let order_dir = env.converted().join("o-abcdefgh");
    assert_eq!(
        list_dir(&order_dir),
        vec![
            format!("abcdef-{}-1.png", sid),
            format!("abcdef-{}-2.png", sid),
            "report.pdf".to_string(),
        ]
    );
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_unsupported_extension_rejected_without_writes() {
    let env = TestEnv::new(1);
    let source = env.upload("notes.txt", b"plain text");

    let (status, body) = env
        .post_json("/api/convert", json!({ "file_path": source, "order_id": "o1" }))
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains(".txt"));
    assert!(list_dir(&env.converted()).is_empty());
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let env = TestEnv::new(1);
    let missing = env.uploads().join("missing.pdf");

    let (status, body) = env
        .post_json("/api/convert", json!({ "file_path": missing }))
        .await;

    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "File not found");
}

#[tokio::test]
async fn test_missing_source_checked_before_extension() {
    let env = TestEnv::new(1);
    let missing = env.uploads().join("missing.txt");

    let (status, _) = env
        .post_json("/api/convert", json!({ "file_path": missing }))
        .await;

    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let env = TestEnv::new(1);

    let (status, body) = env.post_raw("/api/convert", "{not json").await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);

    let (status, _) = env.post_json("/api/convert", json!({ "dpi": 300 })).await;
    assert_eq!(status, 400);

    let (status, _) = env.post_raw("/api/convert-batch", r#"{"order_id": "x"}"#).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_tool_failure_is_server_error() {
    let env = TestEnv::with_broken_rasterizer();
    let source = env.upload("corrupt.pdf", b"not really a pdf");

    let (status, body) = env
        .post_json("/api/convert", json!({ "file_path": source }))
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Couldn't find trailer dictionary"));
    assert!(source.exists());
}

// =============================================================================
// Original Deletion
// =============================================================================

#[tokio::test]
async fn test_delete_original_after_success() {
    let env = TestEnv::deleting_originals(1);
    let source = env.upload("a.pdf", b"%PDF a");

    let (status, _) = env
        .post_json("/api/convert", json!({ "file_path": source }))
        .await;

    assert_eq!(status, 200);
    assert!(!source.exists());
}

#[tokio::test]
async fn test_unsupported_file_not_deleted() {
    let env = TestEnv::deleting_originals(1);
    let source = env.upload("a.txt", b"text");

    let (status, _) = env
        .post_json("/api/convert", json!({ "file_path": source }))
        .await;

    assert_eq!(status, 400);
    assert!(source.exists());
}

// =============================================================================
// Batch Conversion
// =============================================================================

#[tokio::test]
async fn test_batch_with_one_missing_file() {
    let env = TestEnv::new(2);
    let a = env.upload("a.pdf", b"%PDF a");
    let c = env.upload("c.png", b"png bytes");
    let missing = env.uploads().join("b.pdf");

    let (status, body) = env
        .post_json(
            "/api/convert-batch",
            json!({
                "order_id": "ORDER-12345678",
                "files": [
                    { "file_path": a },
                    { "file_path": missing },
                    { "file_path": c }
                ]
            }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);

    let results = body["results"].as_object().unwrap();
    assert_eq!(results.len(), 3);
    let succeeded = results
        .values()
        .filter(|r| r["success"] == true)
        .count();
    assert_eq!(succeeded, 2);

    let failed = &results[&missing.display().to_string()];
    assert_eq!(failed["success"], false);
    assert!(failed["error"].is_string());
    assert!(failed.get("files").is_none());

    let pdf_files = results[&a.display().to_string()]["files"].as_array().unwrap();
    assert_eq!(pdf_files.len(), 2);

    let order_dir = env.converted().join("ORDER-12345678");
    let names = list_dir(&order_dir);
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n.starts_with("123456-")), "{:?}", names);
}

#[tokio::test]
async fn test_batch_without_order_uses_batch_id_directory() {
    let env = TestEnv::new(1);
    let a = env.upload("a.pdf", b"%PDF a");

    let (status, body) = env
        .post_json("/api/convert-batch", json!({ "files": [{ "file_path": a }] }))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let batch_id = body["batch_id"].as_str().unwrap();
    let names = list_dir(&env.converted().join(batch_id));
    assert_eq!(names.len(), 1);
}

#[tokio::test]
async fn test_batch_item_order_overrides_batch_order() {
    let env = TestEnv::new(1);
    let a = env.upload("a.pdf", b"%PDF a");

    let (_, body) = env
        .post_json(
            "/api/convert-batch",
            json!({
                "order_id": "batch-aaaaaaaa",
                "files": [{ "file_path": a, "order_id": "item-bbbbbbbb" }]
            }),
        )
        .await;

    assert_eq!(body["success"], true);
    // Directory from the batch, name from the item
    let names = list_dir(&env.converted().join("batch-aaaaaaaa"));
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("bbbbbb-"), "{:?}", names);
}

#[tokio::test]
async fn test_batch_unsupported_item_reported() {
    let env = TestEnv::new(1);
    let txt = env.upload("a.txt", b"text");

    let (status, body) = env
        .post_json("/api/convert-batch", json!({ "files": [{ "file_path": txt }] }))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    let item = &body["results"][txt.display().to_string()];
    assert!(item["error"].as_str().unwrap().contains(".txt"));
}

// =============================================================================
// Static Files
// =============================================================================

#[tokio::test]
async fn test_converted_files_are_served() {
    let env = TestEnv::new(1);
    let source = env.upload("a.png", b"served bytes");

    let (_, body) = env
        .post_json("/api/convert", json!({ "file_path": source, "order_id": "o1" }))
        .await;
    let file = std::path::PathBuf::from(body["files"][0].as_str().unwrap());
    let name = file.file_name().unwrap().to_string_lossy().into_owned();

    let response = env.get(&format!("/files/o1/{}", name)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"served bytes");

    let response = env.get("/files/o1/nope.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
