mod common;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use common::{colored_png_bytes, png_bytes, Harness, PUBLIC_URL_PREFIX};
use meme_creator::{
    domain::{MemeRepository, TemplateRepository},
    models::{output_key, CreateMemeCommand, MemeStatus, NewTemplate, TEMPLATE_KEY_PREFIX},
};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "meme-creator-upload-boundary";

async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn upload(file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"template\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/templates")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn location(headers: &HeaderMap) -> &str {
    headers.get(header::LOCATION).expect("location header").to_str().unwrap()
}

#[tokio::test]
async fn create_meme_answers_created_with_location_and_public_url() {
    let harness = Harness::new();
    let template = harness.add_template("base.png", 200, 200).await;

    let (status, headers, body) = send(
        harness.router(),
        post_json("/memes", json!({ "template_id": template.id, "top": "ONE", "bottom": "TWO" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let id = body["meme"]["id"].as_str().unwrap().to_string();
    assert_eq!(location(&headers), format!("/memes/{id}"));
    assert_eq!(body["meme"]["status"], "created");
    assert_eq!(body["meme"]["public_url"], format!("{PUBLIC_URL_PREFIX}/{id}.png"));
    assert_eq!(harness.enqueued().len(), 1);
}

#[tokio::test]
async fn create_meme_rejects_bodies_that_are_not_json() {
    let harness = Harness::new();

    let request = Request::post("/memes")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("top=ONE"))
        .unwrap();
    let (status, _, body) = send(harness.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::post("/memes")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"template_id\": "))
        .unwrap();
    let (status, _, _) = send(harness.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(harness.router(), post_json("/memes", json!({ "top": "no template" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(harness.router(), post_json("/memes", json!({ "template_id": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(harness.memes.count(), 0);
    assert!(harness.enqueued().is_empty());
}

#[tokio::test]
async fn meme_reads_carry_public_url() {
    let harness = Harness::new();
    let template = harness.add_template("read.png", 100, 100).await;
    let meme = harness
        .pipeline
        .submit(CreateMemeCommand {
            template_id: template.id.to_string(),
            top: "READ".into(),
            bottom: String::new(),
        })
        .await
        .unwrap();

    let (status, _, body) = send(harness.router(), get(&format!("/memes/{}", meme.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meme"]["top"], "READ");
    assert_eq!(body["meme"]["public_url"], format!("{PUBLIC_URL_PREFIX}/{}.png", meme.id));

    let (status, _, body) = send(harness.router(), get("/memes")).await;
    assert_eq!(status, StatusCode::OK);
    let memes = body["memes"].as_array().unwrap();
    assert_eq!(memes.len(), 1);
    assert_eq!(memes[0]["public_url"], format!("{PUBLIC_URL_PREFIX}/{}.png", meme.id));
    assert_eq!(harness.storage.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn meme_lookup_errors() {
    let harness = Harness::new();

    let (status, _, _) = send(harness.router(), get(&format!("/memes/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(harness.router(), get("/memes/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn worker_trigger_renders_and_reports_done() {
    let harness = Harness::new();
    let template = harness.add_template("trigger.png", 240, 160).await;
    let (_, _, created) = send(
        harness.router(),
        post_json("/memes", json!({ "template_id": template.id, "top": "HELLO" })),
    )
    .await;
    let id = created["meme"]["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(harness.router(), post_json("/worker", json!({ "meme_id": id }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meme"]["status"], "done");
    let meme_id = Uuid::parse_str(&id).unwrap();
    assert!(harness.storage.is_public(&output_key(meme_id)));
    let stored = harness.memes.get_by_id(meme_id).await.unwrap().unwrap();
    assert_eq!(stored.status, MemeStatus::Done);
}

#[tokio::test]
async fn worker_trigger_maps_not_found_to_404() {
    let harness = Harness::new();

    let (status, _, _) =
        send(harness.router(), post_json("/worker", json!({ "meme_id": Uuid::new_v4() }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, _, created) = send(
        harness.router(),
        post_json("/memes", json!({ "template_id": Uuid::new_v4(), "top": "DANGLING" })),
    )
    .await;
    let (status, _, _) = send(
        harness.router(),
        post_json("/worker", json!({ "meme_id": created["meme"]["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn worker_trigger_reports_other_failures_as_500() {
    let harness = Harness::new();
    harness.storage.put("templates/broken", b"definitely not an image".to_vec());
    let template = harness
        .templates
        .insert(NewTemplate { filename: "templates/broken".into() })
        .await
        .unwrap();
    let (_, _, created) = send(
        harness.router(),
        post_json("/memes", json!({ "template_id": template.id, "top": "X" })),
    )
    .await;

    let (status, _, body) = send(
        harness.router(),
        post_json("/worker", json!({ "meme_id": created["meme"]["id"] })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn template_upload_answers_created_under_a_generated_key() {
    let harness = Harness::new();
    let data = png_bytes(64, 64);

    let (status, headers, body) = send(harness.router(), upload("grumpy.png", &data)).await;

    assert_eq!(status, StatusCode::CREATED);
    let id = body["template"]["id"].as_str().unwrap().to_string();
    assert_eq!(location(&headers), format!("/templates/{id}"));
    let key = body["template"]["filename"].as_str().unwrap().to_string();
    assert!(key.starts_with(TEMPLATE_KEY_PREFIX));
    assert!(key.ends_with("grumpy.png"));
    assert_eq!(harness.storage.get(&key), Some(data));
    assert!(harness.storage.is_public(&key));

    let (status, _, body) = send(harness.router(), get(&format!("/templates/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["template"]["filename"], key);

    let (status, _, body) = send(harness.router(), get("/templates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["templates"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn template_upload_rejects_bad_input() {
    let harness = Harness::new();

    let (status, _, _) = send(harness.router(), upload("notes.png", b"plain text, not an image")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(harness.router(), upload("../escape.png", &png_bytes(8, 8))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(harness.router(), upload("empty.png", &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(harness.storage.uploads.load(Ordering::SeqCst), 0);
    assert!(harness.templates.list_recent(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn template_upload_enforces_size_limits() {
    let harness = Harness::new();
    let mut oversized = png_bytes(8, 8);
    oversized.resize(4 * 1024, 0);

    let (status, _, _) = send(harness.router_with_template_limit(1024), upload("big.png", &oversized)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let beyond_body_limit = vec![0u8; 128 * 1024];
    let (status, _, _) =
        send(harness.router_with_template_limit(1024), upload("huge.png", &beyond_body_limit)).await;
    assert!(status.is_client_error(), "got {status}");

    assert_eq!(harness.storage.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn template_named_like_a_meme_output_leaves_the_meme_alone() {
    let harness = Harness::new();
    let template = harness.add_template("original.png", 120, 120).await;
    let (_, _, created) = send(
        harness.router(),
        post_json("/memes", json!({ "template_id": template.id, "top": "KEEP" })),
    )
    .await;
    let meme_id = Uuid::parse_str(created["meme"]["id"].as_str().unwrap()).unwrap();
    let (status, _, _) = send(harness.router(), post_json("/worker", json!({ "meme_id": meme_id }))).await;
    assert_eq!(status, StatusCode::OK);
    let published = harness.storage.get(&output_key(meme_id)).unwrap();

    let intruder = colored_png_bytes(120, 120, [255, 0, 0]);
    let (status, _, body) = send(harness.router(), upload(&output_key(meme_id), &intruder)).await;

    assert_eq!(status, StatusCode::CREATED);
    let key = body["template"]["filename"].as_str().unwrap();
    assert_ne!(key, output_key(meme_id));
    assert_eq!(harness.storage.get(&output_key(meme_id)), Some(published.clone()));

    let (status, _, _) = send(harness.router(), post_json("/worker", json!({ "meme_id": meme_id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.storage.get(&output_key(meme_id)), Some(published));
}

#[tokio::test]
async fn reuploading_a_name_keeps_the_first_template_intact() {
    let harness = Harness::new();
    let first_data = colored_png_bytes(32, 32, [0, 0, 255]);
    let second_data = colored_png_bytes(32, 32, [0, 255, 0]);

    let (_, _, first) = send(harness.router(), upload("cat.png", &first_data)).await;
    let (_, _, second) = send(harness.router(), upload("cat.png", &second_data)).await;

    let first_key = first["template"]["filename"].as_str().unwrap();
    let second_key = second["template"]["filename"].as_str().unwrap();
    assert_ne!(first_key, second_key);
    assert_eq!(harness.storage.get(first_key), Some(first_data));
    assert_eq!(harness.storage.get(second_key), Some(second_data));
}
