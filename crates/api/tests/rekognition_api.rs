mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use mediatag_core::media::MediaKind;
use mediatag_core::status::RecognitionStatus;
use mediatag_pipeline::testing::media;
use serde_json::json;

use common::{build_test_app, post_json, send};

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_collection_returns_arn() {
    let (app, h) = build_test_app();

    let (status, json) = post_json(
        &app,
        "/api/rekognition/createCollection",
        json!({ "collectionId": "event-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["collectionArn"]
        .as_str()
        .unwrap()
        .ends_with("collection/event-1"));
    assert_eq!(json["statusCode"], 200);
    assert_eq!(h.recognition.collection_count(), 1);
}

#[tokio::test]
async fn create_collection_requires_collection_id() {
    let (app, h) = build_test_app();

    let (status, json) =
        post_json(&app, "/api/rekognition/createCollection", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "collectionId is required");
    assert_eq!(h.recognition.collection_count(), 0);
}

#[tokio::test]
async fn create_collection_rejects_invalid_characters() {
    let (app, h) = build_test_app();

    let (status, json) = post_json(
        &app,
        "/api/rekognition/createCollection",
        json!({ "collectionId": "my collection!" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(h.recognition.collection_count(), 0);
}

#[tokio::test]
async fn create_existing_collection_is_a_conflict() {
    let (app, h) = build_test_app();
    h.recognition.set_face_count("event-1", 3);

    let (status, json) = post_json(
        &app,
        "/api/rekognition/createCollection",
        json!({ "collectionId": "event-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (app, _h) = build_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/rekognition/createCollection")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn collection_stats_report_face_count() {
    let (app, h) = build_test_app();
    h.recognition.set_face_count("event-1", 7);

    let (status, json) = post_json(
        &app,
        "/api/rekognition/getCollectionStats",
        json!({ "collectionId": "event-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["faceCount"], 7);
}

#[tokio::test]
async fn collection_stats_for_unknown_collection_is_404() {
    let (app, _h) = build_test_app();

    let (status, json) = post_json(
        &app,
        "/api/rekognition/getCollectionStats",
        json!({ "collectionId": "missing" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Collection with id missing not found");
}

#[tokio::test]
async fn reset_collection_drops_and_recreates() {
    let (app, h) = build_test_app();
    h.recognition.set_face_count("event-1", 12);

    let (status, json) = post_json(
        &app,
        "/api/rekognition/resetCollection",
        json!({ "collectionId": "event-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);

    let (_, stats) = post_json(
        &app,
        "/api/rekognition/getCollectionStats",
        json!({ "collectionId": "event-1" }),
    )
    .await;
    assert_eq!(stats["faceCount"], 0);
}

#[tokio::test]
async fn reset_of_missing_collection_still_creates_it() {
    let (app, h) = build_test_app();

    let (status, json) = post_json(
        &app,
        "/api/rekognition/resetCollection",
        json!({ "collectionId": "fresh" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], false);
    assert_eq!(h.recognition.collection_count(), 1);
}

#[tokio::test]
async fn upstream_failures_surface_as_502() {
    let (app, h) = build_test_app();
    h.recognition.fail_with("ThrottlingException");

    let (status, json) = post_json(
        &app,
        "/api/rekognition/createCollection",
        json!({ "collectionId": "event-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    assert_eq!(json["error"], "Rekognition error: ThrottlingException");
}

// ---------------------------------------------------------------------------
// Video face search
// ---------------------------------------------------------------------------

fn search_body() -> serde_json::Value {
    json!({
        "bucketName": "media",
        "videoName": "events/e-1/video/v-1.mp4",
        "collectionId": "event-1",
    })
}

#[tokio::test]
async fn search_faces_in_video_returns_job_id() {
    let (app, h) = build_test_app();

    let (status, json) =
        post_json(&app, "/api/rekognition/searchFacesInVideo", search_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["jobId"], "job-1");

    let jobs = h.recognition.started_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].video_name, "events/e-1/video/v-1.mp4");
    assert!(jobs[0].client_request_token.is_some());
}

#[tokio::test]
async fn search_faces_in_video_marks_target_processing() {
    let (app, h) = build_test_app();
    h.store
        .insert(media(MediaKind::Video, "v-1", RecognitionStatus::Uploaded));

    let mut body = search_body();
    body["videoId"] = json!("v-1");
    let (status, json) = post_json(&app, "/api/rekognition/searchFacesInVideo", body).await;

    assert_eq!(status, StatusCode::OK);
    let video = h.store.get(MediaKind::Video, "v-1").unwrap();
    assert_eq!(video.status, RecognitionStatus::Processing);
    assert_eq!(video.recognition_job_id.as_deref(), json["jobId"].as_str());
}

#[tokio::test]
async fn search_faces_in_video_with_unknown_target_is_404() {
    let (app, h) = build_test_app();

    let mut body = search_body();
    body["videoChunkId"] = json!("c-404");
    let (status, json) = post_json(&app, "/api/rekognition/searchFacesInVideo", body).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(h.recognition.started_jobs().is_empty());
}

#[tokio::test]
async fn search_faces_in_video_requires_video_name() {
    let (app, h) = build_test_app();

    let (status, json) = post_json(
        &app,
        "/api/rekognition/searchFacesInVideo",
        json!({ "bucketName": "media", "collectionId": "event-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "videoName is required");
    assert!(h.recognition.started_jobs().is_empty());
}
