mod common;

use axum::http::StatusCode;
use mediatag_core::media::MediaKind;
use mediatag_core::status::RecognitionStatus;
use mediatag_pipeline::testing::media;

use common::{build_test_app, get};

#[tokio::test]
async fn status_summary_counts_every_status() {
    let (app, h) = build_test_app();
    h.store
        .insert(media(MediaKind::Photo, "p-1", RecognitionStatus::Uploaded));
    h.store
        .insert(media(MediaKind::Photo, "p-2", RecognitionStatus::Uploaded));
    h.store
        .insert(media(MediaKind::Photo, "p-3", RecognitionStatus::Completed));
    let mut other_event = media(MediaKind::Photo, "p-4", RecognitionStatus::Failed);
    other_event.event_id = "e-2".into();
    h.store.insert(other_event);

    let (status, json) = get(&app, "/api/media/status?kind=photo&userId=u-1&eventId=e-1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["kind"], "photo");
    assert_eq!(json["total"], 3);

    let counts: Vec<(String, i64)> = json["counts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["status"].as_str().unwrap().to_string(),
                c["count"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        counts,
        vec![
            ("UPLOADED".to_string(), 2),
            ("PENDING".to_string(), 0),
            ("PROCESSING".to_string(), 0),
            ("COMPLETED".to_string(), 1),
            ("FAILED".to_string(), 0),
        ]
    );
}

#[tokio::test]
async fn status_summary_requires_kind() {
    let (app, _h) = build_test_app();

    let (status, json) = get(&app, "/api/media/status?userId=u-1&eventId=e-1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "kind is required");
}

#[tokio::test]
async fn status_summary_rejects_unknown_kind() {
    let (app, _h) = build_test_app();

    let (status, json) = get(&app, "/api/media/status?kind=audio&userId=u-1&eventId=e-1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}
