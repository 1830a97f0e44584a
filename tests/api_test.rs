use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{http::StatusCode, test, web, App};
use reviewboard::api;
use reviewboard::config::{Limits, INDEX_FILE};
use reviewboard::db::ReviewStore;
use reviewboard::models::review::{AverageRating, Review};
use reviewboard::persist::{Persister, Snapshot, SnapshotFiles};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

// Scratch data and static directories plus a store writing into them
struct TestEnv {
    dir: TempDir,
    store: Arc<ReviewStore>,
}

impl TestEnv {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(static_dir.join(INDEX_FILE), "<h1>landing page</h1>").unwrap();
        std::fs::write(static_dir.join("app.css"), "body {}").unwrap();

        let (persister, _writer) = Persister::spawn(files(dir.path()));
        let store = Arc::new(ReviewStore::new(Snapshot::default(), Limits::default(), persister));
        TestEnv { dir, store }
    }

    fn static_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("static")
    }
}

fn files(dir: &Path) -> SnapshotFiles {
    SnapshotFiles::new(dir.join("reviews.json"), dir.join("ips.json"))
}

macro_rules! app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($env.store.clone()))
                .configure(api::configure($env.static_dir(), $env.static_dir().join(INDEX_FILE))),
        )
        .await
    };
}

fn post_review(from: &str, body: Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/reviews")
        .insert_header(("x-forwarded-for", from))
        .set_json(body)
}

#[actix_web::test]
async fn test_submit_then_duplicate() {
    let env = TestEnv::new();
    let app = app!(env);

    let resp = test::call_service(
        &app,
        post_review("203.0.113.5", json!({"rating": 4.567, "text": "Great service!"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["rating"], 4.6);
    assert_eq!(body["text"], "Great service!");
    assert!(body.get("submitterAddress").is_none());

    let resp = test::call_service(
        &app,
        post_review("203.0.113.5", json!({"rating": "nope"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("already"));
}

#[actix_web::test]
async fn test_validation_errors() {
    let env = TestEnv::new();
    let app = app!(env);

    let resp = test::call_service(&app, post_review("198.51.100.1", json!({"rating": 7, "text": "x"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Rating must be a number between 0 and 5");

    let resp = test::call_service(&app, post_review("198.51.100.2", json!({"rating": 3, "text": "   "})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Review text"));

    let resp = test::call_service(&app, post_review("198.51.100.3", json!({"rating": true, "text": "ok"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let reviews: Vec<Review> =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/reviews").to_request()).await;
    assert!(reviews.is_empty());
}

#[actix_web::test]
async fn test_malformed_body() {
    let env = TestEnv::new();
    let app = app!(env);

    let req = test::TestRequest::post()
        .uri("/reviews")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-forwarded-for", "198.51.100.4"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Malformed payload"));
}

#[actix_web::test]
async fn test_markup_is_stripped() {
    let env = TestEnv::new();
    let app = app!(env);

    let review: Review = test::call_and_read_body_json(
        &app,
        post_review(
            "198.51.100.5",
            json!({"rating": 5, "text": "<script>alert(1)</script>hello", "name": "<b>Bo</b>"}),
        ).to_request(),
    )
    .await;
    assert_eq!(review.text, "hello");
    assert_eq!(review.name.as_deref(), Some("Bo"));
}

#[actix_web::test]
async fn test_text_round_trips_as_plain_text() {
    let env = TestEnv::new();
    let app = app!(env);

    let review: Review = test::call_and_read_body_json(
        &app,
        post_review("198.51.100.6", json!({"rating": 4, "text": "Tom & Jerry, 1 < 2"})).to_request(),
    )
    .await;
    assert_eq!(review.text, "Tom & Jerry, 1 < 2");

    let too_long_name = "n".repeat(101);
    let resp = test::call_service(
        &app,
        post_review("198.51.100.7", json!({"rating": 4, "text": "ok", "name": too_long_name})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Name must be at most 100 characters");
}

#[actix_web::test]
async fn test_listing_and_average() {
    let env = TestEnv::new();
    let app = app!(env);

    let average: AverageRating =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/average-rating").to_request()).await;
    assert_eq!(average.average, 0.0);

    for (from, rating, text) in [("10.1.0.1", 2, "first"), ("10.1.0.2", 4, "second"), ("10.1.0.3", 3, "third")] {
        let resp = test::call_service(&app, post_review(from, json!({"rating": rating, "text": text})).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let reviews: Vec<Review> =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/reviews").to_request()).await;
    let texts: Vec<&str> = reviews.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["third", "second", "first"]);

    let average: AverageRating =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/average-rating").to_request()).await;
    assert_eq!(average.average, 3.0);
}

#[actix_web::test]
async fn test_peer_address_is_used_without_forwarding_headers() {
    let env = TestEnv::new();
    let app = app!(env);

    let first = test::TestRequest::post()
        .uri("/reviews")
        .peer_addr("127.0.0.1:50000".parse().unwrap())
        .set_json(json!({"rating": 1, "text": "from loopback"}))
        .to_request();
    assert_eq!(test::call_service(&app, first).await.status(), StatusCode::CREATED);

    let second = test::TestRequest::post()
        .uri("/reviews")
        .peer_addr("[::1]:50001".parse().unwrap())
        .set_json(json!({"rating": 1, "text": "loopback again"}))
        .to_request();
    assert_eq!(test::call_service(&app, second).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_static_assets_and_fallback() {
    let env = TestEnv::new();
    let app = app!(env);

    for uri in ["/", "/some/client/route"] {
        let body = test::call_and_read_body(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(body, "<h1>landing page</h1>", "{uri}");
    }

    let css = test::call_and_read_body(&app, test::TestRequest::get().uri("/app.css").to_request()).await;
    assert_eq!(css, "body {}");
}

#[actix_web::test]
async fn test_submissions_reach_disk() {
    let env = TestEnv::new();
    let app = app!(env);

    let resp = test::call_service(
        &app,
        post_review("192.0.2.44", json!({"rating": 4, "text": "saved"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // ips.json is written after reviews.json, so a ledger entry means both landed
    let mut snapshot = Snapshot::default();
    for _ in 0..100 {
        snapshot = files(env.dir.path()).load().await;
        if !snapshot.ledger.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(snapshot.ledger, vec!["192.0.2.44".to_string()]);
    assert_eq!(snapshot.reviews.len(), 1);
    assert_eq!(snapshot.reviews[0].review.text, "saved");
    assert_eq!(snapshot.reviews[0].submitter_address, "192.0.2.44");
}
