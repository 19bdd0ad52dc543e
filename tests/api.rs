mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{fixture, Fixture};
use showtime_inventory::controllers;

fn router(f: &Fixture) -> Router {
    controllers::app(f.state.clone())
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    holder: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(holder) = holder {
        builder = builder.header("x-holder-id", holder);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn create_body(f: &Fixture, start: &str, end: &str) -> Value {
    json!({
        "movie_id": f.movie.id,
        "theater_id": f.theater.id,
        "screen": "Screen 1",
        "start_time": start,
        "end_time": end,
        "price": 9.75,
    })
}

async fn create_one(f: &Fixture) -> String {
    let (status, body) = send(
        router(f),
        Method::POST,
        "/api/showtimes",
        None,
        Some(create_body(f, "2030-06-01T18:00:00Z", "2030-06-01T20:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["showtimes"][0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_then_conflict() {
    let f = fixture();
    let mut body = create_body(&f, "2030-06-01T18:00:00Z", "2030-06-01T20:00:00Z");
    body["end_date"] = json!("2030-06-03T00:00:00Z");

    let (status, created) = send(router(&f), Method::POST, "/api/showtimes", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["count"], 3);

    let (status, conflict) = send(
        router(&f),
        Method::POST,
        "/api/showtimes",
        None,
        Some(create_body(&f, "2030-06-02T19:00:00Z", "2030-06-02T21:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["status"], "fail");
    assert_eq!(conflict["code"], "CONFLICT");
    assert_eq!(f.records.showtime_count().unwrap(), 3);
}

#[tokio::test]
async fn unknown_movie_is_404_and_bad_interval_is_400() {
    let f = fixture();
    let mut body = create_body(&f, "2030-06-01T18:00:00Z", "2030-06-01T20:00:00Z");
    body["movie_id"] = json!(uuid::Uuid::new_v4());
    let (status, _) = send(router(&f), Method::POST, "/api/showtimes", None, Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = create_body(&f, "2030-06-01T20:00:00Z", "2030-06-01T18:00:00Z");
    let (status, err) = send(router(&f), Method::POST, "/api/showtimes", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn showtime_is_returned_with_realtime_status() {
    let f = fixture();
    let id = create_one(&f).await;

    let (status, body) = send(router(&f), Method::GET, &format!("/api/showtimes/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let show = &body["data"]["showtime"];
    assert_eq!(show["id"], id.as_str());
    assert_eq!(show["screen"], "Screen 1");
    assert_eq!(show["realtime_status"]["status"], "upcoming");
}

#[tokio::test]
async fn listing_filters_by_status() {
    let f = fixture();
    create_one(&f).await;

    let (status, body) = send(router(&f), Method::GET, "/api/showtimes?status=upcoming", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 1);

    let (_, body) = send(router(&f), Method::GET, "/api/showtimes?status=live", None, None).await;
    assert_eq!(body["results"], 0);

    let (status, _) = send(router(&f), Method::GET, "/api/showtimes?status=bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(router(&f), Method::GET, "/api/showtimes/upcoming", None, None).await;
    assert_eq!(body["results"], 1);
    let (_, body) = send(router(&f), Method::GET, "/api/showtimes/past", None, None).await;
    assert_eq!(body["results"], 0);
}

#[tokio::test]
async fn seat_map_and_holds() {
    let f = fixture();
    let id = create_one(&f).await;
    let holds = format!("/api/showtimes/{id}/holds");

    let (status, body) = send(router(&f), Method::POST, &holds, Some("session-a"), Some(json!({"row": 0, "seat": 1}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["expires_in_seconds"], 600);

    let (status, body) = send(router(&f), Method::POST, &holds, Some("session-b"), Some(json!({"row": 0, "seat": 1}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_HELD");

    let (status, body) = send(router(&f), Method::GET, &format!("/api/showtimes/{id}/seats?holds=true"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["grid"][0][1]["status"], "held");
    assert_eq!(body["data"]["grid"][0][0]["status"], "available");

    let (status, body) = send(
        router(&f),
        Method::POST,
        &format!("{holds}/verify"),
        Some("session-a"),
        Some(json!({"seats": [{"row": 0, "seat": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["verified"], true);

    let (status, _) = send(router(&f), Method::DELETE, &holds, Some("session-a"), Some(json!({"row": 0, "seat": 1}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(router(&f), Method::POST, &holds, Some("session-b"), Some(json!({"row": 0, "seat": 1}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn holds_require_holder_header_and_a_real_seat() {
    let f = fixture();
    let id = create_one(&f).await;
    let holds = format!("/api/showtimes/{id}/holds");

    let (status, body) = send(router(&f), Method::POST, &holds, None, Some(json!({"row": 0, "seat": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(router(&f), Method::POST, &holds, Some("session-a"), Some(json!({"row": 4, "seat": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn theater_delete_cascades_through_the_api() {
    let f = fixture();
    let id = create_one(&f).await;

    let (status, body) = send(router(&f), Method::DELETE, &format!("/api/theaters/{}", f.theater.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["showtimes_removed"], 1);

    let (status, _) = send(router(&f), Method::GET, &format!("/api/showtimes/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(router(&f), Method::GET, &format!("/api/showtimes/{id}/seats"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_store_outage() {
    let f = fixture();
    let (status, body) = send(router(&f), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], "ok");

    f.records.set_unavailable(true);
    let (status, body) = send(router(&f), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["records"], "unavailable");
    assert_eq!(body["holds"], "ok");

    let (status, body) = send(router(&f), Method::GET, "/api/showtimes", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn malformed_requests_get_the_error_body() {
    let f = fixture();

    let mut body = create_body(&f, "2030-06-01T18:00:00Z", "2030-06-01T20:00:00Z");
    body.as_object_mut().unwrap().remove("price");
    let (status, err) = send(router(&f), Method::POST, "/api/showtimes", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["status"], "fail");
    assert_eq!(err["code"], "VALIDATION_ERROR");
    assert!(err["message"].as_str().unwrap().contains("price"), "{err}");

    let (status, err) = send(router(&f), Method::GET, "/api/showtimes/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, err) = send(router(&f), Method::GET, "/api/showtimes?movie=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let id = create_one(&f).await;
    let (status, err) = send(
        router(&f),
        Method::POST,
        &format!("/api/showtimes/{id}/holds"),
        Some("session-a"),
        Some(json!({"row": "front"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn listings_are_paged() {
    let f = fixture();
    let mut body = create_body(&f, "2030-06-01T18:00:00Z", "2030-06-01T20:00:00Z");
    body["end_date"] = json!("2030-06-05T00:00:00Z");
    let (status, _) = send(router(&f), Method::POST, "/api/showtimes", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(router(&f), Method::GET, "/api/showtimes?page=2&pageSize=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["page_size"], 2);
    let first = body["data"]["showtimes"][0]["start_time"].as_str().unwrap();
    assert!(first.starts_with("2030-06-03T18:00:00"), "{first}");

    let (_, body) = send(router(&f), Method::GET, "/api/showtimes/upcoming?page=3&pageSize=2", None, None).await;
    assert_eq!(body["results"], 1);

    let (_, body) = send(router(&f), Method::GET, "/api/showtimes?pageSize=1000", None, None).await;
    assert_eq!(body["page_size"], 100);
    assert_eq!(body["results"], 5);
}
