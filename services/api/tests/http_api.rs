//! End-to-end tests of the HTTP surface, driving the router in-process.

use api_lib::{
    adapters::MemoryAdapter,
    web::{self, ApiDoc, AppState},
};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use utoipa::OpenApi;

const NOW: i64 = 1_500_000_000;
const YEAR: i64 = 31_557_600;

// ============================================================================
// Test Helpers
// ============================================================================

fn app() -> Router {
    let state = AppState {
        store: Arc::new(MemoryAdapter::new()),
        reference_time: Some(NOW),
    };
    web::router(Arc::new(state))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map(|v| v.to_string()).unwrap_or_default();
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

async fn post_raw(app: &Router, uri: &str, body: &str) -> StatusCode {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

/// Sends a raw body and also reports the response content type.
async fn exchange(
    app: &Router,
    method: Method,
    uri: &str,
    body: String,
) -> (StatusCode, Option<HeaderValue>, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, content_type, json)
}

fn user(id: u32, gender: &str, age: i64) -> Value {
    json!({
        "id": id,
        "email": format!("user{id}@example.com"),
        "first_name": "Anna",
        "last_name": "Smith",
        "gender": gender,
        "birth_date": NOW - age * YEAR - 1000,
    })
}

/// Location 1 with visits (mark 4 @ 1000 by user 1) and (mark 2 @ 2000 by user 2).
async fn seeded() -> Router {
    let app = app();
    let location = json!({"id": 1, "place": "P", "country": "C", "city": "Town", "distance": 10});
    assert_eq!(post(&app, "/locations/new", location).await.0, StatusCode::OK);
    assert_eq!(post(&app, "/users/new", user(1, "m", 20)).await.0, StatusCode::OK);
    assert_eq!(post(&app, "/users/new", user(2, "f", 40)).await.0, StatusCode::OK);
    for visit in [
        json!({"id": 1, "location": 1, "user": 1, "visited_at": 1000, "mark": 4}),
        json!({"id": 2, "location": 1, "user": 2, "visited_at": 2000, "mark": 2}),
    ] {
        assert_eq!(post(&app, "/visits/new", visit).await.0, StatusCode::OK);
    }
    app
}

fn avg_of(body: &Value) -> f64 {
    body["avg"].as_f64().unwrap()
}

// ============================================================================
// Entity CRUD
// ============================================================================

#[tokio::test]
async fn test_create_then_read_round_trip() {
    let app = app();
    let created = user(5, "f", 30);
    let (status, body) = post(&app, "/users/new", created.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = get(&app, "/users/5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);
}

#[tokio::test]
async fn test_unknown_entities_are_not_found() {
    let app = app();
    for uri in ["/users/1", "/locations/1", "/visits/1", "/visits/abc", "/nowhere"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body, json!({}), "{uri}");
    }
    assert_eq!(get(&app, "/users/new").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_validation_failures() {
    let app = seeded().await;

    let bad_mark = json!({"id": 9, "location": 1, "user": 1, "visited_at": 5, "mark": 6});
    let (status, body) = post(&app, "/visits/new", bad_mark).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({}));

    let duplicate = json!({"id": 1, "location": 1, "user": 1, "visited_at": 5, "mark": 1});
    assert_eq!(post(&app, "/visits/new", duplicate).await.0, StatusCode::BAD_REQUEST);

    let missing_field = json!({"id": 7, "email": "x@y.z", "first_name": "A", "last_name": "B"});
    assert_eq!(post(&app, "/users/new", missing_field).await.0, StatusCode::BAD_REQUEST);

    let bad_gender = json!({"id": 7, "email": "x@y.z", "first_name": "A", "last_name": "B", "gender": "x", "birth_date": 0});
    assert_eq!(post(&app, "/users/new", bad_gender).await.0, StatusCode::BAD_REQUEST);

    assert_eq!(post_raw(&app, "/locations/new", "{not json").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_array_bodies_are_rejected() {
    let app = seeded().await;
    for uri in ["/users/1", "/locations/1", "/visits/1", "/users/new", "/visits/new"] {
        let (status, body) = post(&app, uri, json!([])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({}), "{uri}");
        assert_eq!(post(&app, uri, json!(["x"])).await.0, StatusCode::BAD_REQUEST, "{uri}");
    }

    assert_eq!(
        post(&app, "/users/1", json!(["evil@x"])).await.0,
        StatusCode::BAD_REQUEST
    );
    let (_, stored) = get(&app, "/users/1").await;
    assert_eq!(stored["email"], json!("user1@example.com"));

    assert_eq!(
        post(&app, "/visits/new", json!([5, 1, 1, 100, 3])).await.0,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(get(&app, "/visits/5").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_undecodable_id_is_json_not_found() {
    let app = seeded().await;
    for (method, uri) in [
        (Method::GET, "/users/%FF"),
        (Method::POST, "/visits/%FF"),
        (Method::GET, "/locations/%FF/avg"),
        (Method::GET, "/users/%FF/visits"),
    ] {
        let (status, content_type, body) = exchange(&app, method, uri, "{}".to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(content_type.unwrap(), "application/json", "{uri}");
        assert_eq!(body, json!({}), "{uri}");
    }
}

#[tokio::test]
async fn test_oversized_body_is_bad_request() {
    let app = seeded().await;
    let huge = format!(r#"{{"email": "{}"}}"#, "a".repeat(3 * 1024 * 1024));

    let (status, content_type, body) = exchange(&app, Method::POST, "/users/1", huge.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.unwrap(), "application/json");
    assert_eq!(body, json!({}));

    let (status, _, _) = exchange(&app, Method::POST, "/users/new", huge.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = exchange(&app, Method::POST, "/users/77", huge).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_update_changes_only_present_fields() {
    let app = seeded().await;

    let (status, body) = post(&app, "/visits/1", json!({"mark": 3})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (_, visit) = get(&app, "/visits/1").await;
    assert_eq!(
        visit,
        json!({"id": 1, "location": 1, "user": 1, "visited_at": 1000, "mark": 3})
    );
}

#[tokio::test]
async fn test_null_in_update_is_rejected() {
    let app = seeded().await;

    let (status, body) = post(&app, "/visits/1", json!({"mark": null})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({}));

    assert_eq!(
        post(&app, "/users/1", json!({"first_name": null})).await.0,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        post(&app, "/locations/1", json!({"distance": null})).await.0,
        StatusCode::BAD_REQUEST
    );

    let (_, visit) = get(&app, "/visits/1").await;
    assert_eq!(visit["mark"], json!(4));
}

#[tokio::test]
async fn test_update_of_unknown_id_is_not_found_before_validation() {
    let app = seeded().await;
    assert_eq!(
        post(&app, "/visits/77", json!({"mark": null})).await.0,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        post(&app, "/users/77", json!({"email": "a@b.c"})).await.0,
        StatusCode::NOT_FOUND
    );
}

// ============================================================================
// Location Average
// ============================================================================

#[tokio::test]
async fn test_location_average_examples() {
    let app = seeded().await;

    let (status, body) = get(&app, "/locations/1/avg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(avg_of(&body), 3.0);

    let (_, body) = get(&app, "/locations/1/avg?fromDate=1500").await;
    assert_eq!(avg_of(&body), 2.0);

    let (_, body) = get(&app, "/locations/1/avg?toDate=1000").await;
    assert_eq!(avg_of(&body), 4.0);

    let (_, body) = get(&app, "/locations/1/avg?fromDate=5000").await;
    assert_eq!(avg_of(&body), 0.0);
}

#[tokio::test]
async fn test_location_average_user_filters() {
    let app = seeded().await;

    let (_, body) = get(&app, "/locations/1/avg?gender=f").await;
    assert_eq!(avg_of(&body), 2.0);

    let (_, body) = get(&app, "/locations/1/avg?fromAge=30").await;
    assert_eq!(avg_of(&body), 2.0);

    let (_, body) = get(&app, "/locations/1/avg?toAge=30&gender=m").await;
    assert_eq!(avg_of(&body), 4.0);
}

#[tokio::test]
async fn test_location_average_errors() {
    let app = seeded().await;

    let (status, body) = get(&app, "/locations/9/avg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({}));

    for uri in [
        "/locations/1/avg?gender=x",
        "/locations/1/avg?fromDate=abc",
        "/locations/1/avg?toAge=",
        "/locations/9/avg?fromAge=old",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({}), "{uri}");
    }

    assert_eq!(
        post(&app, "/locations/1/avg", json!({})).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_moving_a_visit_updates_both_averages() {
    let app = seeded().await;
    let other = json!({"id": 2, "place": "Q", "country": "D", "city": "Village", "distance": 3});
    assert_eq!(post(&app, "/locations/new", other).await.0, StatusCode::OK);

    assert_eq!(
        post(&app, "/visits/2", json!({"location": 2})).await.0,
        StatusCode::OK
    );

    assert_eq!(avg_of(&get(&app, "/locations/1/avg").await.1), 4.0);
    assert_eq!(avg_of(&get(&app, "/locations/2/avg").await.1), 2.0);
}

// ============================================================================
// User Visits
// ============================================================================

#[tokio::test]
async fn test_user_visits_are_sorted_and_filtered() {
    let app = seeded().await;
    let far = json!({"id": 3, "place": "Far Away", "country": "Chile", "city": "Santiago", "distance": 900});
    assert_eq!(post(&app, "/locations/new", far).await.0, StatusCode::OK);
    for visit in [
        json!({"id": 10, "location": 3, "user": 1, "visited_at": 500, "mark": 5}),
        json!({"id": 11, "location": 1, "user": 1, "visited_at": 3000, "mark": 1}),
    ] {
        assert_eq!(post(&app, "/visits/new", visit).await.0, StatusCode::OK);
    }

    let (status, body) = get(&app, "/users/1/visits").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"visits": [
            {"mark": 5, "visited_at": 500, "place": "Far Away"},
            {"mark": 4, "visited_at": 1000, "place": "P"},
            {"mark": 1, "visited_at": 3000, "place": "P"},
        ]})
    );

    let (_, body) = get(&app, "/users/1/visits?country=Chile").await;
    assert_eq!(body["visits"].as_array().unwrap().len(), 1);

    let (_, body) = get(&app, "/users/1/visits?toDistance=900").await;
    assert_eq!(body["visits"].as_array().unwrap().len(), 2);

    let (_, body) = get(&app, "/users/1/visits?fromDate=1000&toDate=3000").await;
    assert_eq!(body["visits"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_visits_errors_and_empty_result() {
    let app = seeded().await;

    assert_eq!(get(&app, "/users/42/visits").await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        get(&app, "/users/1/visits?toDistance=near").await.0,
        StatusCode::BAD_REQUEST
    );
    for bound in ["-1", "0"] {
        let (status, body) = get(&app, &format!("/users/1/visits?toDistance={bound}")).await;
        assert_eq!(status, StatusCode::OK, "{bound}");
        assert_eq!(body, json!({"visits": []}), "{bound}");
    }

    let lonely = user(3, "m", 50);
    assert_eq!(post(&app, "/users/new", lonely).await.0, StatusCode::OK);
    let (status, body) = get(&app, "/users/3/visits").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"visits": []}));
}

#[tokio::test]
async fn test_user_visits_follow_reassigned_visit() {
    let app = seeded().await;
    assert_eq!(
        post(&app, "/visits/1", json!({"user": 2})).await.0,
        StatusCode::OK
    );

    let (_, first) = get(&app, "/users/1/visits").await;
    assert_eq!(first, json!({"visits": []}));

    let (_, second) = get(&app, "/users/2/visits").await;
    let times: Vec<i64> = second["visits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["visited_at"].as_i64().unwrap())
        .collect();
    assert_eq!(times, vec![1000, 2000]);
}

// ============================================================================
// OpenAPI Document
// ============================================================================

#[test]
fn test_openapi_document_describes_patch_bodies_as_optional() {
    let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
    for path in ["/users/{id}", "/locations/{id}/avg", "/users/{id}/visits", "/visits/new"] {
        assert!(doc["paths"].get(path).is_some(), "{path}");
    }
    for schema in ["UserPatchBody", "LocationPatchBody", "VisitPatchBody"] {
        let body = &doc["components"]["schemas"][schema];
        assert!(body["properties"].is_object(), "{schema}");
        assert!(body.get("required").is_none(), "{schema}");
    }
}
