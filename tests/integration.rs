use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use shoot_dispatch::api::rest::router;
use shoot_dispatch::config::Config;
use shoot_dispatch::geo::StraightLineProvider;
use shoot_dispatch::state::AppState;
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN: &str = "00000000-0000-0000-0000-00000000000a";
const PHOTOGRAPHER: &str = "00000000-0000-0000-0000-00000000000b";
const OTHER_PHOTOGRAPHER: &str = "00000000-0000-0000-0000-00000000000c";

fn setup() -> axum::Router {
    let state = AppState::new(
        Config::default(),
        Arc::new(StraightLineProvider::default()),
        None,
    );
    router(Arc::new(state))
}

fn request(method: &str, uri: &str, actor: Option<(&str, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user_id, role)) = actor {
        builder = builder
            .header("x-user-id", user_id)
            .header("x-user-role", role);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn as_admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    request(method, uri, Some((ADMIN, "admin")), body)
}

fn as_photographer(user_id: &str, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    request(method, uri, Some((user_id, "photographer")), body)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

fn shoot_date() -> String {
    (Utc::now().date_naive() + Duration::days(7)).to_string()
}

async fn seed_photographer(app: &axum::Router, id: &str, lat: f64, lng: f64) {
    let response = send(
        app,
        as_admin(
            "POST",
            "/photographers",
            Some(json!({
                "id": id,
                "name": "Mara Lens",
                "email": "mara@example.com",
                "city": "Berlin",
                "home": { "lat": lat, "lng": lng },
                "service_radius_km": 40.0
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn seed_order(app: &axum::Router, coordinate: Option<Value>) -> String {
    let mut address = json!({
        "street": "Torstrasse",
        "number": "12",
        "postal_code": "10119",
        "city": "Berlin",
        "country": "Germany"
    });
    if let Some(coordinate) = coordinate {
        address["coordinate"] = coordinate;
    }

    let response = send(
        app,
        as_admin(
            "POST",
            "/orders",
            Some(json!({
                "total_amount": 299.0,
                "items": [{
                    "quantity": 1,
                    "unit_price": 299.0,
                    "total_price": 299.0,
                    "notes": "{\"tier\":\"standard\",\"photo_count\":15}"
                }],
                "shoot_address": address
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn seed_assignment(app: &axum::Router, order_id: &str, photographer_id: &str) -> Value {
    let response = send(
        app,
        as_admin(
            "POST",
            "/assignments",
            Some(json!({
                "order_id": order_id,
                "photographer_id": photographer_id,
                "scheduled_date": shoot_date(),
                "scheduled_time": "10:00:00",
                "payment_amount": 120.0,
                "travel_cost": 4.5
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = send(&app, request("GET", "/health", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["photographers"], 0);
    assert_eq!(body["orders"], 0);
    assert_eq!(body["assignments"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = send(&app, request("GET", "/metrics", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("sweep_runs_total"));
}

#[tokio::test]
async fn missing_identity_headers_return_401() {
    let app = setup();
    let response = send(&app, request("GET", "/assignments", None, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["kind"], "unauthenticated");
}

#[tokio::test]
async fn photographers_cannot_create_profiles() {
    let app = setup();
    let response = send(
        &app,
        as_photographer(
            PHOTOGRAPHER,
            "POST",
            "/photographers",
            Some(json!({ "name": "Mara", "email": "m@example.com", "service_radius_km": 10.0 })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_photographer_rejects_bad_input() {
    let app = setup();

    let empty_name = send(
        &app,
        as_admin(
            "POST",
            "/photographers",
            Some(json!({ "name": "  ", "email": "m@example.com", "service_radius_km": 10.0 })),
        ),
    )
    .await;
    assert_eq!(empty_name.status(), StatusCode::BAD_REQUEST);

    let zero_radius = send(
        &app,
        as_admin(
            "POST",
            "/photographers",
            Some(json!({ "name": "Mara", "email": "m@example.com", "service_radius_km": 0.0 })),
        ),
    )
    .await;
    assert_eq!(zero_radius.status(), StatusCode::BAD_REQUEST);

    let bad_home = send(
        &app,
        as_admin(
            "POST",
            "/photographers",
            Some(json!({
                "name": "Mara",
                "email": "m@example.com",
                "home": { "lat": 123.0, "lng": 13.4 },
                "service_radius_km": 10.0
            })),
        ),
    )
    .await;
    assert_eq!(bad_home.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn candidates_are_sorted_by_distance_and_honor_availability() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    seed_photographer(&app, OTHER_PHOTOGRAPHER, 52.60, 13.50).await;

    let date = shoot_date();
    let response = send(
        &app,
        as_photographer(
            OTHER_PHOTOGRAPHER,
            "PUT",
            &format!("/photographers/{OTHER_PHOTOGRAPHER}/calendar"),
            Some(json!({ "entries": [{ "date": date, "is_available": false }] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;
    let response = send(
        &app,
        as_admin(
            "GET",
            &format!("/orders/{order_id}/candidates?date={date}&max_distance_km=50"),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let candidates = body.as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0]["photographer_id"], PHOTOGRAPHER);
    assert_eq!(candidates[0]["is_available"], true);
    assert_eq!(candidates[1]["photographer_id"], OTHER_PHOTOGRAPHER);
    assert_eq!(candidates[1]["is_available"], false);
    assert!(
        candidates[0]["distance_km"].as_f64().unwrap()
            <= candidates[1]["distance_km"].as_f64().unwrap()
    );
}

#[tokio::test]
async fn coordinate_candidates_respect_max_distance() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    seed_photographer(&app, OTHER_PHOTOGRAPHER, 48.14, 11.58).await;

    let response = send(
        &app,
        as_admin("GET", "/candidates?lat=52.52&lng=13.40&max_distance_km=25", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let candidates = body.as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["photographer_id"], PHOTOGRAPHER);
}

#[tokio::test]
async fn order_without_coordinate_cannot_be_geocoded_offline() {
    let app = setup();
    let order_id = seed_order(&app, None).await;

    let response = send(
        &app,
        as_admin("GET", &format!("/orders/{order_id}/candidates"), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["kind"], "geocoding_failure");
}

#[tokio::test]
async fn compensation_suggestion_prices_package_and_trip() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;

    let response = send(
        &app,
        as_admin(
            "GET",
            &format!("/orders/{order_id}/compensation?photographer_id={PHOTOGRAPHER}"),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["payment_amount"], 120);
    assert!(body["travel"]["distance_km"].as_f64().unwrap() > 0.0);
    // a short hop stays inside the free kilometres
    assert_eq!(body["travel"]["travel_cost"], 0.0);
    assert_eq!(body["total"], 120.0);
}

#[tokio::test]
async fn compensation_suggestion_without_coordinates_has_no_travel() {
    let app = setup();
    let response = send(
        &app,
        as_admin(
            "POST",
            "/photographers",
            Some(json!({
                "id": PHOTOGRAPHER,
                "name": "Mara",
                "email": "m@example.com",
                "service_radius_km": 30.0
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order_id = seed_order(&app, None).await;

    let response = send(
        &app,
        as_admin(
            "GET",
            &format!("/orders/{order_id}/compensation?photographer_id={PHOTOGRAPHER}"),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["payment_amount"], 120);
    assert!(body["travel"].is_null());
}

#[tokio::test]
async fn assignment_offer_accept_and_complete() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;

    let assignment = seed_assignment(&app, &order_id, PHOTOGRAPHER).await;
    assert_eq!(assignment["status"], "pending");
    assert_eq!(assignment["compensation"]["total"], 124.5);
    assert!(!assignment["deadline"].is_null());
    let id = assignment["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        as_photographer(PHOTOGRAPHER, "GET", "/notifications", None),
    )
    .await;
    let inbox = body_json(response).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["kind"], "assignment_offered");

    let response = send(
        &app,
        as_photographer(
            PHOTOGRAPHER,
            "POST",
            &format!("/assignments/{id}/respond"),
            Some(json!({ "decision": "accept" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "accepted");
    assert!(!body["responded_at"].is_null());

    let response = send(
        &app,
        as_admin("POST", &format!("/assignments/{id}/complete"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "completed");

    let response = send(&app, as_admin("GET", "/notifications", None)).await;
    let inbox = body_json(response).await;
    assert_eq!(inbox[0]["kind"], "assignment_accepted");
}

#[tokio::test]
async fn second_active_assignment_conflicts() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    seed_photographer(&app, OTHER_PHOTOGRAPHER, 52.54, 13.42).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;
    seed_assignment(&app, &order_id, PHOTOGRAPHER).await;

    let response = send(
        &app,
        as_admin(
            "POST",
            "/assignments",
            Some(json!({
                "order_id": order_id,
                "photographer_id": OTHER_PHOTOGRAPHER,
                "scheduled_date": shoot_date(),
                "payment_amount": 120.0
            })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["kind"], "conflict");
}

#[tokio::test]
async fn decline_requires_reason_and_frees_the_order() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    seed_photographer(&app, OTHER_PHOTOGRAPHER, 52.54, 13.42).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;
    let assignment = seed_assignment(&app, &order_id, PHOTOGRAPHER).await;
    let id = assignment["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        as_photographer(
            PHOTOGRAPHER,
            "POST",
            &format!("/assignments/{id}/respond"),
            Some(json!({ "decision": "decline", "reason": "  " })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        as_photographer(
            PHOTOGRAPHER,
            "POST",
            &format!("/assignments/{id}/respond"),
            Some(json!({ "decision": "decline", "reason": "Out of town" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "declined");
    assert_eq!(body["photographer_notes"], "Out of town");

    let response = send(&app, as_admin("GET", "/notifications", None)).await;
    let inbox = body_json(response).await;
    assert_eq!(inbox[0]["kind"], "assignment_declined");
    assert!(inbox[0]["message"].as_str().unwrap().contains("Out of town"));

    seed_assignment(&app, &order_id, OTHER_PHOTOGRAPHER).await;
}

#[tokio::test]
async fn responding_to_a_closed_offer_is_stale() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;
    let assignment = seed_assignment(&app, &order_id, PHOTOGRAPHER).await;
    let id = assignment["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        as_photographer(
            PHOTOGRAPHER,
            "POST",
            &format!("/assignments/{id}/respond"),
            Some(json!({ "decision": "decline", "reason": "Sick" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        as_photographer(
            PHOTOGRAPHER,
            "POST",
            &format!("/assignments/{id}/respond"),
            Some(json!({ "decision": "accept" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "stale_assignment");
    assert_eq!(body["error"], "this offer is no longer valid");
}

#[tokio::test]
async fn other_photographers_cannot_see_or_answer_an_offer() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;
    let assignment = seed_assignment(&app, &order_id, PHOTOGRAPHER).await;
    let id = assignment["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        as_photographer(OTHER_PHOTOGRAPHER, "GET", &format!("/assignments/{id}"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        as_photographer(
            OTHER_PHOTOGRAPHER,
            "POST",
            &format!("/assignments/{id}/respond"),
            Some(json!({ "decision": "accept" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        as_photographer(OTHER_PHOTOGRAPHER, "GET", "/assignments", None),
    )
    .await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);

    let response = send(&app, as_photographer(PHOTOGRAPHER, "GET", "/assignments", None)).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn compensation_can_be_overwritten_while_active() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;
    let assignment = seed_assignment(&app, &order_id, PHOTOGRAPHER).await;
    let id = assignment["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        as_admin(
            "PATCH",
            &format!("/assignments/{id}/compensation"),
            Some(json!({ "payment_amount": 150.0, "travel_cost": 10.0 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["compensation"]["total"], 160.0);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn sweep_endpoint_is_admin_only_and_idle_without_due_offers() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;
    let order_id = seed_order(&app, Some(json!({ "lat": 52.52, "lng": 13.40 }))).await;
    seed_assignment(&app, &order_id, PHOTOGRAPHER).await;

    let response = send(
        &app,
        as_photographer(PHOTOGRAPHER, "POST", "/assignments/sweep", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, as_admin("POST", "/assignments/sweep", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["expired"], 0);

    let response = send(
        &app,
        as_admin("GET", &format!("/orders/{order_id}/assignments"), None),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body[0]["status"], "pending");
}

#[tokio::test]
async fn unknown_assignment_returns_404() {
    let app = setup();
    let response = send(
        &app,
        as_admin("GET", &format!("/assignments/{}", Uuid::new_v4()), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["kind"], "not_found");
}

#[tokio::test]
async fn duplicate_photographer_id_conflicts_and_keeps_calendar() {
    let app = setup();
    seed_photographer(&app, PHOTOGRAPHER, 52.53, 13.41).await;

    let date = shoot_date();
    let response = send(
        &app,
        as_photographer(
            PHOTOGRAPHER,
            "PUT",
            &format!("/photographers/{PHOTOGRAPHER}/calendar"),
            Some(json!({ "entries": [{ "date": date, "is_available": false }] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        as_admin(
            "POST",
            "/photographers",
            Some(json!({
                "id": PHOTOGRAPHER,
                "name": "Mara Lens",
                "email": "mara@example.com",
                "service_radius_km": 40.0
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["kind"], "conflict");

    let response = send(&app, as_admin("GET", "/photographers", None)).await;
    let body = body_json(response).await;
    assert_eq!(body[0]["calendar"].as_array().unwrap().len(), 1);
    assert_eq!(body[0]["calendar"][0]["is_available"], false);
}

#[tokio::test]
async fn event_stream_requires_identity() {
    let app = setup();
    let response = send(&app, request("GET", "/ws", None, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["kind"], "unauthenticated");
}
