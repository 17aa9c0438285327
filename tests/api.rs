use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use cinema_booking::cache::CacheService;
use cinema_booking::config::Config;
use cinema_booking::middleware::auth::{issue_token, Claims};
use cinema_booking::models::{Role, Screen, Theater, UserProfile};
use cinema_booking::store::MemoryStore;
use cinema_booking::{router, AppState};

struct TestApp {
    app: Router,
    config: Config,
    screen: Screen,
    customer: Uuid,
}

fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "JWT_SECRET" => Some("integration-secret".to_string()),
        _ => None,
    })
    .unwrap()
}

fn spawn_app() -> TestApp {
    let config = test_config();
    let store = MemoryStore::new();

    let theater = Theater {
        id: Uuid::new_v4(),
        name: "Grand".into(),
        location: "Main St".into(),
        city: "Almaty".into(),
    };
    let screen = Screen {
        id: Uuid::new_v4(),
        theater_id: theater.id,
        name: "Screen 1".into(),
        total_seats: 0,
        is_active: true,
        is_complete: false,
        seat_layout_id: None,
    };
    let customer = UserProfile {
        id: Uuid::new_v4(),
        name: "Ann".into(),
        email: "ann@example.com".into(),
        role: "customer".into(),
    };
    store.insert_theater(theater);
    store.insert_screen(screen.clone());
    store.insert_user(customer.clone());

    let state = AppState::from_parts(config.clone(), Arc::new(store), CacheService::disabled());
    TestApp {
        app: router(Arc::new(state)),
        config,
        screen,
        customer: customer.id,
    }
}

impl TestApp {
    fn token(&self, user_id: Uuid, role: Role) -> String {
        let claims = Claims {
            sub: user_id,
            role,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        issue_token(&claims, &self.config.jwt).unwrap()
    }

    fn admin(&self) -> String {
        self.token(Uuid::new_v4(), Role::SubAdmin)
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create_layout(&self, body: Value) -> (StatusCode, Value) {
        let token = self.admin();
        self.call(
            Method::POST,
            "/api/seat-layout/create-seat-layout",
            Some(&token),
            Some(body),
        )
        .await
    }
}

fn seat_id(layout: &Value, row: &str, number: i64) -> String {
    layout["seats"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["row"] == row && s["seatNumber"] == number)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn create_then_fetch_layout() {
    let app = spawn_app();
    let (status, body) = app
        .create_layout(json!({
            "screenId": app.screen.id,
            "rows": 3,
            "cols": 2,
            "defaultRegularPrice": 100,
            "seats": [{"row": 1, "type": "VIP", "price": 300}]
        }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Seat Layout added successfully!");
    let seats = body["data"]["seats"].as_array().unwrap();
    assert_eq!(seats.len(), 6);
    assert_eq!(seats[4]["row"], "C");
    assert_eq!(seats[4]["type"], "VIP");
    assert_eq!(seats[4]["price"], 300.0);

    let token = app.token(app.customer, Role::Customer);
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/seat-layout/{}", app.screen.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["seatTypes"]["VIP"]["rowCount"], 1);
    assert_eq!(body["data"]["seatTypes"]["REGULAR"]["rowCount"], 2);
}

#[tokio::test]
async fn duplicate_layout_conflicts_with_path_in_envelope() {
    let app = spawn_app();
    let layout = json!({
        "screenId": app.screen.id,
        "rows": 2,
        "cols": 2,
        "defaultRegularPrice": 100
    });
    app.create_layout(layout.clone()).await;

    let (status, body) = app.create_layout(layout).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["success"], false);
    assert_eq!(body["path"], "/api/seat-layout/create-seat-layout");
}

#[tokio::test]
async fn tiers_beyond_the_row_count_are_rejected() {
    let app = spawn_app();
    let (status, body) = app
        .create_layout(json!({
            "screenId": app.screen.id,
            "rows": 2,
            "cols": 2,
            "defaultRegularPrice": 100,
            "seats": [{"rowCount": 2, "type": "VIP", "price": 300}, {"rowCount": 1, "type": "PREMIUM", "price": 200}]
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "tiers cover 3 rows but the layout only has 2");
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = spawn_app();
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/seat-layout/{}", app.screen.id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn customers_cannot_create_layouts() {
    let app = spawn_app();
    let token = app.token(app.customer, Role::Customer);
    let (status, _) = app
        .call(
            Method::POST,
            "/api/seat-layout/create-seat-layout",
            Some(&token),
            Some(json!({"screenId": app.screen.id, "rows": 1, "cols": 1, "defaultRegularPrice": 100})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn booking_flow_end_to_end() {
    let app = spawn_app();
    let (_, created) = app
        .create_layout(json!({
            "screenId": app.screen.id,
            "rows": 3,
            "cols": 2,
            "defaultRegularPrice": 100
        }))
        .await;
    let layout = &created["data"];
    let a1 = seat_id(layout, "A", 1);
    let a2 = seat_id(layout, "A", 2);

    let token = app.token(app.customer, Role::Customer);
    let (status, body) = app
        .call(
            Method::POST,
            "/api/booking/book-seats",
            Some(&token),
            Some(json!({"seatIds": [a1, a2], "showId": Uuid::new_v4()})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Seats booked successfully. Enjoy your show!.");
    assert_eq!(body["data"]["booking"]["totalAmount"], 200.0);
    let booking_id = body["data"]["booking"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/booking/book-seats",
            Some(&token),
            Some(json!({"seatIds": [a2], "showId": Uuid::new_v4()})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Some seats are already booked");

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/booking/booking-summary/{}", booking_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["seats"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["user"]["email"], "ann@example.com");

    let (status, body) = app
        .call(
            Method::GET,
            "/api/booking/booking-history?page=1&limit=5",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalCount"], 1);
    assert_eq!(body["data"]["limit"], 5);

    let (status, _) = app
        .call(
            Method::GET,
            "/api/booking/admin/booking-history",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin();
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/booking/admin/booking-history?screenId={}", app.screen.id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Booking list fetched successfully.");
    assert_eq!(body["data"]["bookings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn availability_patch_then_delete() {
    let app = spawn_app();
    let (_, created) = app
        .create_layout(json!({
            "screenId": app.screen.id,
            "rows": 1,
            "cols": 3,
            "defaultRegularPrice": 100
        }))
        .await;
    let layout_id = created["data"]["id"].as_str().unwrap().to_string();
    let admin = app.admin();

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/seat-layout/{}/seats", layout_id),
            Some(&admin),
            Some(json!({"seats": [{"row": "A", "seatNumber": 3, "isAvailable": false}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["seats"][2]["isAvailable"], false);
    assert_eq!(body["data"]["seats"][0]["isAvailable"], true);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/seat-layout/{}", layout_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Seat layout deleted successfully.");

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/seat-layout/{}", app.screen.id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Seat layout not found.");
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = spawn_app();
    let admin = app.admin();
    let (status, body) = app
        .call(Method::DELETE, "/api/seat-layout/not-a-uuid", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["path"], "/api/seat-layout/not-a-uuid");
}
