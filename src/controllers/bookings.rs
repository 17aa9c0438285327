use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{Pagination, Role};
use crate::response::ApiResponse;
use crate::services::BookSeatsRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/booking/book-seats", post(book_seats))
        .route("/booking/booking-summary/{booking_id}", get(booking_summary))
        .route("/booking/booking-history", get(booking_history))
        .route("/booking/admin/booking-history", get(admin_booking_history))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminHistoryQuery {
    theater_id: Option<Uuid>,
    screen_id: Option<Uuid>,
    page: Option<i64>,
    limit: Option<i64>,
}

// POST /api/booking/book-seats
async fn book_seats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BookSeatsRequest>,
) -> AppResult<impl IntoResponse> {
    let details = state.bookings.book_seats(user.user_id, req).await?;
    Ok(ApiResponse::created(
        "Seats booked successfully. Enjoy your show!.",
        details,
    ))
}

// GET /api/booking/booking-summary/{bookingId}
async fn booking_summary(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let details = state.bookings.booking_summary(booking_id).await?;
    Ok(ApiResponse::ok("Booking summary fetched successfully.", details))
}

// GET /api/booking/booking-history?page&limit
async fn booking_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(q): Query<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let page = Pagination::new(q.page, q.limit);
    let history = state.bookings.user_history(user.user_id, page).await?;
    Ok(ApiResponse::ok("Booking history fetched successfully.", history))
}

// GET /api/booking/admin/booking-history?theaterId&screenId&page&limit
async fn admin_booking_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(q): Query<AdminHistoryQuery>,
) -> AppResult<impl IntoResponse> {
    user.require_role(&[Role::SubAdmin, Role::SuperAdmin])?;

    let page = Pagination::new(q.page, q.limit);
    let list = state
        .bookings
        .admin_history(q.theater_id, q.screen_id, page)
        .await?;
    Ok(ApiResponse::ok("Booking list fetched successfully.", list))
}
