use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::middleware::AuthUser;
use crate::models::Role;
use crate::response::ApiResponse;
use crate::services::{NewSeatLayout, SeatAvailabilityRequest, SeatLayoutChanges};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    // One parameter name per segment: screen id for GET, layout id otherwise.
    Router::new()
        .route("/seat-layout/create-seat-layout", post(create_seat_layout))
        .route(
            "/seat-layout/{id}",
            get(get_seat_layout)
                .put(update_seat_layout)
                .delete(delete_seat_layout),
        )
        .route("/seat-layout/{id}/seats", patch(update_seat_availability))
}

// POST /api/seat-layout/create-seat-layout
async fn create_seat_layout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<NewSeatLayout>,
) -> AppResult<impl IntoResponse> {
    user.require_role(&[Role::SubAdmin])?;

    let layout = state.seat_layouts.create(req).await?;
    Ok(ApiResponse::created("Seat Layout added successfully!", layout))
}

// GET /api/seat-layout/{screenId}
async fn get_seat_layout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(screen_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require_role(&[Role::SubAdmin, Role::Customer])?;

    let view = state.seat_layouts.get_by_screen(screen_id).await?;
    Ok(ApiResponse::ok("Seat layout fetched successfully.", view))
}

// PUT /api/seat-layout/{seatLayoutId}
async fn update_seat_layout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(layout_id): Path<Uuid>,
    Json(changes): Json<SeatLayoutChanges>,
) -> AppResult<impl IntoResponse> {
    user.require_role(&[Role::SubAdmin, Role::SuperAdmin])?;

    let layout = state.seat_layouts.update(layout_id, changes).await?;
    Ok(ApiResponse::ok("Seat layout updated successfully.", layout))
}

// PATCH /api/seat-layout/{seatLayoutId}/seats
async fn update_seat_availability(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(layout_id): Path<Uuid>,
    Json(req): Json<SeatAvailabilityRequest>,
) -> AppResult<impl IntoResponse> {
    user.require_role(&[Role::SubAdmin])?;

    let layout = state.seat_layouts.update_availability(layout_id, req).await?;
    Ok(ApiResponse::ok("Seat availability updated successfully!", layout))
}

// DELETE /api/seat-layout/{seatLayoutId}
async fn delete_seat_layout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(layout_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require_role(&[Role::SubAdmin, Role::SuperAdmin])?;

    state.seat_layouts.delete(layout_id).await?;
    Ok(ApiResponse::ok("Seat layout deleted successfully.", ()))
}
