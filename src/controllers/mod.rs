pub mod bookings;
pub mod seat_layouts;

use axum::{routing::get, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(seat_layouts::routes())
        .merge(bookings::routes())
        .route("/ws", get(crate::realtime::ws_handler))
}
