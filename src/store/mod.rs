//! Persistence boundary of the seat layout and booking core.
//!
//! Seats are addressed individually by id so a booking can flip exactly the
//! seats it claims, conditionally, without rewriting the layout.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Booking, BookingDraft, BookingFilter, Pagination, Screen, Seat, SeatAvailabilityUpdate,
    SeatLayout, Theater, UserProfile,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of an all-or-nothing seat claim.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatClaim {
    Claimed { booking: Booking, seats: Vec<Seat> },
    /// At least one seat was missing, blocked or already booked. Nothing changed.
    Unavailable,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_screen(&self, screen_id: Uuid) -> StoreResult<Option<Screen>>;

    async fn find_theater(&self, theater_id: Uuid) -> StoreResult<Option<Theater>>;

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>>;

    async fn find_seat_layout(&self, layout_id: Uuid) -> StoreResult<Option<SeatLayout>>;

    async fn find_seat_layout_by_screen(&self, screen_id: Uuid)
        -> StoreResult<Option<SeatLayout>>;

    /// Layout owning any of the given seats.
    async fn find_seat_layout_by_seats(&self, seat_ids: &[Uuid])
        -> StoreResult<Option<SeatLayout>>;

    /// Persists a new layout and links it to its screen (`seat_layout_id`,
    /// `total_seats`, `is_complete`). Fails with `Conflict` if the screen
    /// already has a layout.
    async fn insert_seat_layout(&self, layout: &SeatLayout) -> StoreResult<()>;

    /// Overwrites dimensions, tiers and the entire seat set of a layout and
    /// refreshes the screen's seat count.
    async fn replace_seat_layout(&self, layout: &SeatLayout) -> StoreResult<()>;

    /// Sets `is_available` on seats matching `(row, seat_number)`. Returns the
    /// updated layout, or `None` if the layout does not exist.
    async fn update_seat_availability(
        &self,
        layout_id: Uuid,
        updates: &[SeatAvailabilityUpdate],
    ) -> StoreResult<Option<SeatLayout>>;

    /// Deletes a layout with its seats and unlinks the screen. Returns the
    /// screen id the layout belonged to.
    async fn delete_seat_layout(&self, layout_id: Uuid) -> StoreResult<Option<Uuid>>;

    /// Atomically marks every seat of the draft booked and records the
    /// booking, or changes nothing.
    async fn claim_seats(&self, draft: BookingDraft) -> StoreResult<SeatClaim>;

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    /// Newest first, with the total number of matching bookings.
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<Booking>, i64)>;

    /// Seats of a layout with the given ids, in layout order.
    async fn find_seats(&self, layout_id: Uuid, seat_ids: &[Uuid]) -> StoreResult<Vec<Seat>>;
}
