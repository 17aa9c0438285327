use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::cache::CacheService;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingDetails, BookingDraft, BookingFilter, BookingPage, Pagination, Seat};
use crate::realtime::SeatEventHub;
use crate::store::{SeatClaim, Store};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookSeatsRequest {
    #[validate(length(min = 1, message = "seatIds must not be empty"))]
    pub seat_ids: Vec<Uuid>,
    pub show_id: Uuid,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    cache: CacheService,
    /// Set when booked seats are announced on the hold channel.
    notifier: Option<SeatEventHub>,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, cache: CacheService, notifier: Option<SeatEventHub>) -> Self {
        Self {
            store,
            cache,
            notifier,
        }
    }

    /// Books every requested seat or none of them.
    pub async fn book_seats(&self, user_id: Uuid, request: BookSeatsRequest) -> AppResult<BookingDetails> {
        request.validate()?;

        let mut seen = HashSet::with_capacity(request.seat_ids.len());
        if !request.seat_ids.iter().all(|id| seen.insert(*id)) {
            return Err(AppError::BadRequest(
                "seatIds must not contain duplicates".to_string(),
            ));
        }

        let layout = self
            .store
            .find_seat_layout_by_seats(&request.seat_ids)
            .await?
            .ok_or_else(|| AppError::NotFound("Seat layout not found".to_string()))?;

        let draft = BookingDraft {
            user_id,
            show_id: request.show_id,
            seat_layout_id: layout.id,
            screen_id: layout.screen_id,
            theater_id: layout.theater_id,
            seat_ids: request.seat_ids,
        };

        let (booking, seats) = match self.store.claim_seats(draft).await? {
            SeatClaim::Claimed { booking, seats } => (booking, seats),
            SeatClaim::Unavailable => {
                return Err(AppError::BadRequest(
                    "Some seats are already booked".to_string(),
                ))
            }
        };

        info!(
            "Booking {} by user {}: {} seats, total {}",
            booking.id,
            user_id,
            booking.seat_ids.len(),
            booking.total_amount
        );

        self.cache.invalidate_layout(booking.screen_id).await;
        if let Some(hub) = &self.notifier {
            hub.seats_booked(&booking.seat_ids);
        }

        self.enrich(booking, Some(seats)).await
    }

    pub async fn booking_summary(&self, booking_id: Uuid) -> AppResult<BookingDetails> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found.".to_string()))?;

        self.enrich(booking, None).await
    }

    pub async fn user_history(&self, user_id: Uuid, page: Pagination) -> AppResult<BookingPage> {
        let filter = BookingFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        self.list(&filter, page).await
    }

    pub async fn admin_history(
        &self,
        theater_id: Option<Uuid>,
        screen_id: Option<Uuid>,
        page: Pagination,
    ) -> AppResult<BookingPage> {
        let filter = BookingFilter {
            user_id: None,
            theater_id,
            screen_id,
        };
        self.list(&filter, page).await
    }

    async fn list(&self, filter: &BookingFilter, page: Pagination) -> AppResult<BookingPage> {
        let (bookings, total_count) = self.store.list_bookings(filter, page).await?;

        let mut enriched = Vec::with_capacity(bookings.len());
        for booking in bookings {
            enriched.push(self.enrich(booking, None).await?);
        }

        Ok(BookingPage {
            bookings: enriched,
            total_count,
            page: page.page,
            limit: page.limit,
        })
    }

    /// Joins a booking with its user, screen, theater and seats. Records
    /// that no longer exist come back empty instead of failing the request.
    async fn enrich(&self, booking: Booking, seats: Option<Vec<Seat>>) -> AppResult<BookingDetails> {
        let user = self.store.find_user(booking.user_id).await?;
        let screen = self.store.find_screen(booking.screen_id).await?;
        let theater = self.store.find_theater(booking.theater_id).await?;
        let seats = match seats {
            Some(seats) => seats,
            None => {
                self.store
                    .find_seats(booking.seat_layout_id, &booking.seat_ids)
                    .await?
            }
        };

        if seats.len() != booking.seat_ids.len() {
            warn!(
                "Booking {} references {} seats, {} still exist",
                booking.id,
                booking.seat_ids.len(),
                seats.len()
            );
        }

        Ok(BookingDetails {
            booking,
            user,
            screen,
            theater,
            seats,
        })
    }
}
