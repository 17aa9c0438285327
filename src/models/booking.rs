use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Screen, Seat, Theater, UserProfile};

/// Immutable record of a completed seat purchase.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub screen_id: Uuid,
    pub theater_id: Uuid,
    pub seat_layout_id: Uuid,
    pub show_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub total_amount: f64,
    pub booked_at: DateTime<Utc>,
}

/// Everything needed to claim seats except the price, which is read at claim time.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub user_id: Uuid,
    pub show_id: Uuid,
    pub seat_layout_id: Uuid,
    pub screen_id: Uuid,
    pub theater_id: Uuid,
    pub seat_ids: Vec<Uuid>,
}

impl BookingDraft {
    pub fn into_booking(self, total_amount: f64) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            screen_id: self.screen_id,
            theater_id: self.theater_id,
            seat_layout_id: self.seat_layout_id,
            show_id: self.show_id,
            seat_ids: self.seat_ids,
            total_amount,
            booked_at: Utc::now(),
        }
    }
}

pub fn total_amount(seats: &[Seat]) -> f64 {
    seats.iter().map(|seat| seat.price).sum()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    pub theater_id: Option<Uuid>,
    pub screen_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Booking joined with its user, screen, theater and seat records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub booking: Booking,
    pub user: Option<UserProfile>,
    pub screen: Option<Screen>,
    pub theater: Option<Theater>,
    pub seats: Vec<Seat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPage {
    pub bookings: Vec<BookingDetails>,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
}
