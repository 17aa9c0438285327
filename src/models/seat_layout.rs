use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::seat::{Seat, SeatTier, SeatType};

/// Seat grid and pricing of one screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatLayout {
    pub id: Uuid,
    pub screen_id: Uuid,
    pub theater_id: Uuid,
    pub rows: i32,
    pub cols: i32,
    pub default_regular_price: f64,
    /// Tiers the seats were last generated from.
    pub tiers: Vec<SeatTier>,
    pub seats: Vec<Seat>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeatLayout {
    pub fn total_seats(&self) -> i32 {
        self.seats.len() as i32
    }

    pub fn booked_seats(&self) -> usize {
        self.seats.iter().filter(|s| s.is_booked).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatTypeSummary {
    pub row_count: usize,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub price: f64,
    pub is_available: bool,
}

/// Layout together with its per-tier summary, as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatLayoutView {
    pub seat_layout: SeatLayout,
    pub seat_types: BTreeMap<SeatType, SeatTypeSummary>,
}
