use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Pricing tier of a seat. Serialized upper-case, lower-case accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatType {
    #[serde(alias = "regular")]
    Regular,
    #[serde(alias = "premium")]
    Premium,
    #[serde(alias = "vip")]
    Vip,
}

impl SeatType {
    /// Tiers with a higher priority are placed closer to the back of the hall.
    pub fn priority(self) -> u8 {
        match self {
            SeatType::Vip => 3,
            SeatType::Premium => 2,
            SeatType::Regular => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeatType::Vip => "VIP",
            SeatType::Premium => "PREMIUM",
            SeatType::Regular => "REGULAR",
        }
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VIP" => Ok(SeatType::Vip),
            "PREMIUM" => Ok(SeatType::Premium),
            "REGULAR" => Ok(SeatType::Regular),
            other => Err(format!("unknown seat type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub id: Uuid,
    pub row: String,
    pub seat_number: i32,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub price: f64,
    pub is_available: bool,
    #[serde(default)]
    pub is_booked: bool,
}

impl Seat {
    pub fn key(&self) -> String {
        seat_key(&self.row, self.seat_number)
    }

    /// A seat can be claimed by a booking only while it is open and unsold.
    pub fn is_claimable(&self) -> bool {
        self.is_available && !self.is_booked
    }
}

/// Lookup key of a seat inside one layout, e.g. `"B-7"`.
pub fn seat_key(row: &str, seat_number: i32) -> String {
    format!("{}-{}", row, seat_number)
}

/// A block of rows assigned to one tier, counted from the back of the hall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeatTier {
    #[serde(alias = "row")]
    #[validate(range(min = 1, message = "rowCount must be at least 1"))]
    pub row_count: i32,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailabilityUpdate {
    #[validate(length(min = 1, message = "row must not be empty"))]
    pub row: String,
    pub seat_number: i32,
    pub is_available: bool,
}

impl SeatAvailabilityUpdate {
    pub fn key(&self) -> String {
        seat_key(&self.row, self.seat_number)
    }
}
