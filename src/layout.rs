//! Seat grid generation.
//!
//! A layout is described compactly by its dimensions, a default price for
//! regular rows and a list of tiers. Tiers claim contiguous blocks of rows
//! starting at the back of the hall (the highest row index), VIP first, then
//! PREMIUM, then any explicit REGULAR tier. Rows left over keep the default
//! regular price.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::models::{Seat, SeatAvailabilityUpdate, SeatTier, SeatType, SeatTypeSummary};

/// Upper bound for both rows and columns of a single screen.
pub const MAX_DIMENSION: i32 = 1000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("rows and cols must be between 1 and 1000")]
    InvalidDimensions,

    #[error("defaultRegularPrice must be at least 1")]
    InvalidDefaultPrice,

    #[error("tier {seat_type} must cover at least one row and have a non-negative price")]
    InvalidTier { seat_type: SeatType },

    #[error("tiers cover {requested} rows but the layout only has {rows}")]
    TiersExceedRows { requested: i64, rows: i32 },
}

/// Input of a generation run.
#[derive(Debug, Clone, Copy)]
pub struct LayoutSpec<'a> {
    pub rows: i32,
    pub cols: i32,
    pub default_regular_price: f64,
    pub tiers: &'a [SeatTier],
}

/// Bijective base-26 row label: 0 -> A, 25 -> Z, 26 -> AA, 701 -> ZZ, 702 -> AAA.
pub fn row_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut index = index as i64;
    while index >= 0 {
        letters.push(char::from(b'A' + (index % 26) as u8));
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Tiers ordered VIP, PREMIUM, REGULAR. The sort is stable, so tiers of the
/// same type keep their request order.
pub fn sort_tiers(tiers: &[SeatTier]) -> Vec<&SeatTier> {
    let mut sorted: Vec<&SeatTier> = tiers.iter().collect();
    sorted.sort_by_key(|tier| Reverse(tier.seat_type.priority()));
    sorted
}

fn validate(spec: &LayoutSpec<'_>) -> Result<(), LayoutError> {
    if !(1..=MAX_DIMENSION).contains(&spec.rows) || !(1..=MAX_DIMENSION).contains(&spec.cols) {
        return Err(LayoutError::InvalidDimensions);
    }
    if !(spec.default_regular_price >= 1.0) {
        return Err(LayoutError::InvalidDefaultPrice);
    }
    for tier in spec.tiers {
        if tier.row_count < 1 || !(tier.price >= 0.0) {
            return Err(LayoutError::InvalidTier {
                seat_type: tier.seat_type,
            });
        }
    }
    let requested: i64 = spec.tiers.iter().map(|tier| i64::from(tier.row_count)).sum();
    if requested > i64::from(spec.rows) {
        return Err(LayoutError::TiersExceedRows {
            requested,
            rows: spec.rows,
        });
    }
    Ok(())
}

/// Type and price of every row, indexed front (0) to back.
pub fn assign_row_tiers(spec: &LayoutSpec<'_>) -> Result<Vec<(SeatType, f64)>, LayoutError> {
    validate(spec)?;

    let mut row_types = vec![(SeatType::Regular, spec.default_regular_price); spec.rows as usize];
    let mut current_row = spec.rows as usize;
    for tier in sort_tiers(spec.tiers) {
        let start = current_row - tier.row_count as usize;
        for slot in &mut row_types[start..current_row] {
            *slot = (tier.seat_type, tier.price);
        }
        current_row = start;
    }
    Ok(row_types)
}

/// Expands a layout description into `rows * cols` fresh seats, row-major from the front.
pub fn generate_seats(spec: &LayoutSpec<'_>) -> Result<Vec<Seat>, LayoutError> {
    let row_types = assign_row_tiers(spec)?;

    let mut seats = Vec::with_capacity(row_types.len() * spec.cols as usize);
    for (index, (seat_type, price)) in row_types.into_iter().enumerate() {
        let label = row_label(index);
        for seat_number in 1..=spec.cols {
            seats.push(Seat {
                id: Uuid::new_v4(),
                row: label.clone(),
                seat_number,
                seat_type,
                price,
                is_available: true,
                is_booked: false,
            });
        }
    }
    Ok(seats)
}

/// Collapses repeated keys, keeping the last update for each seat.
pub fn dedup_availability(updates: Vec<SeatAvailabilityUpdate>) -> Vec<SeatAvailabilityUpdate> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut collapsed: Vec<SeatAvailabilityUpdate> = Vec::with_capacity(updates.len());
    for update in updates {
        match positions.get(&update.key()) {
            Some(&at) => collapsed[at] = update,
            None => {
                positions.insert(update.key(), collapsed.len());
                collapsed.push(update);
            }
        }
    }
    collapsed
}

/// Applies availability flags by `"{row}-{seatNumber}"` key. Unknown keys are
/// ignored and `is_booked` is never touched. Returns the number of seats hit.
pub fn apply_availability(seats: &mut [Seat], updates: &[SeatAvailabilityUpdate]) -> usize {
    let index: HashMap<String, usize> = seats
        .iter()
        .enumerate()
        .map(|(position, seat)| (seat.key(), position))
        .collect();

    let mut applied = 0;
    for update in updates {
        if let Some(&position) = index.get(&update.key()) {
            seats[position].is_available = update.is_available;
            applied += 1;
        }
    }
    applied
}

/// Distinct row count per seat type. Price and availability are those of the
/// first seat of each type in layout order.
pub fn summarize_seat_types(seats: &[Seat]) -> BTreeMap<SeatType, SeatTypeSummary> {
    let mut rows_by_type: BTreeMap<SeatType, (HashSet<&str>, &Seat)> = BTreeMap::new();
    for seat in seats {
        let (rows, _) = rows_by_type
            .entry(seat.seat_type)
            .or_insert_with(|| (HashSet::new(), seat));
        rows.insert(seat.row.as_str());
    }

    rows_by_type
        .into_iter()
        .map(|(seat_type, (rows, first))| {
            (
                seat_type,
                SeatTypeSummary {
                    row_count: rows.len(),
                    seat_type,
                    price: first.price,
                    is_available: first.is_available,
                },
            )
        })
        .collect()
}
