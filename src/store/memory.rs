use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{SeatClaim, Store, StoreError, StoreResult};
use crate::layout;
use crate::models::booking::total_amount;
use crate::models::{
    Booking, BookingDraft, BookingFilter, Pagination, Screen, Seat, SeatAvailabilityUpdate,
    SeatLayout, Theater, UserProfile,
};

struct LayoutRecord {
    /// Layout metadata; `seats` is always empty here.
    header: SeatLayout,
    seat_ids: Vec<Uuid>,
}

struct SeatRecord {
    layout_id: Uuid,
    seat: Seat,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserProfile>,
    theaters: HashMap<Uuid, Theater>,
    screens: HashMap<Uuid, Screen>,
    layouts: HashMap<Uuid, LayoutRecord>,
    layout_by_screen: HashMap<Uuid, Uuid>,
    seats: HashMap<Uuid, SeatRecord>,
    bookings: Vec<Booking>,
}

impl Inner {
    fn assemble(&self, layout_id: Uuid) -> Option<SeatLayout> {
        let record = self.layouts.get(&layout_id)?;
        let mut layout = record.header.clone();
        layout.seats = record
            .seat_ids
            .iter()
            .filter_map(|id| self.seats.get(id).map(|r| r.seat.clone()))
            .collect();
        Some(layout)
    }

    fn put_seats(&mut self, layout: &SeatLayout) -> Vec<Uuid> {
        layout
            .seats
            .iter()
            .map(|seat| {
                self.seats.insert(
                    seat.id,
                    SeatRecord {
                        layout_id: layout.id,
                        seat: seat.clone(),
                    },
                );
                seat.id
            })
            .collect()
    }

    fn drop_seats(&mut self, layout_id: Uuid) {
        if let Some(record) = self.layouts.get(&layout_id) {
            for id in &record.seat_ids {
                self.seats.remove(id);
            }
        }
    }
}

/// Process-local store. Every operation runs under one lock, so a seat claim
/// is a single check-and-flip step.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserProfile) {
        self.inner.write().users.insert(user.id, user);
    }

    pub fn insert_theater(&self, theater: Theater) {
        self.inner.write().theaters.insert(theater.id, theater);
    }

    pub fn insert_screen(&self, screen: Screen) {
        self.inner.write().screens.insert(screen.id, screen);
    }

    pub fn booking_count(&self) -> usize {
        self.inner.read().bookings.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_screen(&self, screen_id: Uuid) -> StoreResult<Option<Screen>> {
        Ok(self.inner.read().screens.get(&screen_id).cloned())
    }

    async fn find_theater(&self, theater_id: Uuid) -> StoreResult<Option<Theater>> {
        Ok(self.inner.read().theaters.get(&theater_id).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.inner.read().users.get(&user_id).cloned())
    }

    async fn find_seat_layout(&self, layout_id: Uuid) -> StoreResult<Option<SeatLayout>> {
        Ok(self.inner.read().assemble(layout_id))
    }

    async fn find_seat_layout_by_screen(
        &self,
        screen_id: Uuid,
    ) -> StoreResult<Option<SeatLayout>> {
        let inner = self.inner.read();
        Ok(inner
            .layout_by_screen
            .get(&screen_id)
            .and_then(|id| inner.assemble(*id)))
    }

    async fn find_seat_layout_by_seats(
        &self,
        seat_ids: &[Uuid],
    ) -> StoreResult<Option<SeatLayout>> {
        let inner = self.inner.read();
        Ok(seat_ids
            .iter()
            .find_map(|id| inner.seats.get(id))
            .and_then(|record| inner.assemble(record.layout_id)))
    }

    async fn insert_seat_layout(&self, layout: &SeatLayout) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.layout_by_screen.contains_key(&layout.screen_id) {
            return Err(StoreError::Conflict(
                "Seat layout already exists for this screen.".to_string(),
            ));
        }

        let seat_ids = inner.put_seats(layout);
        let mut header = layout.clone();
        header.seats = Vec::new();
        inner.layouts.insert(layout.id, LayoutRecord { header, seat_ids });
        inner.layout_by_screen.insert(layout.screen_id, layout.id);

        if let Some(screen) = inner.screens.get_mut(&layout.screen_id) {
            screen.seat_layout_id = Some(layout.id);
            screen.total_seats = layout.total_seats();
            screen.is_complete = true;
        }
        Ok(())
    }

    async fn replace_seat_layout(&self, layout: &SeatLayout) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner.layouts.contains_key(&layout.id) {
            return Err(StoreError::Corrupt(format!(
                "seat layout {} vanished during update",
                layout.id
            )));
        }

        inner.drop_seats(layout.id);
        let seat_ids = inner.put_seats(layout);
        let mut header = layout.clone();
        header.seats = Vec::new();
        header.updated_at = Utc::now();
        inner.layouts.insert(layout.id, LayoutRecord { header, seat_ids });

        if let Some(screen) = inner.screens.get_mut(&layout.screen_id) {
            screen.total_seats = layout.total_seats();
        }
        Ok(())
    }

    async fn update_seat_availability(
        &self,
        layout_id: Uuid,
        updates: &[SeatAvailabilityUpdate],
    ) -> StoreResult<Option<SeatLayout>> {
        let mut inner = self.inner.write();
        let Some(mut layout) = inner.assemble(layout_id) else {
            return Ok(None);
        };

        layout::apply_availability(&mut layout.seats, updates);
        for seat in &layout.seats {
            if let Some(record) = inner.seats.get_mut(&seat.id) {
                record.seat.is_available = seat.is_available;
            }
        }
        if let Some(record) = inner.layouts.get_mut(&layout_id) {
            record.header.updated_at = Utc::now();
        }
        Ok(inner.assemble(layout_id))
    }

    async fn delete_seat_layout(&self, layout_id: Uuid) -> StoreResult<Option<Uuid>> {
        let mut inner = self.inner.write();
        inner.drop_seats(layout_id);
        let Some(record) = inner.layouts.remove(&layout_id) else {
            return Ok(None);
        };

        let screen_id = record.header.screen_id;
        inner.layout_by_screen.remove(&screen_id);
        if let Some(screen) = inner.screens.get_mut(&screen_id) {
            screen.seat_layout_id = None;
            screen.is_complete = false;
        }
        Ok(Some(screen_id))
    }

    async fn claim_seats(&self, draft: BookingDraft) -> StoreResult<SeatClaim> {
        let mut inner = self.inner.write();

        let claimable = draft
            .seat_ids
            .iter()
            .filter(|id| {
                inner.seats.get(id).is_some_and(|record| {
                    record.layout_id == draft.seat_layout_id && record.seat.is_claimable()
                })
            })
            .count();
        if claimable != draft.seat_ids.len() {
            return Ok(SeatClaim::Unavailable);
        }

        let mut seats = Vec::with_capacity(draft.seat_ids.len());
        for id in &draft.seat_ids {
            if let Some(record) = inner.seats.get_mut(id) {
                record.seat.is_booked = true;
                seats.push(record.seat.clone());
            }
        }

        let booking = draft.into_booking(total_amount(&seats));
        inner.bookings.push(booking.clone());
        Ok(SeatClaim::Claimed { booking, seats })
    }

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self
            .inner
            .read()
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned())
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<Booking>, i64)> {
        let inner = self.inner.read();
        // Reverse insertion order first so equal timestamps still list newest first.
        let mut matching: Vec<&Booking> = inner
            .bookings
            .iter()
            .rev()
            .filter(|b| filter.user_id.map_or(true, |id| b.user_id == id))
            .filter(|b| filter.theater_id.map_or(true, |id| b.theater_id == id))
            .filter(|b| filter.screen_id.map_or(true, |id| b.screen_id == id))
            .collect();
        matching.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));

        let total = matching.len() as i64;
        let bookings = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((bookings, total))
    }

    async fn find_seats(&self, layout_id: Uuid, seat_ids: &[Uuid]) -> StoreResult<Vec<Seat>> {
        let inner = self.inner.read();
        Ok(inner
            .assemble(layout_id)
            .map(|layout| {
                layout
                    .seats
                    .into_iter()
                    .filter(|seat| seat_ids.contains(&seat.id))
                    .collect()
            })
            .unwrap_or_default())
    }
}
