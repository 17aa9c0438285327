use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::cache::CacheService;
use crate::error::{AppError, AppResult};
use crate::layout::{self, LayoutSpec};
use crate::models::{SeatAvailabilityUpdate, SeatLayout, SeatLayoutView, SeatTier};
use crate::store::Store;

const LAYOUT_EXISTS: &str =
    "Seat layout already exists for this screen. Please update the existing layout instead.";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSeatLayout {
    pub screen_id: Uuid,
    /// Redundant with the screen's theater; checked when present.
    #[serde(default)]
    pub theater_id: Option<Uuid>,
    #[validate(range(min = 1, max = 1000))]
    pub rows: i32,
    #[validate(range(min = 1, max = 1000))]
    pub cols: i32,
    #[validate(range(min = 1.0, message = "defaultRegularPrice must be at least 1"))]
    pub default_regular_price: f64,
    #[serde(default)]
    #[validate(nested)]
    pub seats: Vec<SeatTier>,
}

/// Partial regeneration request. Absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeatLayoutChanges {
    #[validate(range(min = 1, max = 1000))]
    pub rows: Option<i32>,
    #[validate(range(min = 1, max = 1000))]
    pub cols: Option<i32>,
    #[validate(range(min = 1.0, message = "defaultRegularPrice must be at least 1"))]
    pub default_regular_price: Option<f64>,
    #[validate(nested)]
    pub seats: Option<Vec<SeatTier>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailabilityRequest {
    #[validate(nested)]
    pub seats: Vec<SeatAvailabilityUpdate>,
}

#[derive(Clone)]
pub struct SeatLayoutService {
    store: Arc<dyn Store>,
    cache: CacheService,
}

impl SeatLayoutService {
    pub fn new(store: Arc<dyn Store>, cache: CacheService) -> Self {
        Self { store, cache }
    }

    pub async fn create(&self, request: NewSeatLayout) -> AppResult<SeatLayout> {
        request.validate()?;

        let screen = self
            .store
            .find_screen(request.screen_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Screen not found.".to_string()))?;

        if let Some(theater_id) = request.theater_id {
            if theater_id != screen.theater_id {
                return Err(AppError::BadRequest(
                    "Screen does not belong to the given theater.".to_string(),
                ));
            }
        }

        if self
            .store
            .find_seat_layout_by_screen(screen.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(LAYOUT_EXISTS.to_string()));
        }

        let seats = layout::generate_seats(&LayoutSpec {
            rows: request.rows,
            cols: request.cols,
            default_regular_price: request.default_regular_price,
            tiers: &request.seats,
        })?;

        let now = Utc::now();
        let layout = SeatLayout {
            id: Uuid::new_v4(),
            screen_id: screen.id,
            theater_id: screen.theater_id,
            rows: request.rows,
            cols: request.cols,
            default_regular_price: request.default_regular_price,
            tiers: request.seats,
            seats,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_seat_layout(&layout).await?;
        self.cache.invalidate_layout(screen.id).await;

        info!(
            "Seat layout {} created for screen {} ({}x{})",
            layout.id, screen.id, layout.rows, layout.cols
        );
        Ok(layout)
    }

    pub async fn get_by_screen(&self, screen_id: Uuid) -> AppResult<SeatLayoutView> {
        // Taken before the store read; see `cache::layouts`.
        let generation = self.cache.layout_generation(screen_id).await;
        if let Some(generation) = generation {
            if let Some(view) = self.cache.get_layout(screen_id, generation).await {
                return Ok(view);
            }
        }

        let layout = self
            .store
            .find_seat_layout_by_screen(screen_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Seat layout not found.".to_string()))?;

        let view = SeatLayoutView {
            seat_types: layout::summarize_seat_types(&layout.seats),
            seat_layout: layout,
        };
        if let Some(generation) = generation {
            self.cache.save_layout(screen_id, generation, &view).await;
        }
        Ok(view)
    }

    /// Regenerates the whole seat grid. Every seat id and flag of the old
    /// grid is discarded, booked seats included.
    pub async fn update(&self, layout_id: Uuid, changes: SeatLayoutChanges) -> AppResult<SeatLayout> {
        changes.validate()?;

        let existing = self.find(layout_id).await?;

        let rows = changes.rows.unwrap_or(existing.rows);
        let cols = changes.cols.unwrap_or(existing.cols);
        let default_regular_price = changes
            .default_regular_price
            .unwrap_or(existing.default_regular_price);
        let tiers = changes.seats.unwrap_or_else(|| existing.tiers.clone());

        let seats = layout::generate_seats(&LayoutSpec {
            rows,
            cols,
            default_regular_price,
            tiers: &tiers,
        })?;

        let booked = existing.booked_seats();
        if booked > 0 {
            warn!(
                "Regenerating seat layout {} discards {} booked seats",
                layout_id, booked
            );
        }

        let layout = SeatLayout {
            rows,
            cols,
            default_regular_price,
            tiers,
            seats,
            updated_at: Utc::now(),
            ..existing
        };

        self.store.replace_seat_layout(&layout).await?;
        self.cache.invalidate_layout(layout.screen_id).await;

        info!("Seat layout {} regenerated ({}x{})", layout.id, rows, cols);
        Ok(layout)
    }

    pub async fn update_availability(
        &self,
        layout_id: Uuid,
        request: SeatAvailabilityRequest,
    ) -> AppResult<SeatLayout> {
        request.validate()?;

        let updates = layout::dedup_availability(request.seats);
        let layout = self
            .store
            .update_seat_availability(layout_id, &updates)
            .await?
            .ok_or_else(|| AppError::NotFound("Seat layout not found.".to_string()))?;

        self.cache.invalidate_layout(layout.screen_id).await;
        Ok(layout)
    }

    pub async fn delete(&self, layout_id: Uuid) -> AppResult<()> {
        let screen_id = self
            .store
            .delete_seat_layout(layout_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Seat layout not found.".to_string()))?;

        self.cache.invalidate_layout(screen_id).await;
        info!("Seat layout {} deleted from screen {}", layout_id, screen_id);
        Ok(())
    }

    async fn find(&self, layout_id: Uuid) -> AppResult<SeatLayout> {
        self.store
            .find_seat_layout(layout_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Seat layout not found.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use redis::RedisResult;

    use crate::cache::layouts::generation_key;
    use crate::cache::{CacheBackend, MemoryCache};
    use crate::models::{BookingDraft, Screen, SeatType};
    use crate::services::{BookSeatsRequest, BookingService};
    use crate::store::{MemoryStore, SeatClaim};

    fn setup() -> (SeatLayoutService, MemoryStore, Screen) {
        let store = MemoryStore::new();
        let screen = Screen {
            id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            name: "Screen 1".to_string(),
            total_seats: 0,
            is_active: true,
            is_complete: false,
            seat_layout_id: None,
        };
        store.insert_screen(screen.clone());
        let service = SeatLayoutService::new(Arc::new(store.clone()), CacheService::disabled());
        (service, store, screen)
    }

    fn request(screen_id: Uuid, rows: i32, cols: i32, tiers: Vec<SeatTier>) -> NewSeatLayout {
        NewSeatLayout {
            screen_id,
            theater_id: None,
            rows,
            cols,
            default_regular_price: 100.0,
            seats: tiers,
        }
    }

    fn vip_row() -> SeatTier {
        SeatTier {
            row_count: 1,
            seat_type: SeatType::Vip,
            price: 300.0,
        }
    }

    #[tokio::test]
    async fn create_links_the_screen() {
        let (service, store, screen) = setup();
        let layout = service
            .create(request(screen.id, 3, 2, vec![vip_row()]))
            .await
            .unwrap();

        assert_eq!(layout.seats.len(), 6);
        assert_eq!(layout.theater_id, screen.theater_id);
        let linked = store.find_screen(screen.id).await.unwrap().unwrap();
        assert_eq!(linked.seat_layout_id, Some(layout.id));
        assert_eq!(linked.total_seats, 6);
        assert!(linked.is_complete);
    }

    #[tokio::test]
    async fn second_layout_for_a_screen_conflicts() {
        let (service, _, screen) = setup();
        service.create(request(screen.id, 2, 2, vec![])).await.unwrap();
        let err = service
            .create(request(screen.id, 2, 2, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_screen_is_not_found() {
        let (service, _, _) = setup();
        let err = service
            .create(request(Uuid::new_v4(), 2, 2, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn theater_mismatch_is_rejected() {
        let (service, _, screen) = setup();
        let mut req = request(screen.id, 2, 2, vec![]);
        req.theater_id = Some(Uuid::new_v4());
        let err = service.create(req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn out_of_range_dimensions_fail_validation() {
        let (service, _, screen) = setup();
        let err = service
            .create(request(screen.id, 0, 2, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn get_by_screen_summarizes_types() {
        let (service, _, screen) = setup();
        service
            .create(request(screen.id, 3, 2, vec![vip_row()]))
            .await
            .unwrap();

        let view = service.get_by_screen(screen.id).await.unwrap();
        assert_eq!(view.seat_types[&SeatType::Regular].row_count, 2);
        assert_eq!(view.seat_types[&SeatType::Vip].row_count, 1);
        assert_eq!(view.seat_types[&SeatType::Vip].price, 300.0);
        assert!(!view.seat_types.contains_key(&SeatType::Premium));
    }

    #[tokio::test]
    async fn partial_update_keeps_stored_tiers_and_replaces_seats() {
        let (service, store, screen) = setup();
        let created = service
            .create(request(screen.id, 3, 2, vec![vip_row()]))
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                SeatLayoutChanges {
                    cols: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.seats.len(), 12);
        assert_eq!(updated.tiers, created.tiers);
        assert!(updated.seats[8..].iter().all(|s| s.seat_type == SeatType::Vip));
        assert!(updated
            .seats
            .iter()
            .all(|s| created.seats.iter().all(|old| old.id != s.id)));
        let screen = store.find_screen(screen.id).await.unwrap().unwrap();
        assert_eq!(screen.total_seats, 12);
    }

    #[tokio::test]
    async fn update_of_unknown_layout_is_not_found() {
        let (service, _, _) = setup();
        let err = service
            .update(Uuid::new_v4(), SeatLayoutChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn availability_touches_only_matching_seats() {
        let (service, _, screen) = setup();
        let created = service.create(request(screen.id, 2, 2, vec![])).await.unwrap();

        let updated = service
            .update_availability(
                created.id,
                SeatAvailabilityRequest {
                    seats: vec![
                        SeatAvailabilityUpdate {
                            row: "A".into(),
                            seat_number: 2,
                            is_available: false,
                        },
                        SeatAvailabilityUpdate {
                            row: "Z".into(),
                            seat_number: 9,
                            is_available: false,
                        },
                    ],
                },
            )
            .await
            .unwrap();

        let closed: Vec<String> = updated
            .seats
            .iter()
            .filter(|s| !s.is_available)
            .map(|s| s.key())
            .collect();
        assert_eq!(closed, vec!["A-2".to_string()]);
    }

    #[tokio::test]
    async fn delete_unlinks_the_screen() {
        let (service, store, screen) = setup();
        let created = service.create(request(screen.id, 2, 2, vec![])).await.unwrap();

        service.delete(created.id).await.unwrap();

        let screen = store.find_screen(screen.id).await.unwrap().unwrap();
        assert_eq!(screen.seat_layout_id, None);
        assert!(!screen.is_complete);
        assert!(matches!(
            service.delete(created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_by_screen(screen.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn regeneration_resets_booked_and_blocked_seats() {
        let (service, store, screen) = setup();
        let created = service.create(request(screen.id, 2, 2, vec![])).await.unwrap();

        let claim = store
            .claim_seats(BookingDraft {
                user_id: Uuid::new_v4(),
                show_id: Uuid::new_v4(),
                seat_layout_id: created.id,
                screen_id: screen.id,
                theater_id: created.theater_id,
                seat_ids: vec![created.seats[0].id],
            })
            .await
            .unwrap();
        assert!(matches!(claim, SeatClaim::Claimed { .. }));
        service
            .update_availability(
                created.id,
                SeatAvailabilityRequest {
                    seats: vec![SeatAvailabilityUpdate {
                        row: "B".into(),
                        seat_number: 2,
                        is_available: false,
                    }],
                },
            )
            .await
            .unwrap();

        service
            .update(created.id, SeatLayoutChanges::default())
            .await
            .unwrap();

        let stored = store.find_seat_layout(created.id).await.unwrap().unwrap();
        assert_eq!(stored.seats.len(), 4);
        assert!(stored.seats.iter().all(|s| s.is_available && !s.is_booked));
    }

    /// Backend that lets a layout change land between a reader's store read
    /// and its cache write.
    struct ChangeBeforeWrite {
        inner: MemoryCache,
        store: MemoryStore,
        screen_id: Uuid,
        pending: Mutex<Option<Uuid>>,
    }

    #[async_trait]
    impl CacheBackend for ChangeBeforeWrite {
        async fn get(&self, key: &str) -> RedisResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> RedisResult<()> {
            let pending = self.pending.lock().take();
            if let Some(layout_id) = pending {
                let closed = SeatAvailabilityUpdate {
                    row: "A".into(),
                    seat_number: 1,
                    is_available: false,
                };
                self.store
                    .update_seat_availability(layout_id, &[closed])
                    .await
                    .unwrap();
                self.inner.incr(&generation_key(self.screen_id)).await?;
            }
            self.inner.set_ex(key, value, ttl_secs).await
        }

        async fn incr(&self, key: &str) -> RedisResult<i64> {
            self.inner.incr(key).await
        }
    }

    #[tokio::test]
    async fn view_read_before_a_concurrent_change_is_not_served_later() {
        let (_, store, screen) = setup();
        let backend = Arc::new(ChangeBeforeWrite {
            inner: MemoryCache::new(),
            store: store.clone(),
            screen_id: screen.id,
            pending: Mutex::new(None),
        });
        let service = SeatLayoutService::new(
            Arc::new(store.clone()),
            CacheService::with_backend(backend.clone(), 60),
        );
        let created = service.create(request(screen.id, 1, 2, vec![])).await.unwrap();
        *backend.pending.lock() = Some(created.id);

        let stale = service.get_by_screen(screen.id).await.unwrap();
        assert!(stale.seat_layout.seats.iter().all(|s| s.is_available));

        let fresh = service.get_by_screen(screen.id).await.unwrap();
        assert!(!fresh.seat_layout.seats[0].is_available);
        assert!(fresh.seat_layout.seats[1].is_available);
    }

    #[tokio::test]
    async fn booking_retires_the_cached_view() {
        let (_, store, screen) = setup();
        let cache = CacheService::with_backend(Arc::new(MemoryCache::new()), 60);
        let service = SeatLayoutService::new(Arc::new(store.clone()), cache.clone());
        let bookings = BookingService::new(Arc::new(store.clone()), cache, None);
        let created = service.create(request(screen.id, 1, 2, vec![])).await.unwrap();

        let before = service.get_by_screen(screen.id).await.unwrap();
        assert_eq!(before.seat_layout.booked_seats(), 0);
        assert_eq!(service.get_by_screen(screen.id).await.unwrap(), before);

        bookings
            .book_seats(
                Uuid::new_v4(),
                BookSeatsRequest {
                    seat_ids: vec![created.seats[1].id],
                    show_id: Uuid::new_v4(),
                },
            )
            .await
            .unwrap();

        let after = service.get_by_screen(screen.id).await.unwrap();
        assert!(after.seat_layout.seats[1].is_booked);
        assert!(!after.seat_layout.seats[0].is_booked);
    }

    #[tokio::test]
    async fn regeneration_retires_the_cached_view() {
        let (_, store, screen) = setup();
        let cache = CacheService::with_backend(Arc::new(MemoryCache::new()), 60);
        let service = SeatLayoutService::new(Arc::new(store.clone()), cache);
        let created = service.create(request(screen.id, 1, 2, vec![])).await.unwrap();
        service.get_by_screen(screen.id).await.unwrap();

        service
            .update(
                created.id,
                SeatLayoutChanges {
                    rows: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let view = service.get_by_screen(screen.id).await.unwrap();
        assert_eq!(view.seat_layout.seats.len(), 4);
    }
}
