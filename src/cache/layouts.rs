//! Cached layout views, keyed by a per-screen generation.
//!
//! Every change to a screen's layout bumps its generation instead of deleting
//! the cached view. A reader takes the generation before it reads the store
//! and writes its view under that generation, so a view read before a
//! concurrent change lands under a key no later reader asks for.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::models::SeatLayoutView;

pub(crate) fn generation_key(screen_id: Uuid) -> String {
    format!("seat_layout_gen:{}", screen_id)
}

fn layout_key(screen_id: Uuid, generation: i64) -> String {
    format!("seat_layout:{}:{}", screen_id, generation)
}

impl CacheService {
    /// Current generation of a screen's layout, 0 before the first change.
    /// `None` when caching is off or the backend is unreachable.
    pub async fn layout_generation(&self, screen_id: Uuid) -> Option<i64> {
        let backend = self.backend.as_ref()?;
        match backend.get(&generation_key(screen_id)).await {
            Ok(value) => Some(value.and_then(|v| v.parse().ok()).unwrap_or(0)),
            Err(e) => {
                warn!("layout generation read failed for screen {}: {:?}", screen_id, e);
                None
            }
        }
    }

    pub async fn get_layout(&self, screen_id: Uuid, generation: i64) -> Option<SeatLayoutView> {
        let backend = self.backend.as_ref()?;

        let data = match backend.get(&layout_key(screen_id, generation)).await {
            Ok(data) => data,
            Err(e) => {
                warn!("layout cache read failed for screen {}: {:?}", screen_id, e);
                return None;
            }
        };

        let view = serde_json::from_str(&data?).ok();
        if view.is_some() {
            debug!("layout cache hit for screen {} (gen {})", screen_id, generation);
        }
        view
    }

    pub async fn save_layout(&self, screen_id: Uuid, generation: i64, view: &SeatLayoutView) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let Ok(data) = serde_json::to_string(view) else {
            return;
        };

        let result = backend
            .set_ex(&layout_key(screen_id, generation), data, self.layout_ttl_secs)
            .await;
        if let Err(e) = result {
            warn!("layout cache write failed for screen {}: {:?}", screen_id, e);
        }
    }

    /// Retires every view cached for the screen so far.
    pub async fn invalidate_layout(&self, screen_id: Uuid) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        match backend.incr(&generation_key(screen_id)).await {
            Ok(generation) => debug!(
                "Invalidated layout cache for screen {} (gen {})",
                screen_id, generation
            ),
            Err(e) => warn!(
                "layout cache invalidation failed for screen {}: {:?}",
                screen_id, e
            ),
        }
    }
}
