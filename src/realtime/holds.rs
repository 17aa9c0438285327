use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

use super::hub::{SeatEvent, SeatEventHub};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HoldError {
    #[error("seat {seat_id} is already held")]
    AlreadyHeld { seat_id: Uuid },
}

struct HoldEntry {
    user_id: String,
    /// Distinguishes this hold from a later one on the same seat, so a stale
    /// timer never releases a fresh hold.
    token: Uuid,
    timer: AbortHandle,
}

/// Advisory, memory-only seat holds with automatic expiry.
///
/// Holds are a UI hint shared between connected clients. Booking never
/// consults them.
#[derive(Clone)]
pub struct HoldRegistry {
    holds: Arc<Mutex<HashMap<Uuid, HoldEntry>>>,
    hub: SeatEventHub,
    ttl: Duration,
}

impl HoldRegistry {
    pub fn new(hub: SeatEventHub, ttl: Duration) -> Self {
        Self {
            holds: Arc::new(Mutex::new(HashMap::new())),
            hub,
            ttl,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn hold(&self, seat_id: Uuid, user_id: &str) -> Result<(), HoldError> {
        let mut holds = self.holds.lock();
        if holds.contains_key(&seat_id) {
            drop(holds);
            debug!("hold on seat {} refused, already held", seat_id);
            self.hub.publish(SeatEvent::SeatHoldFailed { seat_id });
            return Err(HoldError::AlreadyHeld { seat_id });
        }

        let token = Uuid::new_v4();
        let registry = self.clone();
        let ttl = self.ttl;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            registry.expire(seat_id, token);
        })
        .abort_handle();

        holds.insert(
            seat_id,
            HoldEntry {
                user_id: user_id.to_string(),
                token,
                timer,
            },
        );
        drop(holds);

        debug!("seat {} held by {}", seat_id, user_id);
        self.hub.publish(SeatEvent::SeatHeld {
            seat_id,
            user_id: user_id.to_string(),
        });
        Ok(())
    }

    /// Returns false when the seat was not held.
    pub fn release(&self, seat_id: Uuid) -> bool {
        let Some(entry) = self.holds.lock().remove(&seat_id) else {
            return false;
        };
        entry.timer.abort();

        debug!("seat {} released by {}", seat_id, entry.user_id);
        self.hub.publish(SeatEvent::SeatReleased { seat_id });
        true
    }

    pub fn holder(&self, seat_id: Uuid) -> Option<String> {
        self.holds.lock().get(&seat_id).map(|e| e.user_id.clone())
    }

    fn expire(&self, seat_id: Uuid, token: Uuid) {
        let mut holds = self.holds.lock();
        if holds.get(&seat_id).is_some_and(|e| e.token == token) {
            holds.remove(&seat_id);
            drop(holds);
            debug!("hold on seat {} expired", seat_id);
            self.hub.publish(SeatEvent::SeatReleased { seat_id });
        }
    }
}
