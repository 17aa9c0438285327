use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events pushed to every connected client, e.g.
/// `{"event":"seat_held","data":{"seatId":"…","userId":"…"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum SeatEvent {
    ClientConnected { client_id: String },
    SeatHeld { seat_id: Uuid, user_id: String },
    SeatReleased { seat_id: Uuid },
    SeatHoldFailed { seat_id: Uuid },
    SeatBooked { seat_id: Uuid },
}

/// Messages accepted from clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    HoldSeat { seat_id: Uuid, user_id: String },
    ReleaseSeat { seat_id: Uuid },
}

/// Process-wide fan-out of [`SeatEvent`]s.
#[derive(Clone)]
pub struct SeatEventHub {
    tx: broadcast::Sender<SeatEvent>,
}

impl SeatEventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeatEvent> {
        self.tx.subscribe()
    }

    /// Returns how many listeners received the event. Zero listeners is fine.
    pub fn publish(&self, event: SeatEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn seats_booked(&self, seat_ids: &[Uuid]) {
        for seat_id in seat_ids {
            self.publish(SeatEvent::SeatBooked { seat_id: *seat_id });
        }
    }
}
