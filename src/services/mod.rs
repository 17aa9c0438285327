pub mod bookings;
pub mod seat_layouts;

pub use bookings::{BookSeatsRequest, BookingService};
pub use seat_layouts::{NewSeatLayout, SeatAvailabilityRequest, SeatLayoutChanges, SeatLayoutService};
