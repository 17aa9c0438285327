pub mod booking;
pub mod screen;
pub mod seat;
pub mod seat_layout;
pub mod theater;
pub mod user;

pub use booking::{Booking, BookingDetails, BookingDraft, BookingFilter, BookingPage, Pagination};
pub use screen::Screen;
pub use seat::{Seat, SeatAvailabilityUpdate, SeatTier, SeatType};
pub use seat_layout::{SeatLayout, SeatLayoutView, SeatTypeSummary};
pub use theater::Theater;
pub use user::{Role, UserProfile};
