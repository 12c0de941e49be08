pub mod coordinator;
pub mod sweeper;

pub use coordinator::{HoldGrant, ReservationCoordinator, ReserveError};
pub use sweeper::ExpirationSweeper;
