pub mod coordinator;
pub mod holds;
pub mod sweeper;

pub use coordinator::{AvailabilityCoordinator, AvailabilityReport, CalendarDay, CapacityError};
pub use holds::HoldManager;
pub use sweeper::spawn_expiry_sweeper;
