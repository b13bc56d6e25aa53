//! Fulfillment assignment: working windows, round-robin scheduler and the
//! staff roster it draws from

pub mod roster;
pub mod scheduler;
pub mod window;

pub use roster::StaffRoster;
pub use scheduler::AssignmentScheduler;
pub use window::WorkingHours;
