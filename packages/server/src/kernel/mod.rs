//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod scheduled_tasks;

pub use deps::build_state;
pub use scheduled_tasks::{reap_once, start_scheduler};
