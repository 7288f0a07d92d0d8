pub mod config;
pub mod error;
pub mod model;

// Remote inventory and what is built from it
pub mod detail;
pub mod inventory;
pub mod snapshot;

// UI state
pub mod dashboard;
pub mod debug_log;
pub mod focus;
pub mod navigation;
pub mod projection;

// Background work
pub mod jobs;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;
