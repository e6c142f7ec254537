pub mod api;
pub mod config;
pub mod error;
pub mod log_event;
pub mod log_record;
pub mod queue_entry;
