// logging_service/src/lib.rs

pub mod log;

pub use crate::log::{filter_for, init_logging};
