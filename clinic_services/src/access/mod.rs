// clinic_services/src/access/mod.rs
pub mod access_control;

pub use access_control::{authorize, ensure, Action, Decision};
