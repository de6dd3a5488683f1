// clinic_services/src/lib.rs

pub mod access;
pub mod accounts;
pub mod appointments;
pub mod departments;
pub mod prescriptions;

#[cfg(test)]
mod test_support;

pub use access::{authorize, Action, Decision};
pub use accounts::*;
pub use appointments::*;
pub use departments::*;
pub use prescriptions::*;
