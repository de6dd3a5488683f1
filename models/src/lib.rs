// models/src/lib.rs

pub mod errors;
pub mod identifiers;
pub mod medical;

pub use errors::{ClinicError, ClinicResult, ValidationError, ValidationResult};
pub use identifiers::{AccountId, AppointmentId, DepartmentId, DoctorId, PrescriptionId};
pub use medical::*;
