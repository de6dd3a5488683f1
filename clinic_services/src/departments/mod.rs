// clinic_services/src/departments/mod.rs
pub mod department_service;

pub use department_service::{DepartmentRequest, DepartmentService};
