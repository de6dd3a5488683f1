pub mod drug_registry;

pub use drug_registry::*;
