// lib/src/lib.rs

pub mod config;
pub mod connectors;
pub mod storage_engine;

pub use config::{ClinicConfig, StorageEngineType};
pub use connectors::{DrugInfoSource, DrugRegistryClient, DRUG_NOT_FOUND, NO_DESCRIPTION_AVAILABLE};
pub use storage_engine::{create_storage, AccountStore, AppointmentLedger, StorageHandles};
