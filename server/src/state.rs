// server/src/state.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use clinic_services::{
    AccountDirectory, AppointmentService, BcryptHasher, DepartmentService, PasswordHasher,
    PrescriptionService,
};
use lib::connectors::{DrugInfoSource, DrugRegistryClient};
use lib::storage_engine::{create_storage, StorageHandles};
use lib::ClinicConfig;

/// Services shared by every request handler.
pub struct AppState {
    pub directory: Arc<AccountDirectory>,
    pub departments: DepartmentService,
    pub appointments: AppointmentService,
    pub prescriptions: PrescriptionService,
}

impl AppState {
    pub fn wire(storage: StorageHandles, drug_info: Arc<dyn DrugInfoSource>) -> Self {
        Self::wire_with_hasher(storage, Arc::new(BcryptHasher::default()), drug_info)
    }

    pub fn wire_with_hasher(
        storage: StorageHandles,
        hasher: Arc<dyn PasswordHasher>,
        drug_info: Arc<dyn DrugInfoSource>,
    ) -> Self {
        let directory = Arc::new(AccountDirectory::new(storage.accounts.clone(), hasher));
        AppState {
            departments: DepartmentService::new(storage.accounts.clone(), directory.clone()),
            appointments: AppointmentService::new(directory.clone(), storage.ledger.clone()),
            prescriptions: PrescriptionService::new(directory.clone(), storage.ledger, drug_info),
            directory,
        }
    }

    /// Opens storage, builds the registry client and seeds the configured admin.
    pub async fn from_config(config: &ClinicConfig) -> Result<Arc<Self>> {
        let storage = create_storage(&config.storage)
            .await
            .context("failed to open clinic storage")?;
        info!("[Storage] {} engine ready", storage.engine_type);
        let client = DrugRegistryClient::new(&config.drug_registry)
            .context("failed to build drug registry client")?;
        let state = Self::wire(storage, Arc::new(client));

        if let Some(admin) = &config.bootstrap_admin {
            state
                .directory
                .ensure_admin(&admin.username, &admin.password, &admin.full_name)
                .await
                .with_context(|| format!("failed to seed admin account '{}'", admin.username))?;
            info!("[Accounts] Bootstrap admin '{}' is present", admin.username);
        }
        Ok(Arc::new(state))
    }
}
