// clinic_services/src/departments/department_service.rs

use std::sync::Arc;

use log::info;
use serde::Deserialize;

use lib::storage_engine::AccountStore;
use models::errors::{ClinicError, ClinicResult};
use models::identifiers::DepartmentId;
use models::medical::{Caller, Department, DoctorListing, NewDepartment};

use crate::access::{ensure, Action};
use crate::accounts::validation::require_text;
use crate::accounts::AccountDirectory;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl DepartmentRequest {
    fn normalized(self) -> ClinicResult<NewDepartment> {
        Ok(NewDepartment {
            name: require_text("department name", &self.name)?,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}

pub struct DepartmentService {
    store: Arc<dyn AccountStore>,
    directory: Arc<AccountDirectory>,
}

impl DepartmentService {
    pub fn new(store: Arc<dyn AccountStore>, directory: Arc<AccountDirectory>) -> Self {
        Self { store, directory }
    }

    pub async fn list(&self, caller: &Caller) -> ClinicResult<Vec<Department>> {
        ensure(caller, &Action::ViewDirectory)?;
        self.store.list_departments().await
    }

    pub async fn doctors_in(&self, caller: &Caller, id: DepartmentId) -> ClinicResult<Vec<DoctorListing>> {
        ensure(caller, &Action::ViewDirectory)?;
        if self.store.get_department(id).await?.is_none() {
            return Err(ClinicError::not_found("department", id));
        }
        let profiles = self.store.list_doctors_in_department(id).await?;
        self.directory.listings(profiles).await
    }

    pub async fn create(&self, caller: &Caller, request: DepartmentRequest) -> ClinicResult<Department> {
        ensure(caller, &Action::ManageDepartments)?;
        let department = self.store.insert_department(request.normalized()?).await?;
        info!("[Departments] {} created department {} ({})", caller.username, department.name, department.id);
        Ok(department)
    }

    pub async fn update(&self, caller: &Caller, id: DepartmentId, request: DepartmentRequest) -> ClinicResult<Department> {
        ensure(caller, &Action::ManageDepartments)?;
        let department = request.normalized()?.into_department(id);
        let department = self.store.update_department(department).await?;
        info!("[Departments] {} updated department {}", caller.username, id);
        Ok(department)
    }

    pub async fn delete(&self, caller: &Caller, id: DepartmentId) -> ClinicResult<()> {
        ensure(caller, &Action::ManageDepartments)?;
        self.store.delete_department(id).await?;
        info!("[Departments] {} deleted department {}", caller.username, id);
        Ok(())
    }
}
