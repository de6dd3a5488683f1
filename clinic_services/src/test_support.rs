// clinic_services/src/test_support.rs
// Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as TokioMutex;

use lib::connectors::DrugInfoSource;
use lib::storage_engine::{AccountStore, InMemoryStorage};
use models::medical::{Caller, Department, NewDepartment};

use crate::accounts::{AccountDirectory, BcryptHasher, DoctorRequest, RegistrationRequest};

pub fn directory_with_store() -> (AccountDirectory, Arc<InMemoryStorage>) {
    let store = Arc::new(InMemoryStorage::new());
    let hasher = Arc::new(BcryptHasher::with_cost(4));
    (AccountDirectory::new(store.clone(), hasher), store)
}

pub async fn admin_caller(directory: &AccountDirectory) -> Caller {
    directory.ensure_admin("admin", "Adm1nPass!", "Clinic Admin").await.unwrap();
    directory.authenticate("admin", "Adm1nPass!").await.unwrap()
}

pub async fn patient_caller(directory: &AccountDirectory, username: &str) -> Caller {
    directory
        .register(RegistrationRequest {
            username: username.to_string(),
            password: "Patient1!".to_string(),
            full_name: "Pat Example".to_string(),
        })
        .await
        .unwrap();
    directory.authenticate(username, "Patient1!").await.unwrap()
}

pub async fn seed_department(store: &InMemoryStorage, name: &str) -> Department {
    store
        .insert_department(NewDepartment { name: name.to_string(), description: None })
        .await
        .unwrap()
}

/// Creates a doctor in a fresh department and returns the doctor's caller identity.
pub async fn doctor_caller(
    directory: &AccountDirectory,
    store: &InMemoryStorage,
    admin: &Caller,
    username: &str,
) -> Caller {
    let dept = seed_department(store, "General").await;
    directory
        .create_doctor(
            admin,
            DoctorRequest {
                username: username.to_string(),
                password: "Doctor12!".to_string(),
                full_name: "Doc Example".to_string(),
                specialization: "General practice".to_string(),
                department_id: dept.id,
            },
        )
        .await
        .unwrap();
    directory.authenticate(username, "Doctor12!").await.unwrap()
}

/// Answers every lookup with a fixed string and records the names asked for.
#[derive(Default)]
pub struct StubDrugInfo {
    pub answer: String,
    pub lookups: TokioMutex<Vec<String>>,
}

impl StubDrugInfo {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(StubDrugInfo { answer: answer.to_string(), lookups: TokioMutex::new(Vec::new()) })
    }
}

#[async_trait]
impl DrugInfoSource for StubDrugInfo {
    async fn lookup(&self, drug_name: &str) -> String {
        self.lookups.lock().await.push(drug_name.to_string());
        self.answer.clone()
    }

    async fn search(&self, prefix: &str) -> Vec<String> {
        vec![format!("{}ium", prefix)]
    }
}
