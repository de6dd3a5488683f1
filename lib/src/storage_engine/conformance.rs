// lib/src/storage_engine/conformance.rs
//
// Behaviour every storage engine must share. Each engine's test module
// runs these against a fresh instance.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use models::errors::{ClinicError, ValidationError};
use models::identifiers::{AccountId, DepartmentId, DoctorId};
use models::medical::{
    Appointment, AppointmentStatus, DoctorProfile, NewAccount, NewAppointment, NewDepartment,
    NewDoctorProfile, NewPrescription, Role,
};

use crate::storage_engine::{AccountStore, AppointmentLedger};

fn new_account(username: &str, role: Role) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        password_hash: "$2b$04$notarealbcrypthash".to_string(),
        full_name: "Test Person".to_string(),
        role,
    }
}

fn new_prescription(medicine: &str) -> NewPrescription {
    NewPrescription {
        diagnosis: "flu".to_string(),
        medicine_name: medicine.to_string(),
        dosage: "500mg".to_string(),
        notes: "Drug registry info: drug not found in registry".to_string(),
    }
}

async fn seed_doctor<S: AccountStore>(store: &S, username: &str) -> (DepartmentId, DoctorProfile) {
    let dept = store
        .insert_department(NewDepartment { name: "Cardiology".into(), description: None })
        .await
        .unwrap();
    let (_, profile) = store
        .insert_doctor_account(
            new_account(username, Role::Doctor),
            NewDoctorProfile { department_id: dept.id, specialization: "Heart".into() },
        )
        .await
        .unwrap();
    (dept.id, profile)
}

async fn book<S: AppointmentLedger>(ledger: &S, patient: AccountId, doctor: DoctorId) -> Appointment {
    ledger
        .insert_appointment(NewAppointment {
            patient_id: patient,
            doctor_id: doctor,
            scheduled_time: Utc.with_ymd_and_hms(2030, 1, 15, 9, 30, 0).unwrap(),
        })
        .await
        .unwrap()
}

pub async fn unique_usernames<S: AccountStore>(store: &S) {
    let first = store.insert_account(new_account("alice1", Role::Patient)).await.unwrap();
    let dup = store.insert_account(new_account("alice1", Role::Admin)).await;
    assert_eq!(dup, Err(ClinicError::Validation(ValidationError::UsernameTaken)));

    let other = store.insert_account(new_account("bobby2", Role::Patient)).await.unwrap();
    assert!(other.id > first.id);

    let mut renamed = store.get_account(other.id).await.unwrap().unwrap();
    renamed.account.username = "alice1".to_string();
    let clash = store.update_account(renamed.clone()).await;
    assert_eq!(clash, Err(ClinicError::Validation(ValidationError::UsernameTaken)));

    renamed.account.username = "bobby3".to_string();
    store.update_account(renamed).await.unwrap();
    assert!(store.find_account_by_username("bobby2").await.unwrap().is_none());
    let found = store.find_account_by_username("bobby3").await.unwrap().unwrap();
    assert_eq!(found.account.id, other.id);

    // keeping one's own username is not a clash
    let same = store.get_account(first.id).await.unwrap().unwrap();
    store.update_account(same).await.unwrap();
}

pub async fn doctor_account_requires_department<S: AccountStore>(store: &S) {
    let missing = store
        .insert_doctor_account(
            new_account("drwho1", Role::Doctor),
            NewDoctorProfile { department_id: DepartmentId(99), specialization: "Time".into() },
        )
        .await;
    assert!(matches!(missing, Err(ClinicError::NotFound(_))));
    assert!(store.find_account_by_username("drwho1").await.unwrap().is_none());
    assert!(store.list_accounts().await.unwrap().is_empty());

    let (dept, profile) = seed_doctor(store, "drwho1").await;
    assert!(profile.available);
    assert_eq!(store.list_doctors_in_department(dept).await.unwrap(), vec![profile.clone()]);
    assert_eq!(store.find_doctor_by_account(profile.account_id).await.unwrap(), Some(profile));
}

pub async fn referenced_records_are_not_deleted<S: AccountStore + AppointmentLedger>(store: &S) {
    let (dept, profile) = seed_doctor(store, "drhouse").await;
    assert!(matches!(store.delete_department(dept).await, Err(ClinicError::InvalidState(_))));
    assert!(matches!(
        store.delete_account(profile.account_id).await,
        Err(ClinicError::InvalidState(_))
    ));

    let patient = store.insert_account(new_account("patient1", Role::Patient)).await.unwrap();
    book(store, patient.id, profile.id).await;
    assert!(matches!(store.delete_account(patient.id).await, Err(ClinicError::InvalidState(_))));

    let loner = store.insert_account(new_account("loner1", Role::Patient)).await.unwrap();
    store.delete_account(loner.id).await.unwrap();
    assert!(store.get_account(loner.id).await.unwrap().is_none());

    let spare = store
        .insert_department(NewDepartment { name: "Dermatology".into(), description: Some("Skin".into()) })
        .await
        .unwrap();
    let mut moved = profile.clone();
    moved.department_id = spare.id;
    store.update_doctor(moved, None).await.unwrap();
    store.delete_department(dept).await.unwrap();
    assert!(matches!(store.delete_department(dept).await, Err(ClinicError::NotFound(_))));
    assert!(matches!(store.delete_department(spare.id).await, Err(ClinicError::InvalidState(_))));
}

pub async fn appointments_listed_by_owner<S: AccountStore + AppointmentLedger>(store: &S) {
    let (_, doctor) = seed_doctor(store, "drgrey1").await;
    let p1 = store.insert_account(new_account("patient1", Role::Patient)).await.unwrap();
    let p2 = store.insert_account(new_account("patient2", Role::Patient)).await.unwrap();

    let a1 = book(store, p1.id, doctor.id).await;
    let a2 = book(store, p2.id, doctor.id).await;
    let a3 = book(store, p1.id, doctor.id).await;

    assert_eq!(a1.status, AppointmentStatus::Pending);
    assert_eq!(a1.version, 1);
    assert_eq!(store.list_for_patient(p1.id).await.unwrap(), vec![a1.clone(), a3.clone()]);
    assert_eq!(store.list_for_doctor(doctor.id).await.unwrap(), vec![a1.clone(), a2, a3]);
    assert_eq!(store.get_appointment(a1.id).await.unwrap(), Some(a1));
    assert!(store.list_for_doctor(DoctorId(404)).await.unwrap().is_empty());
}

pub async fn stale_version_conflicts<S: AccountStore + AppointmentLedger>(store: &S) {
    let (_, doctor) = seed_doctor(store, "drgrey1").await;
    let patient = store.insert_account(new_account("patient1", Role::Patient)).await.unwrap();
    let appt = book(store, patient.id, doctor.id).await;

    let approved = store
        .update_status(appt.id, appt.version, AppointmentStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.version, appt.version + 1);

    let late = store
        .update_status(appt.id, appt.version, AppointmentStatus::Rejected)
        .await;
    assert!(matches!(late, Err(ClinicError::Conflict(_))));
    let stored = store.get_appointment(appt.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Approved);
}

pub async fn completion_is_all_or_nothing<S: AccountStore + AppointmentLedger>(store: &S) {
    let (_, doctor) = seed_doctor(store, "drgrey1").await;
    let patient = store.insert_account(new_account("patient1", Role::Patient)).await.unwrap();
    let appt = book(store, patient.id, doctor.id).await;

    let pending = store
        .complete_with_prescription(appt.id, appt.version, new_prescription("Amoxicillin"))
        .await;
    assert_eq!(
        pending.map(|_| ()),
        Err(ClinicError::InvalidTransition {
            from: AppointmentStatus::Pending,
            to: AppointmentStatus::Completed,
        })
    );
    assert!(store.get_prescription_for_appointment(appt.id).await.unwrap().is_none());

    let approved = store
        .update_status(appt.id, appt.version, AppointmentStatus::Approved)
        .await
        .unwrap();
    let stale = store
        .complete_with_prescription(appt.id, appt.version, new_prescription("Amoxicillin"))
        .await;
    assert!(matches!(stale, Err(ClinicError::Conflict(_))));
    assert!(store.get_prescription_for_appointment(appt.id).await.unwrap().is_none());

    let (completed, rx) = store
        .complete_with_prescription(approved.id, approved.version, new_prescription("Amoxicillin"))
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert_eq!(rx.appointment_id, appt.id);
    assert_eq!(store.get_prescription_for_appointment(appt.id).await.unwrap(), Some(rx.clone()));
    assert_eq!(store.list_prescriptions_for_patient(patient.id).await.unwrap(), vec![rx]);

    let again = store
        .complete_with_prescription(completed.id, completed.version, new_prescription("Ibuprofen"))
        .await;
    assert!(matches!(again, Err(ClinicError::InvalidState(_))));
    assert_eq!(store.list_prescriptions_for_patient(patient.id).await.unwrap().len(), 1);
}

pub async fn racing_completions<S>(store: Arc<S>)
where
    S: AccountStore + AppointmentLedger + 'static,
{
    let (_, doctor) = seed_doctor(store.as_ref(), "drgrey1").await;
    let patient = store.insert_account(new_account("patient1", Role::Patient)).await.unwrap();
    let appt = book(store.as_ref(), patient.id, doctor.id).await;
    let approved = store
        .update_status(appt.id, appt.version, AppointmentStatus::Approved)
        .await
        .unwrap();
    let (id, version) = (approved.id, approved.version);

    let handles: Vec<_> = ["Amoxicillin", "Ibuprofen"]
        .into_iter()
        .map(|medicine| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .complete_with_prescription(id, version, new_prescription(medicine))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ClinicError::Conflict(_)) | Err(ClinicError::InvalidState(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(store.list_prescriptions_for_patient(patient.id).await.unwrap().len(), 1);
}

pub async fn appointments_require_live_participants<S: AccountStore + AppointmentLedger>(store: &S) {
    let (_, doctor) = seed_doctor(store, "drgrey1").await;
    let patient = store.insert_account(new_account("patient1", Role::Patient)).await.unwrap();
    store.delete_account(patient.id).await.unwrap();

    let orphan = store
        .insert_appointment(NewAppointment {
            patient_id: patient.id,
            doctor_id: doctor.id,
            scheduled_time: Utc.with_ymd_and_hms(2030, 1, 15, 9, 30, 0).unwrap(),
        })
        .await;
    assert!(matches!(orphan, Err(ClinicError::NotFound(_))));

    let live = store.insert_account(new_account("patient2", Role::Patient)).await.unwrap();
    let no_doctor = store
        .insert_appointment(NewAppointment {
            patient_id: live.id,
            doctor_id: DoctorId(42),
            scheduled_time: Utc.with_ymd_and_hms(2030, 1, 15, 9, 30, 0).unwrap(),
        })
        .await;
    assert!(matches!(no_doctor, Err(ClinicError::NotFound(_))));

    assert!(store.list_for_patient(patient.id).await.unwrap().is_empty());
    assert!(store.list_for_patient(live.id).await.unwrap().is_empty());
    store.delete_account(live.id).await.unwrap();
}

pub async fn doctor_update_is_all_or_nothing<S: AccountStore>(store: &S) {
    let (dept, profile) = seed_doctor(store, "drgrey1").await;

    let mut lost = profile.clone();
    lost.department_id = DepartmentId(999);
    lost.specialization = "Nowhere".into();
    let failed = store.update_doctor(lost, Some("Renamed Doctor".into())).await;
    assert!(matches!(failed, Err(ClinicError::NotFound(_))));
    let account = store.get_account(profile.account_id).await.unwrap().unwrap();
    assert_eq!(account.account.full_name, "Test Person");
    assert_eq!(store.get_doctor(profile.id).await.unwrap(), Some(profile.clone()));

    let mut changed = profile.clone();
    changed.specialization = "Cardiac surgery".into();
    let saved = store.update_doctor(changed, Some("Renamed Doctor".into())).await.unwrap();
    assert_eq!(saved.department_id, dept);
    assert_eq!(store.get_doctor(profile.id).await.unwrap(), Some(saved));
    let account = store.get_account(profile.account_id).await.unwrap().unwrap();
    assert_eq!(account.account.full_name, "Renamed Doctor");
}
