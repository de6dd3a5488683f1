// clinic_services/src/prescriptions/prescription_service.rs
//! Prescription Service: completes an approved appointment by issuing its
//! prescription, enriched with drug registry text.

use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use lib::connectors::DrugInfoSource;
use lib::storage_engine::AppointmentLedger;
use models::errors::{ClinicError, ClinicResult};
use models::identifiers::AppointmentId;
use models::medical::{AppointmentStatus, Caller, NewPrescription, Prescription, StatusTrigger};

use crate::access::{ensure, Action};
use crate::accounts::validation::require_text;
use crate::accounts::AccountDirectory;

pub const NOTES_PREFIX: &str = "Drug registry info: ";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRequest {
    pub appointment_id: AppointmentId,
    pub diagnosis: String,
    pub medicine_name: String,
    pub dosage: String,
}

#[derive(Clone)]
pub struct PrescriptionService {
    directory: Arc<AccountDirectory>,
    ledger: Arc<dyn AppointmentLedger>,
    drug_info: Arc<dyn DrugInfoSource>,
}

impl PrescriptionService {
    pub fn new(
        directory: Arc<AccountDirectory>,
        ledger: Arc<dyn AppointmentLedger>,
        drug_info: Arc<dyn DrugInfoSource>,
    ) -> Self {
        Self { directory, ledger, drug_info }
    }

    /// Issues the prescription and completes the appointment in one unit of
    /// work. The registry lookup runs first and never fails the request.
    pub async fn create_prescription(
        &self,
        request: PrescriptionRequest,
        caller: &Caller,
    ) -> ClinicResult<Prescription> {
        let id = request.appointment_id;
        let appointment = self
            .ledger
            .get_appointment(id)
            .await?
            .ok_or_else(|| ClinicError::not_found("appointment", id))?;

        let caller_doctor = self.directory.doctor_for_caller(caller).await?.map(|p| p.id);
        ensure(caller, &Action::IssuePrescription { appointment: &appointment, caller_doctor })?;

        if appointment.status == AppointmentStatus::Completed {
            return Err(ClinicError::InvalidState(format!(
                "appointment {} is already completed and has a prescription",
                id
            )));
        }
        appointment
            .status
            .validate_transition(AppointmentStatus::Completed, StatusTrigger::PrescriptionIssued)?;

        let diagnosis = require_text("diagnosis", &request.diagnosis)?;
        let medicine_name = require_text("medicine name", &request.medicine_name)?;
        let dosage = require_text("dosage", &request.dosage)?;

        let description = self.drug_info.lookup(&medicine_name).await;
        debug!("[Prescriptions] Registry answered for {}: {}", medicine_name, description);

        let (completed, prescription) = self
            .ledger
            .complete_with_prescription(
                id,
                appointment.version,
                NewPrescription {
                    diagnosis,
                    medicine_name,
                    dosage,
                    notes: format!("{}{}", NOTES_PREFIX, description),
                },
            )
            .await?;
        info!(
            "[Prescriptions] {} issued prescription {} for appointment {} (now {})",
            caller.username, prescription.id, completed.id, completed.status
        );
        Ok(prescription)
    }

    pub async fn list_for_patient(&self, caller: &Caller) -> ClinicResult<Vec<Prescription>> {
        ensure(caller, &Action::ListOwnPrescriptions)?;
        self.ledger.list_prescriptions_for_patient(caller.account_id).await
    }

    pub async fn get_for_appointment(&self, id: AppointmentId, caller: &Caller) -> ClinicResult<Option<Prescription>> {
        let appointment = self
            .ledger
            .get_appointment(id)
            .await?
            .ok_or_else(|| ClinicError::not_found("appointment", id))?;
        let caller_doctor = self.directory.doctor_for_caller(caller).await?.map(|p| p.id);
        ensure(caller, &Action::ViewAppointment { appointment: &appointment, caller_doctor })?;
        self.ledger.get_prescription_for_appointment(id).await
    }

    pub async fn search_drugs(&self, caller: &Caller, prefix: &str) -> ClinicResult<Vec<String>> {
        ensure(caller, &Action::SearchDrugs)?;
        Ok(self.drug_info.search(prefix).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::AppointmentService;
    use crate::test_support::{
        admin_caller, directory_with_store, doctor_caller, patient_caller, StubDrugInfo,
    };
    use chrono::Utc;
    use lib::connectors::DRUG_NOT_FOUND;
    use models::errors::ValidationError;
    use models::identifiers::DoctorId;
    use models::medical::Appointment;

    struct Fixture {
        appointments: AppointmentService,
        prescriptions: PrescriptionService,
        drug_info: Arc<StubDrugInfo>,
        patient: Caller,
        doctor: Caller,
        doctor_id: DoctorId,
        other_doctor: Caller,
    }

    async fn fixture(answer: &str) -> Fixture {
        let (directory, store) = directory_with_store();
        let directory = Arc::new(directory);
        let admin = admin_caller(&directory).await;
        let patient = patient_caller(&directory, "patient1").await;
        let doctor = doctor_caller(&directory, &store, &admin, "drgrey1").await;
        let other_doctor = doctor_caller(&directory, &store, &admin, "drhouse").await;
        let doctor_id = directory.doctor_for_caller(&doctor).await.unwrap().unwrap().id;
        let drug_info = StubDrugInfo::answering(answer);
        Fixture {
            appointments: AppointmentService::new(directory.clone(), store.clone()),
            prescriptions: PrescriptionService::new(directory, store, drug_info.clone()),
            drug_info,
            patient,
            doctor,
            doctor_id,
            other_doctor,
        }
    }

    fn request(appointment: &Appointment) -> PrescriptionRequest {
        PrescriptionRequest {
            appointment_id: appointment.id,
            diagnosis: "flu".to_string(),
            medicine_name: "Amoxicillin".to_string(),
            dosage: "500mg".to_string(),
        }
    }

    async fn approved(f: &Fixture) -> Appointment {
        let appt = f.appointments.book(&f.patient, f.doctor_id, Utc::now()).await.unwrap();
        f.appointments
            .transition_status(appt.id, AppointmentStatus::Approved, &f.doctor)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn should_complete_approved_appointment_with_enriched_notes() -> anyhow::Result<()> {
        let f = fixture("Treats bacterial infections.").await;
        let appt = approved(&f).await;

        let rx = f.prescriptions.create_prescription(request(&appt), &f.doctor).await?;
        assert_eq!(rx.appointment_id, appt.id);
        assert_eq!(rx.notes, "Drug registry info: Treats bacterial infections.");
        assert_eq!(*f.drug_info.lookups.lock().await, vec!["Amoxicillin".to_string()]);

        let stored = f.appointments.get(appt.id, &f.patient).await?;
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert_eq!(f.prescriptions.list_for_patient(&f.patient).await?, vec![rx.clone()]);
        assert_eq!(f.prescriptions.get_for_appointment(appt.id, &f.patient).await?, Some(rx));
        Ok(())
    }

    #[tokio::test]
    async fn should_carry_sentinel_verbatim_into_notes() -> anyhow::Result<()> {
        let f = fixture(DRUG_NOT_FOUND).await;
        let appt = approved(&f).await;
        let rx = f.prescriptions.create_prescription(request(&appt), &f.doctor).await?;
        assert_eq!(rx.notes, format!("Drug registry info: {}", DRUG_NOT_FOUND));
        Ok(())
    }

    #[tokio::test]
    async fn should_refuse_second_prescription() -> anyhow::Result<()> {
        let f = fixture("desc").await;
        let appt = approved(&f).await;
        f.prescriptions.create_prescription(request(&appt), &f.doctor).await?;

        let err = f.prescriptions.create_prescription(request(&appt), &f.doctor).await.unwrap_err();
        assert!(matches!(err, ClinicError::InvalidState(_)));
        assert_eq!(f.prescriptions.list_for_patient(&f.patient).await?.len(), 1);
        assert_eq!(f.drug_info.lookups.lock().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn should_refuse_prescription_for_unapproved_appointment() -> anyhow::Result<()> {
        let f = fixture("desc").await;
        let pending = f.appointments.book(&f.patient, f.doctor_id, Utc::now()).await?;
        let err = f.prescriptions.create_prescription(request(&pending), &f.doctor).await.unwrap_err();
        assert_eq!(
            err,
            ClinicError::InvalidTransition { from: AppointmentStatus::Pending, to: AppointmentStatus::Completed }
        );

        let rejected = f.appointments.book(&f.patient, f.doctor_id, Utc::now()).await?;
        f.appointments
            .transition_status(rejected.id, AppointmentStatus::Rejected, &f.doctor)
            .await?;
        let err = f.prescriptions.create_prescription(request(&rejected), &f.doctor).await.unwrap_err();
        assert!(matches!(err, ClinicError::InvalidTransition { from: AppointmentStatus::Rejected, .. }));
        assert!(f.drug_info.lookups.lock().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn should_deny_unassigned_doctor_before_revealing_state() -> anyhow::Result<()> {
        let f = fixture("desc").await;
        let appt = approved(&f).await;
        f.prescriptions.create_prescription(request(&appt), &f.doctor).await?;

        let err = f
            .prescriptions
            .create_prescription(request(&appt), &f.other_doctor)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::AccessDenied(_)));
        let err = f.prescriptions.create_prescription(request(&appt), &f.patient).await.unwrap_err();
        assert!(matches!(err, ClinicError::AccessDenied(_)));
        Ok(())
    }

    #[tokio::test]
    async fn should_require_all_clinical_fields() -> anyhow::Result<()> {
        let f = fixture("desc").await;
        let appt = approved(&f).await;
        let mut req = request(&appt);
        req.dosage = "   ".to_string();

        let err = f.prescriptions.create_prescription(req, &f.doctor).await.unwrap_err();
        assert_eq!(err, ClinicError::Validation(ValidationError::RequiredField("dosage".to_string())));
        let stored = f.appointments.get(appt.id, &f.doctor).await?;
        assert_eq!(stored.status, AppointmentStatus::Approved);
        Ok(())
    }

    #[tokio::test]
    async fn should_report_missing_appointment() {
        let f = fixture("desc").await;
        let req = PrescriptionRequest {
            appointment_id: AppointmentId(404),
            diagnosis: "flu".into(),
            medicine_name: "Amoxicillin".into(),
            dosage: "500mg".into(),
        };
        let err = f.prescriptions.create_prescription(req, &f.doctor).await.unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_search_drugs_for_any_caller() -> anyhow::Result<()> {
        let f = fixture("desc").await;
        assert_eq!(f.prescriptions.search_drugs(&f.patient, "Amox").await?, vec!["Amoxium".to_string()]);
        Ok(())
    }
}
