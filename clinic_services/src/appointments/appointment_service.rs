// clinic_services/src/appointments/appointment_service.rs
//! Appointment Service: booking and doctor-driven status transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};

use lib::storage_engine::AppointmentLedger;
use models::errors::{ClinicError, ClinicResult};
use models::identifiers::{AppointmentId, DoctorId};
use models::medical::{Appointment, AppointmentStatus, Caller, NewAppointment, StatusTrigger};

use crate::access::{ensure, Action};
use crate::accounts::AccountDirectory;

#[derive(Clone)]
pub struct AppointmentService {
    directory: Arc<AccountDirectory>,
    ledger: Arc<dyn AppointmentLedger>,
}

impl AppointmentService {
    pub fn new(directory: Arc<AccountDirectory>, ledger: Arc<dyn AppointmentLedger>) -> Self {
        Self { directory, ledger }
    }

    /// Books `caller` with `doctor_id` at `scheduled_time`. No overlap or
    /// availability check is made.
    pub async fn book(
        &self,
        caller: &Caller,
        doctor_id: DoctorId,
        scheduled_time: DateTime<Utc>,
    ) -> ClinicResult<Appointment> {
        ensure(caller, &Action::BookAppointment { patient_id: caller.account_id })?;
        let patient = self.directory.account(caller.account_id).await?;
        let doctor = self.directory.get_doctor(doctor_id).await?;

        let appointment = self
            .ledger
            .insert_appointment(NewAppointment {
                patient_id: patient.id,
                doctor_id: doctor.id,
                scheduled_time,
            })
            .await?;
        info!(
            "[Appointments] {} booked appointment {} with doctor {} at {}",
            patient.username, appointment.id, doctor.id, scheduled_time
        );
        Ok(appointment)
    }

    pub async fn list_for_patient(&self, caller: &Caller) -> ClinicResult<Vec<Appointment>> {
        ensure(caller, &Action::ListOwnAppointments)?;
        self.ledger.list_for_patient(caller.account_id).await
    }

    pub async fn list_for_doctor(&self, caller: &Caller) -> ClinicResult<Vec<Appointment>> {
        ensure(caller, &Action::ListAssignedAppointments)?;
        let profile = self
            .directory
            .doctor_for_caller(caller)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("doctor profile for account {}", caller.account_id)))?;
        self.ledger.list_for_doctor(profile.id).await
    }

    pub async fn get(&self, id: AppointmentId, caller: &Caller) -> ClinicResult<Appointment> {
        let appointment = self.fetch(id).await?;
        let caller_doctor = self.caller_doctor(caller).await?;
        ensure(caller, &Action::ViewAppointment { appointment: &appointment, caller_doctor })?;
        Ok(appointment)
    }

    /// Doctor-driven move out of PENDING. COMPLETED is reachable only by
    /// issuing a prescription, so asking for it here is an invalid transition.
    pub async fn transition_status(
        &self,
        id: AppointmentId,
        new_status: AppointmentStatus,
        caller: &Caller,
    ) -> ClinicResult<Appointment> {
        let appointment = self.fetch(id).await?;
        let caller_doctor = self.caller_doctor(caller).await?;
        ensure(caller, &Action::TransitionAppointment { appointment: &appointment, caller_doctor })?;

        appointment
            .status
            .validate_transition(new_status, StatusTrigger::DoctorAction)?;

        let updated = self
            .ledger
            .update_status(id, appointment.version, new_status)
            .await?;
        info!(
            "[Appointments] {} moved appointment {} from {} to {}",
            caller.username, id, appointment.status, updated.status
        );
        Ok(updated)
    }

    async fn fetch(&self, id: AppointmentId) -> ClinicResult<Appointment> {
        self.ledger
            .get_appointment(id)
            .await?
            .ok_or_else(|| ClinicError::not_found("appointment", id))
    }

    async fn caller_doctor(&self, caller: &Caller) -> ClinicResult<Option<DoctorId>> {
        let profile = self.directory.doctor_for_caller(caller).await?;
        debug!("[Appointments] {} resolves to doctor profile {:?}", caller.username, profile.as_ref().map(|p| p.id));
        Ok(profile.map(|p| p.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin_caller, directory_with_store, doctor_caller, patient_caller};
    use chrono::TimeZone;
    use lib::storage_engine::InMemoryStorage;
    use models::medical::NewPrescription;

    struct Fixture {
        service: AppointmentService,
        directory: Arc<AccountDirectory>,
        ledger: Arc<InMemoryStorage>,
        patient: Caller,
        doctor: Caller,
        doctor_id: DoctorId,
        other_doctor: Caller,
        admin: Caller,
    }

    async fn fixture() -> Fixture {
        let (directory, store) = directory_with_store();
        let directory = Arc::new(directory);
        let admin = admin_caller(&directory).await;
        let patient = patient_caller(&directory, "patient1").await;
        let doctor = doctor_caller(&directory, &store, &admin, "drgrey1").await;
        let other_doctor = doctor_caller(&directory, &store, &admin, "drhouse").await;
        let doctor_id = directory.doctor_for_caller(&doctor).await.unwrap().unwrap().id;
        Fixture {
            service: AppointmentService::new(directory.clone(), store.clone()),
            directory,
            ledger: store,
            patient,
            doctor,
            doctor_id,
            other_doctor,
            admin,
        }
    }

    fn slot() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 1, 14, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn should_book_pending_appointment_for_caller() -> anyhow::Result<()> {
        let f = fixture().await;
        let appt = f.service.book(&f.patient, f.doctor_id, slot()).await?;
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.patient_id, f.patient.account_id);
        assert_eq!(appt.doctor_id, f.doctor_id);
        assert_eq!(appt.scheduled_time, slot());

        let mine = f.service.list_for_patient(&f.patient).await?;
        assert_eq!(mine, vec![appt.clone()]);
        assert_eq!(f.service.list_for_doctor(&f.doctor).await?, vec![appt]);
        assert!(f.service.list_for_doctor(&f.other_doctor).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn should_reject_booking_by_non_patient_or_unknown_doctor() -> anyhow::Result<()> {
        let f = fixture().await;
        let err = f.service.book(&f.doctor, f.doctor_id, slot()).await.unwrap_err();
        assert!(matches!(err, ClinicError::AccessDenied(_)));

        let err = f.service.book(&f.patient, DoctorId(999), slot()).await.unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));
        assert!(f.service.list_for_patient(&f.patient).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn should_accept_double_booking_of_same_slot() -> anyhow::Result<()> {
        let f = fixture().await;
        let first = f.service.book(&f.patient, f.doctor_id, slot()).await?;
        let second = f.service.book(&f.patient, f.doctor_id, slot()).await?;
        assert_ne!(first.id, second.id);
        assert_eq!(f.service.list_for_doctor(&f.doctor).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn should_let_only_assigned_doctor_transition() -> anyhow::Result<()> {
        let f = fixture().await;
        let appt = f.service.book(&f.patient, f.doctor_id, slot()).await?;

        for intruder in [&f.other_doctor, &f.patient, &f.admin] {
            let err = f
                .service
                .transition_status(appt.id, AppointmentStatus::Approved, intruder)
                .await
                .unwrap_err();
            assert!(matches!(err, ClinicError::AccessDenied(_)), "{} was not denied", intruder.username);
        }

        let approved = f.service.transition_status(appt.id, AppointmentStatus::Approved, &f.doctor).await?;
        assert_eq!(approved.status, AppointmentStatus::Approved);
        assert_eq!(approved.version, appt.version + 1);
        Ok(())
    }

    #[tokio::test]
    async fn should_refuse_transitions_outside_the_table() -> anyhow::Result<()> {
        let f = fixture().await;
        let appt = f.service.book(&f.patient, f.doctor_id, slot()).await?;

        let err = f
            .service
            .transition_status(appt.id, AppointmentStatus::Completed, &f.doctor)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClinicError::InvalidTransition { from: AppointmentStatus::Pending, to: AppointmentStatus::Completed }
        );

        f.service.transition_status(appt.id, AppointmentStatus::Rejected, &f.doctor).await?;
        for target in [AppointmentStatus::Approved, AppointmentStatus::Pending, AppointmentStatus::Rejected] {
            let err = f.service.transition_status(appt.id, target, &f.doctor).await.unwrap_err();
            assert_eq!(err, ClinicError::InvalidTransition { from: AppointmentStatus::Rejected, to: target });
        }
        Ok(())
    }

    #[tokio::test]
    async fn should_refuse_doctor_moves_out_of_approved() -> anyhow::Result<()> {
        let f = fixture().await;
        let appt = f.service.book(&f.patient, f.doctor_id, slot()).await?;
        let approved = f.service.transition_status(appt.id, AppointmentStatus::Approved, &f.doctor).await?;

        for target in [
            AppointmentStatus::Approved,
            AppointmentStatus::Rejected,
            AppointmentStatus::Pending,
            AppointmentStatus::Completed,
        ] {
            let err = f.service.transition_status(appt.id, target, &f.doctor).await.unwrap_err();
            assert_eq!(err, ClinicError::InvalidTransition { from: AppointmentStatus::Approved, to: target });
        }
        assert_eq!(f.service.get(appt.id, &f.doctor).await?, approved);
        Ok(())
    }

    #[tokio::test]
    async fn should_refuse_every_move_out_of_completed() -> anyhow::Result<()> {
        let f = fixture().await;
        let appt = f.service.book(&f.patient, f.doctor_id, slot()).await?;
        let approved = f.service.transition_status(appt.id, AppointmentStatus::Approved, &f.doctor).await?;
        let (completed, _) = f
            .ledger
            .complete_with_prescription(
                approved.id,
                approved.version,
                NewPrescription {
                    diagnosis: "flu".into(),
                    medicine_name: "Amoxicillin".into(),
                    dosage: "500mg".into(),
                    notes: "Drug registry info: drug not found in registry".into(),
                },
            )
            .await?;

        for target in [
            AppointmentStatus::Approved,
            AppointmentStatus::Rejected,
            AppointmentStatus::Pending,
            AppointmentStatus::Completed,
        ] {
            let err = f.service.transition_status(appt.id, target, &f.doctor).await.unwrap_err();
            assert_eq!(err, ClinicError::InvalidTransition { from: AppointmentStatus::Completed, to: target });
        }
        assert_eq!(f.service.get(appt.id, &f.doctor).await?.version, completed.version);
        Ok(())
    }

    #[tokio::test]
    async fn should_report_missing_appointment_before_authorization() {
        let f = fixture().await;
        let err = f
            .service
            .transition_status(AppointmentId(404), AppointmentStatus::Approved, &f.patient)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_limit_single_appointment_view() -> anyhow::Result<()> {
        let f = fixture().await;
        let appt = f.service.book(&f.patient, f.doctor_id, slot()).await?;
        assert_eq!(f.service.get(appt.id, &f.patient).await?, appt);
        assert_eq!(f.service.get(appt.id, &f.doctor).await?, appt);
        assert_eq!(f.service.get(appt.id, &f.admin).await?, appt);

        let stranger = patient_caller(&f.directory, "patient2").await;
        assert!(matches!(f.service.get(appt.id, &stranger).await, Err(ClinicError::AccessDenied(_))));
        assert!(matches!(f.service.get(appt.id, &f.other_doctor).await, Err(ClinicError::AccessDenied(_))));
        Ok(())
    }
}
