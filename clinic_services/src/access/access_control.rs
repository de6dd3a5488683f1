// clinic_services/src/access/access_control.rs
//! Role and ownership policy. Pure: no storage access, no side effects.
//! Services resolve whatever identity facts a rule needs (for instance the
//! caller's doctor profile) and pass them in with the action.

use models::errors::{ClinicError, ClinicResult};
use models::identifiers::{AccountId, DoctorId};
use models::medical::{Appointment, Caller, Role};

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    BookAppointment { patient_id: AccountId },
    ListOwnAppointments,
    ListOwnPrescriptions,
    ListAssignedAppointments,
    ViewAppointment { appointment: &'a Appointment, caller_doctor: Option<DoctorId> },
    TransitionAppointment { appointment: &'a Appointment, caller_doctor: Option<DoctorId> },
    IssuePrescription { appointment: &'a Appointment, caller_doctor: Option<DoctorId> },
    SearchDrugs,
    ViewDirectory,
    ManageAccounts,
    ManageDoctors,
    ManageDepartments,
    UpdateAccount { account_id: AccountId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> ClinicResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(ClinicError::AccessDenied(reason)),
        }
    }
}

fn require_role(caller: &Caller, role: Role, what: &str) -> Decision {
    if caller.is(role) {
        Decision::Allow
    } else {
        Decision::Deny(format!("only {} accounts may {}", role, what))
    }
}

fn assigned_doctor(
    caller: &Caller,
    appointment: &Appointment,
    caller_doctor: Option<DoctorId>,
    what: &str,
) -> Decision {
    if caller.is(Role::Doctor) && caller_doctor == Some(appointment.doctor_id) {
        Decision::Allow
    } else {
        Decision::Deny(format!(
            "only the doctor assigned to appointment {} may {}",
            appointment.id, what
        ))
    }
}

pub fn authorize(caller: &Caller, action: &Action<'_>) -> Decision {
    match *action {
        Action::BookAppointment { patient_id } => {
            if !caller.is(Role::Patient) {
                return require_role(caller, Role::Patient, "book appointments");
            }
            if patient_id != caller.account_id {
                return Decision::Deny("patients may only book for themselves".to_string());
            }
            Decision::Allow
        }
        // Scoped to the caller's own id by construction.
        Action::ListOwnAppointments | Action::ListOwnPrescriptions => Decision::Allow,
        Action::ListAssignedAppointments => {
            require_role(caller, Role::Doctor, "list assigned appointments")
        }
        Action::ViewAppointment { appointment, caller_doctor } => {
            if caller.is(Role::Admin)
                || appointment.patient_id == caller.account_id
                || (caller.is(Role::Doctor) && caller_doctor == Some(appointment.doctor_id))
            {
                Decision::Allow
            } else {
                Decision::Deny(format!("appointment {} is not visible to {}", appointment.id, caller.username))
            }
        }
        Action::TransitionAppointment { appointment, caller_doctor } => {
            assigned_doctor(caller, appointment, caller_doctor, "change its status")
        }
        Action::IssuePrescription { appointment, caller_doctor } => {
            assigned_doctor(caller, appointment, caller_doctor, "issue its prescription")
        }
        Action::SearchDrugs | Action::ViewDirectory => Decision::Allow,
        Action::ManageAccounts => require_role(caller, Role::Admin, "manage accounts"),
        Action::ManageDoctors => require_role(caller, Role::Admin, "manage doctors"),
        Action::ManageDepartments => require_role(caller, Role::Admin, "manage departments"),
        Action::UpdateAccount { account_id } => {
            if caller.is(Role::Admin) || caller.account_id == account_id {
                Decision::Allow
            } else {
                Decision::Deny("accounts may only be updated by their owner or an admin".to_string())
            }
        }
    }
}

/// `authorize` folded into a `ClinicResult`.
pub fn ensure(caller: &Caller, action: &Action<'_>) -> ClinicResult<()> {
    authorize(caller, action).into_result()
}
