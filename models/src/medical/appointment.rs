// models/src/medical/appointment.rs
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ClinicError, ClinicResult, ValidationError};
use crate::identifiers::{AccountId, AppointmentId, DoctorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// What caused a status write. Completion is only reachable through a
/// prescription being issued, never through a direct doctor action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTrigger {
    DoctorAction,
    PrescriptionIssued,
}

/// A single allowed edge of the appointment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub trigger: StatusTrigger,
}

pub const APPOINTMENT_TRANSITIONS: &[StatusTransition] = &[
    StatusTransition {
        from: AppointmentStatus::Pending,
        to: AppointmentStatus::Approved,
        trigger: StatusTrigger::DoctorAction,
    },
    StatusTransition {
        from: AppointmentStatus::Pending,
        to: AppointmentStatus::Rejected,
        trigger: StatusTrigger::DoctorAction,
    },
    StatusTransition {
        from: AppointmentStatus::Approved,
        to: AppointmentStatus::Completed,
        trigger: StatusTrigger::PrescriptionIssued,
    },
];

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Approved => "APPROVED",
            AppointmentStatus::Rejected => "REJECTED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Rejected | AppointmentStatus::Completed)
    }

    /// Statuses reachable from `self` by the given trigger.
    pub fn next_states(&self, trigger: StatusTrigger) -> Vec<AppointmentStatus> {
        APPOINTMENT_TRANSITIONS
            .iter()
            .filter(|t| t.from == *self && t.trigger == trigger)
            .map(|t| t.to)
            .collect()
    }

    pub fn validate_transition(
        &self,
        to: AppointmentStatus,
        trigger: StatusTrigger,
    ) -> ClinicResult<()> {
        if self.next_states(trigger).contains(&to) {
            Ok(())
        } else {
            Err(ClinicError::InvalidTransition { from: *self, to })
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(AppointmentStatus::Pending),
            "APPROVED" => Ok(AppointmentStatus::Approved),
            "REJECTED" => Ok(AppointmentStatus::Rejected),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: AccountId,
    pub doctor_id: DoctorId,
    pub scheduled_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    /// Incremented on every status write; used for compare-and-set.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking input before the ledger assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: AccountId,
    pub doctor_id: DoctorId,
    pub scheduled_time: DateTime<Utc>,
}

impl NewAppointment {
    pub fn into_appointment(self, id: AppointmentId, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            scheduled_time: self.scheduled_time,
            status: AppointmentStatus::Pending,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Appointment {
    /// Applies a status write in place, bumping the version.
    pub fn apply_status(&mut self, status: AppointmentStatus, now: DateTime<Utc>) {
        self.status = status;
        self.version += 1;
        self.updated_at = now;
    }
}
