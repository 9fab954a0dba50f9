//! Shift assignment service.
//!
//! Owns the shift roster. Both the `scheduling` module handler and the
//! HTTP scheduling routes call this service directly.

use conductor_core::error::ConductorError;
use conductor_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::ActionError;

/// Request to put an employee on a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRequest {
    pub shift_id: String,
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<Timestamp>,
}

/// A stored shift assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftAssignment {
    pub id: Uuid,
    pub shift_id: String,
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<Timestamp>,
    pub assigned_by: String,
    pub assigned_at: Timestamp,
}

/// Filter for [`ScheduleService::list_shifts`]. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftFilter {
    pub business_id: Option<String>,
    pub employee_id: Option<String>,
    pub shift_id: Option<String>,
}

/// In-memory roster of shift assignments.
#[derive(Default)]
pub struct ScheduleService {
    assignments: Mutex<Vec<ShiftAssignment>>,
}

impl ScheduleService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ShiftAssignment>>, ActionError> {
        self.assignments
            .lock()
            .map_err(|_| ConductorError::lock_poisoned("shift assignments").into())
    }

    /// Assign an employee to a shift.
    ///
    /// An employee holds at most one assignment per shift.
    pub fn assign_shift(
        &self,
        request: ShiftRequest,
        assigned_by: &str,
    ) -> Result<ShiftAssignment, ActionError> {
        if request.shift_id.trim().is_empty() || request.employee_id.trim().is_empty() {
            return Err(ActionError::InvalidPayload(
                "'shiftId' and 'employeeId' are required".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (request.starts_at, request.ends_at) {
            if end <= start {
                return Err(ActionError::InvalidPayload(
                    "Shift must end after it starts".to_string(),
                ));
            }
        }

        let mut assignments = self.lock()?;
        if assignments
            .iter()
            .any(|a| a.shift_id == request.shift_id && a.employee_id == request.employee_id)
        {
            return Err(ActionError::HandlerFailed(format!(
                "{} is already assigned to shift {}",
                request.employee_id, request.shift_id
            )));
        }

        let assignment = ShiftAssignment {
            id: Uuid::new_v4(),
            shift_id: request.shift_id,
            employee_id: request.employee_id,
            business_id: request.business_id,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            assigned_by: assigned_by.to_string(),
            assigned_at: Timestamp::now(),
        };
        assignments.push(assignment.clone());

        tracing::info!(
            shift_id = %assignment.shift_id,
            employee_id = %assignment.employee_id,
            "Shift assigned"
        );
        Ok(assignment)
    }

    /// Remove an employee from a shift, returning the removed assignment.
    pub fn unassign_shift(
        &self,
        shift_id: &str,
        employee_id: &str,
    ) -> Result<ShiftAssignment, ActionError> {
        let mut assignments = self.lock()?;
        let pos = assignments
            .iter()
            .position(|a| a.shift_id == shift_id && a.employee_id == employee_id)
            .ok_or_else(|| {
                ActionError::HandlerFailed(format!(
                    "{} is not assigned to shift {}",
                    employee_id, shift_id
                ))
            })?;
        let removed = assignments.remove(pos);
        tracing::info!(shift_id, employee_id, "Shift unassigned");
        Ok(removed)
    }

    /// Assignments matching `filter`, oldest first.
    pub fn list_shifts(&self, filter: &ShiftFilter) -> Result<Vec<ShiftAssignment>, ActionError> {
        let assignments = self.lock()?;
        let matches = |want: &Option<String>, have: Option<&str>| match want {
            Some(w) => have == Some(w.as_str()),
            None => true,
        };
        Ok(assignments
            .iter()
            .filter(|a| {
                matches(&filter.business_id, a.business_id.as_deref())
                    && matches(&filter.employee_id, Some(&a.employee_id))
                    && matches(&filter.shift_id, Some(&a.shift_id))
            })
            .cloned()
            .collect())
    }
}
