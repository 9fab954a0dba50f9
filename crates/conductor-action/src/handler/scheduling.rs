//! Scheduling module handler, backed by the shared [`ScheduleService`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ActionError;
use crate::handler::{optional_str, required_str, step, unknown_operation, ModuleHandler};
use crate::scheduling::{ScheduleService, ShiftFilter, ShiftRequest};
use crate::types::{Action, ActionResult, Parameters, RollbackStep, UserContext};

const MODULE: &str = "scheduling";

pub struct SchedulingHandler {
    schedule: Arc<ScheduleService>,
}

impl SchedulingHandler {
    pub fn new(schedule: Arc<ScheduleService>) -> Self {
        Self { schedule }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ActionError> {
    serde_json::to_value(value)
        .map_err(|e| ActionError::Storage(conductor_core::error::ConductorError::from(e)))
}

#[async_trait]
impl ModuleHandler for SchedulingHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["assign_shift", "unassign_shift", "list_shifts"]
    }

    async fn handle(
        &self,
        operation: &str,
        parameters: &Parameters,
        ctx: &UserContext,
    ) -> Result<ActionResult, ActionError> {
        match operation {
            "assign_shift" => {
                let mut request: ShiftRequest =
                    serde_json::from_value(Value::Object(parameters.clone()))
                        .map_err(|e| ActionError::InvalidPayload(e.to_string()))?;
                if request.business_id.is_none() {
                    request.business_id = ctx.business_id.clone();
                }
                let assignment = self.schedule.assign_shift(request, &ctx.user_id)?;
                Ok(ActionResult::ok(
                    format!(
                        "{} assigned to shift {}",
                        assignment.employee_id, assignment.shift_id
                    ),
                    to_value(&assignment)?,
                ))
            }
            "unassign_shift" => {
                let shift_id = required_str(parameters, "shiftId")?;
                let employee_id = required_str(parameters, "employeeId")?;
                let removed = self.schedule.unassign_shift(shift_id, employee_id)?;
                Ok(ActionResult::ok(
                    format!("{} removed from shift {}", employee_id, shift_id),
                    to_value(&removed)?,
                ))
            }
            "list_shifts" => {
                let filter = ShiftFilter {
                    business_id: optional_str(parameters, "businessId")
                        .map(str::to_string)
                        .or_else(|| ctx.business_id.clone()),
                    employee_id: optional_str(parameters, "employeeId").map(str::to_string),
                    shift_id: optional_str(parameters, "shiftId").map(str::to_string),
                };
                let shifts = self.schedule.list_shifts(&filter)?;
                Ok(ActionResult::ok(
                    format!("{} shift assignment(s)", shifts.len()),
                    json!({"shifts": to_value(&shifts)?}),
                ))
            }
            other => Err(unknown_operation(MODULE, other)),
        }
    }

    fn rollback_steps(&self, action: &Action) -> Vec<RollbackStep> {
        if action.operation != "assign_shift" {
            return Vec::new();
        }
        match (
            optional_str(&action.parameters, "shiftId"),
            optional_str(&action.parameters, "employeeId"),
        ) {
            (Some(shift_id), Some(employee_id)) => vec![step(
                MODULE,
                "unassign_shift",
                0,
                &[("shiftId", json!(shift_id)), ("employeeId", json!(employee_id))],
            )],
            _ => Vec::new(),
        }
    }

    fn describe(&self, operation: &str, parameters: &Parameters) -> String {
        match operation {
            "assign_shift" => format!(
                "Assign {} to shift {}",
                optional_str(parameters, "employeeId").unwrap_or("<employee>"),
                optional_str(parameters, "shiftId").unwrap_or("<shift>")
            ),
            other => format!("scheduling {}", other.replace('_', " ")),
        }
    }
}
