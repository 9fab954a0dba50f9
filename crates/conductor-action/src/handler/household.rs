//! Household module handler: chores and their assignment.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::error::ActionError;
use crate::handler::{optional_str, required_str, unknown_operation, ModuleHandler};
use crate::types::{ActionResult, Parameters, UserContext};

const MODULE: &str = "household";

pub struct HouseholdHandler;

impl HouseholdHandler {
    fn household_id<'a>(parameters: &'a Parameters, ctx: &'a UserContext) -> Result<&'a str, ActionError> {
        optional_str(parameters, "householdId")
            .or(ctx.household_id.as_deref())
            .ok_or_else(|| {
                ActionError::InvalidPayload("No household in parameters or user context".to_string())
            })
    }
}

#[async_trait]
impl ModuleHandler for HouseholdHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["create_chore", "assign_chore", "complete_chore"]
    }

    async fn handle(
        &self,
        operation: &str,
        parameters: &Parameters,
        ctx: &UserContext,
    ) -> Result<ActionResult, ActionError> {
        if !self.supports(operation) {
            return Err(unknown_operation(MODULE, operation));
        }
        let household_id = Self::household_id(parameters, ctx)?;
        match operation {
            "create_chore" => {
                let title = required_str(parameters, "title")?;
                let chore_id = Uuid::new_v4().to_string();
                tracing::info!(household_id = %household_id, title = %title, "Chore created");
                Ok(ActionResult::ok(
                    format!("Chore created: {}", title),
                    json!({"choreId": chore_id, "householdId": household_id, "title": title}),
                ))
            }
            "assign_chore" => {
                let chore_id = required_str(parameters, "choreId")?;
                let assignee = required_str(parameters, "assigneeId")?;
                tracing::info!(chore_id = %chore_id, assignee = %assignee, "Chore assigned");
                Ok(ActionResult::ok(
                    format!("Chore {} assigned to {}", chore_id, assignee),
                    json!({"choreId": chore_id, "assigneeId": assignee}),
                ))
            }
            "complete_chore" => {
                let chore_id = required_str(parameters, "choreId")?;
                tracing::info!(chore_id = %chore_id, by = %ctx.user_id, "Chore completed");
                Ok(ActionResult::ok(
                    format!("Chore {} completed", chore_id),
                    json!({"choreId": chore_id, "completedBy": ctx.user_id}),
                ))
            }
            other => Err(unknown_operation(MODULE, other)),
        }
    }
}
