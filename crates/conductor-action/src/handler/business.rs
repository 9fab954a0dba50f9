//! Business module handler: workspace membership and roles.

use async_trait::async_trait;
use serde_json::json;

use crate::error::ActionError;
use crate::handler::{optional_str, required_str, unknown_operation, ModuleHandler};
use crate::types::{ActionResult, Parameters, UserContext};

const MODULE: &str = "business";
const ROLES: &[&str] = &["owner", "admin", "manager", "employee"];

pub struct BusinessHandler;

fn business_id<'a>(parameters: &'a Parameters, ctx: &'a UserContext) -> Result<&'a str, ActionError> {
    optional_str(parameters, "businessId")
        .or(ctx.business_id.as_deref())
        .ok_or_else(|| ActionError::InvalidPayload("No business in parameters or user context".to_string()))
}

fn validate_role(role: &str) -> Result<(), ActionError> {
    if ROLES.contains(&role) {
        Ok(())
    } else {
        Err(ActionError::InvalidPayload(format!(
            "Unknown role '{}'; expected one of {}",
            role,
            ROLES.join(", ")
        )))
    }
}

#[async_trait]
impl ModuleHandler for BusinessHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["invite_member", "assign_role", "remove_member"]
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
        let business_id = business_id(parameters, ctx)?;
        match operation {
            "invite_member" => {
                let email = required_str(parameters, "email")?;
                if !email.contains('@') {
                    return Err(ActionError::InvalidPayload(format!("Invalid email: {}", email)));
                }
                let role = optional_str(parameters, "role").unwrap_or("employee");
                validate_role(role)?;
                tracing::info!(business_id = %business_id, role, "Business member invited");
                Ok(ActionResult::ok(
                    format!("Invitation sent to {}", email),
                    json!({"businessId": business_id, "email": email, "role": role}),
                ))
            }
            "assign_role" => {
                let member = required_str(parameters, "memberId")?;
                let role = required_str(parameters, "role")?;
                validate_role(role)?;
                tracing::info!(business_id = %business_id, member = %member, role, "Business role assigned");
                Ok(ActionResult::ok(
                    format!("{} is now {}", member, role),
                    json!({"businessId": business_id, "memberId": member, "role": role}),
                ))
            }
            "remove_member" => {
                let member = required_str(parameters, "memberId")?;
                if member == ctx.user_id {
                    return Err(ActionError::HandlerFailed(
                        "Members cannot remove themselves".to_string(),
                    ));
                }
                tracing::info!(business_id = %business_id, member = %member, "Business member removed");
                Ok(ActionResult::ok(
                    format!("{} removed", member),
                    json!({"businessId": business_id, "memberId": member}),
                ))
            }
            other => Err(unknown_operation(MODULE, other)),
        }
    }
}
