//! Dashboard module handler: widget layout.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::error::ActionError;
use crate::handler::{optional_str, required_str, step, unknown_operation, ModuleHandler};
use crate::types::{Action, ActionResult, Parameters, RollbackStep, UserContext};

const MODULE: &str = "dashboard";

pub struct DashboardHandler;

#[async_trait]
impl ModuleHandler for DashboardHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["add_widget", "update_widget", "remove_widget"]
    }

    async fn handle(
        &self,
        operation: &str,
        parameters: &Parameters,
        ctx: &UserContext,
    ) -> Result<ActionResult, ActionError> {
        match operation {
            "add_widget" => {
                let kind = required_str(parameters, "widgetType")?;
                // Callers may pin the id so the widget can be removed on rollback.
                let widget_id = optional_str(parameters, "widgetId")
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let position = parameters.get("position").cloned().unwrap_or(json!(null));
                tracing::info!(user_id = %ctx.user_id, kind = %kind, "Dashboard widget added");
                Ok(ActionResult::ok(
                    format!("Widget {} added", kind),
                    json!({"widgetId": widget_id, "widgetType": kind, "position": position}),
                ))
            }
            "update_widget" => {
                let widget_id = required_str(parameters, "widgetId")?;
                let settings = parameters
                    .get("settings")
                    .filter(|v| v.is_object())
                    .cloned()
                    .ok_or_else(|| {
                        ActionError::InvalidPayload("'settings' must be an object".to_string())
                    })?;
                tracing::info!(widget_id = %widget_id, "Dashboard widget updated");
                Ok(ActionResult::ok(
                    format!("Widget {} updated", widget_id),
                    json!({"widgetId": widget_id, "settings": settings}),
                ))
            }
            "remove_widget" => {
                let widget_id = required_str(parameters, "widgetId")?;
                tracing::info!(widget_id = %widget_id, "Dashboard widget removed");
                Ok(ActionResult::ok(
                    format!("Widget {} removed", widget_id),
                    json!({"widgetId": widget_id}),
                ))
            }
            other => Err(unknown_operation(MODULE, other)),
        }
    }

    fn rollback_steps(&self, action: &Action) -> Vec<RollbackStep> {
        match (action.operation.as_str(), optional_str(&action.parameters, "widgetId")) {
            ("add_widget", Some(widget_id)) => vec![step(
                MODULE,
                "remove_widget",
                0,
                &[("widgetId", json!(widget_id))],
            )],
            _ => Vec::new(),
        }
    }
}
