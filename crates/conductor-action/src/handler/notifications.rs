//! Notifications module handler.
//!
//! Delivers in-app notifications to users named in the parameters.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::error::ActionError;
use crate::handler::{optional_str, required_str, unknown_operation, ModuleHandler};
use crate::types::{ActionResult, Parameters, UserContext};

const MODULE: &str = "notifications";

pub struct NotificationsHandler;

#[async_trait]
impl ModuleHandler for NotificationsHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["send_notification", "mark_read"]
    }

    async fn handle(
        &self,
        operation: &str,
        parameters: &Parameters,
        ctx: &UserContext,
    ) -> Result<ActionResult, ActionError> {
        match operation {
            "send_notification" => {
                let recipient = required_str(parameters, "recipientId")?;
                let title = required_str(parameters, "title")?;
                let body = optional_str(parameters, "body").unwrap_or("");
                let notification_id = Uuid::new_v4().to_string();
                tracing::info!(
                    recipient = %recipient,
                    from = %ctx.user_id,
                    title = %title,
                    "Notification sent"
                );
                Ok(ActionResult::ok(
                    format!("Notification sent: {}", title),
                    json!({
                        "notificationId": notification_id,
                        "recipientId": recipient,
                        "title": title,
                        "body": body,
                    }),
                ))
            }
            "mark_read" => {
                let notification_id = required_str(parameters, "notificationId")?;
                Ok(ActionResult::ok(
                    "Notification marked as read",
                    json!({"notificationId": notification_id, "read": true}),
                ))
            }
            other => Err(unknown_operation(MODULE, other)),
        }
    }

    fn describe(&self, operation: &str, parameters: &Parameters) -> String {
        match operation {
            "send_notification" => format!(
                "Send notification: {}",
                optional_str(parameters, "title").unwrap_or("<no title>")
            ),
            other => format!("notifications {}", other.replace('_', " ")),
        }
    }
}
