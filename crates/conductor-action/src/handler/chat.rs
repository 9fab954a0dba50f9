//! Chat module handler.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::error::ActionError;
use crate::handler::{optional_str, required_str, unknown_operation, ModuleHandler};
use crate::types::{ActionResult, Parameters, UserContext};

const MODULE: &str = "chat";
const MAX_MESSAGE_LEN: usize = 4000;

pub struct ChatHandler;

#[async_trait]
impl ModuleHandler for ChatHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["send_message", "create_conversation", "archive_conversation"]
    }

    async fn handle(
        &self,
        operation: &str,
        parameters: &Parameters,
        ctx: &UserContext,
    ) -> Result<ActionResult, ActionError> {
        match operation {
            "send_message" => {
                let conversation_id = required_str(parameters, "conversationId")?;
                let content = required_str(parameters, "content")?;
                if content.chars().count() > MAX_MESSAGE_LEN {
                    return Err(ActionError::InvalidPayload(format!(
                        "Message exceeds {} characters",
                        MAX_MESSAGE_LEN
                    )));
                }
                let message_id = Uuid::new_v4().to_string();
                tracing::info!(
                    conversation_id = %conversation_id,
                    sender = %ctx.user_id,
                    len = content.len(),
                    "Chat message sent"
                );
                Ok(ActionResult::ok(
                    "Message sent",
                    json!({"messageId": message_id, "conversationId": conversation_id}),
                ))
            }
            "create_conversation" => {
                let participants: Vec<&str> = parameters
                    .get("participants")
                    .and_then(|v| v.as_array())
                    .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                if participants.is_empty() {
                    return Err(ActionError::InvalidPayload(
                        "A conversation needs at least one participant".to_string(),
                    ));
                }
                let conversation_id = Uuid::new_v4().to_string();
                let title = optional_str(parameters, "title");
                tracing::info!(participants = participants.len(), "Chat conversation created");
                Ok(ActionResult::ok(
                    "Conversation created",
                    json!({
                        "conversationId": conversation_id,
                        "participants": participants,
                        "title": title,
                    }),
                ))
            }
            "archive_conversation" => {
                let conversation_id = required_str(parameters, "conversationId")?;
                tracing::info!(conversation_id = %conversation_id, "Chat conversation archived");
                Ok(ActionResult::ok(
                    format!("Conversation {} archived", conversation_id),
                    json!({"conversationId": conversation_id, "archived": true}),
                ))
            }
            other => Err(unknown_operation(MODULE, other)),
        }
    }
}
