//! Drive module handler.
//!
//! Folder and file operations. Create, move, and rename are reversible and
//! contribute rollback steps; delete and share are not.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::error::ActionError;
use crate::handler::{optional_str, required_str, step, unknown_operation, ModuleHandler};
use crate::types::{Action, ActionResult, Parameters, RollbackStep, UserContext};

const MODULE: &str = "drive";

pub struct DriveHandler;

#[async_trait]
impl ModuleHandler for DriveHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &[
            "create_folder",
            "delete_folder",
            "move_file",
            "rename_file",
            "share_file",
            "delete_file",
        ]
    }

    async fn handle(
        &self,
        operation: &str,
        parameters: &Parameters,
        ctx: &UserContext,
    ) -> Result<ActionResult, ActionError> {
        match operation {
            "create_folder" => {
                let name = required_str(parameters, "name")?;
                let parent_id = optional_str(parameters, "parentId");
                let folder_id = Uuid::new_v4().to_string();
                tracing::info!(user_id = %ctx.user_id, name = %name, "Drive folder created");
                Ok(ActionResult::ok(
                    format!("Folder created: {}", name),
                    json!({"folderId": folder_id, "name": name, "parentId": parent_id}),
                ))
            }
            "delete_folder" => {
                let name = required_str(parameters, "name")?;
                tracing::info!(user_id = %ctx.user_id, name = %name, "Drive folder deleted");
                Ok(ActionResult::ok(
                    format!("Folder deleted: {}", name),
                    json!({"name": name, "parentId": optional_str(parameters, "parentId")}),
                ))
            }
            "move_file" => {
                let file_id = required_str(parameters, "fileId")?;
                let to = required_str(parameters, "toFolderId")?;
                tracing::info!(file_id = %file_id, to = %to, "Drive file moved");
                Ok(ActionResult::ok(
                    format!("File {} moved", file_id),
                    json!({"fileId": file_id, "folderId": to}),
                ))
            }
            "rename_file" => {
                let file_id = required_str(parameters, "fileId")?;
                let new_name = required_str(parameters, "newName")?;
                tracing::info!(file_id = %file_id, new_name = %new_name, "Drive file renamed");
                Ok(ActionResult::ok(
                    format!("File renamed to {}", new_name),
                    json!({"fileId": file_id, "name": new_name}),
                ))
            }
            "share_file" => {
                let file_id = required_str(parameters, "fileId")?;
                let with = required_str(parameters, "userId")?;
                let permission = optional_str(parameters, "permission").unwrap_or("view");
                tracing::info!(file_id = %file_id, with = %with, permission, "Drive file shared");
                Ok(ActionResult::ok(
                    format!("File {} shared with {}", file_id, with),
                    json!({"fileId": file_id, "userId": with, "permission": permission}),
                ))
            }
            "delete_file" => {
                let file_id = required_str(parameters, "fileId")?;
                tracing::info!(file_id = %file_id, "Drive file deleted");
                Ok(ActionResult::ok(
                    format!("File {} deleted", file_id),
                    json!({"fileId": file_id}),
                ))
            }
            other => Err(unknown_operation(MODULE, other)),
        }
    }

    fn rollback_steps(&self, action: &Action) -> Vec<RollbackStep> {
        let p = &action.parameters;
        match action.operation.as_str() {
            "create_folder" => match optional_str(p, "name") {
                Some(name) => vec![step(
                    MODULE,
                    "delete_folder",
                    0,
                    &[
                        ("name", json!(name)),
                        ("parentId", json!(optional_str(p, "parentId"))),
                    ],
                )],
                None => Vec::new(),
            },
            "move_file" => match (optional_str(p, "fileId"), optional_str(p, "fromFolderId")) {
                (Some(file_id), Some(from)) => vec![step(
                    MODULE,
                    "move_file",
                    0,
                    &[("fileId", json!(file_id)), ("toFolderId", json!(from))],
                )],
                _ => Vec::new(),
            },
            "rename_file" => match (optional_str(p, "fileId"), optional_str(p, "oldName")) {
                (Some(file_id), Some(old)) => vec![step(
                    MODULE,
                    "rename_file",
                    0,
                    &[("fileId", json!(file_id)), ("newName", json!(old))],
                )],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn describe(&self, operation: &str, parameters: &Parameters) -> String {
        match operation {
            "create_folder" => format!(
                "Create folder {}",
                optional_str(parameters, "name").unwrap_or("<unnamed>")
            ),
            "delete_file" => format!(
                "Delete file {}",
                optional_str(parameters, "fileId").unwrap_or("<unknown>")
            ),
            other => format!("drive {}", other.replace('_', " ")),
        }
    }
}
