//! Tasks module handler. Placeholder, like calendar.

use async_trait::async_trait;

use crate::error::ActionError;
use crate::handler::{unknown_operation, ModuleHandler};
use crate::types::{ActionResult, Parameters, UserContext};

const MODULE: &str = "tasks";

pub struct TasksHandler;

#[async_trait]
impl ModuleHandler for TasksHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["create_task", "update_task", "complete_task"]
    }

    async fn handle(
        &self,
        operation: &str,
        _parameters: &Parameters,
        _ctx: &UserContext,
    ) -> Result<ActionResult, ActionError> {
        if !self.supports(operation) {
            return Err(unknown_operation(MODULE, operation));
        }
        Ok(ActionResult::failed("Task actions not yet implemented"))
    }
}
