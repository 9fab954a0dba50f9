//! Calendar module handler.
//!
//! Placeholder until the calendar module owner supplies real operations:
//! every known operation reports `success = false`.

use async_trait::async_trait;

use crate::error::ActionError;
use crate::handler::{unknown_operation, ModuleHandler};
use crate::types::{ActionResult, Parameters, UserContext};

const MODULE: &str = "calendar";

pub struct CalendarHandler;

#[async_trait]
impl ModuleHandler for CalendarHandler {
    fn module_id(&self) -> &str {
        MODULE
    }

    fn operations(&self) -> &[&str] {
        &["create_event", "update_event", "delete_event"]
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
        Ok(ActionResult::failed("Calendar actions not yet implemented"))
    }
}
