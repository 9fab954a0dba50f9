//! Approval request state machine with validated transitions.
//!
//! Pending -> Approved | Rejected | Expired. Every other state is terminal.

use conductor_core::types::Timestamp;

use crate::error::ActionError;
use crate::types::{ApprovalRequest, ApprovalResponse, ApprovalStatus, ResponseKind};

/// Validate that request `id` may move from `from` to `to`.
pub fn validate_transition(
    id: &str,
    from: ApprovalStatus,
    to: ApprovalStatus,
) -> Result<(), ActionError> {
    let valid = matches!(
        (from, to),
        (ApprovalStatus::Pending, ApprovalStatus::Approved)
            | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
            | (ApprovalStatus::Pending, ApprovalStatus::Expired)
    );

    if valid {
        Ok(())
    } else {
        Err(ActionError::ApprovalClosed {
            id: id.to_string(),
            status: from,
        })
    }
}

/// Apply a reviewer's response to `request` as of `now`.
///
/// A pending request past its deadline is expired first and the response
/// is refused. `modify` records the response and leaves the request pending.
pub fn apply_response(
    request: &mut ApprovalRequest,
    response: ApprovalResponse,
    now: Timestamp,
) -> Result<(), ActionError> {
    if request.status == ApprovalStatus::Pending && request.expires_at.has_passed(now) {
        request.status = ApprovalStatus::Expired;
    }

    let next = match response.response {
        ResponseKind::Approve => ApprovalStatus::Approved,
        ResponseKind::Reject => ApprovalStatus::Rejected,
        ResponseKind::Modify => {
            if request.status != ApprovalStatus::Pending {
                return Err(ActionError::ApprovalClosed {
                    id: request.id.clone(),
                    status: request.status,
                });
            }
            request.responses.push(response);
            return Ok(());
        }
    };

    validate_transition(&request.id, request.status, next)?;
    request.status = next;
    request.responses.push(response);
    Ok(())
}

/// Expire `request` if it is pending and past its deadline.
///
/// Returns `true` if the status changed.
pub fn expire_if_due(request: &mut ApprovalRequest, now: Timestamp) -> bool {
    if request.expires_at.has_passed(now)
        && validate_transition(&request.id, request.status, ApprovalStatus::Expired).is_ok()
    {
        request.status = ApprovalStatus::Expired;
        true
    } else {
        false
    }
}
