// src/policy.rs
//
// Access Policy: capability checks over the principal's role and ownership.
// Pure decisions; callers decide when to consult them.

use crate::model::{Principal, Role};
use crate::workflow::WorkflowError;

/// Listing pending items and reviewing are manager-only capabilities.
pub fn require_manager(principal: &Principal) -> Result<(), WorkflowError> {
    if principal.role != Role::Manager {
        return Err(WorkflowError::AccessDenied);
    }
    Ok(())
}

/// Write paths (submit, update) are restricted to the owning employee,
/// regardless of role. Managers act on others' records only through review.
pub fn require_owner_by_id(
    principal_employee_id: &str,
    employee_ref: &str,
) -> Result<(), WorkflowError> {
    if principal_employee_id != employee_ref {
        return Err(WorkflowError::AccessDenied);
    }
    Ok(())
}

/// Reads: an employee sees only their own records, a manager sees all.
/// Enforced symmetrically for timesheets and time-off requests.
pub fn require_read_access(principal: &Principal, employee_ref: &str) -> Result<(), WorkflowError> {
    match principal.role {
        Role::Manager => Ok(()),
        Role::Employee => require_owner_by_id(&principal.employee_id, employee_ref),
    }
}
