// src/workflow.rs
//
// Workflow State Machine for both entity kinds. Every operation takes the
// acting principal explicitly, consults the access policy before any
// transition, and recomputes derived fields before anything is persisted.
// Errors short-circuit: a failed validation never reaches the overlap check.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::aggregate;
use crate::model::{
    Page, Principal, TimeOffRequest, TimeOffStatus, Timesheet, TimesheetStatus,
};
use crate::policy;
use crate::store::Store;
use crate::validation::{
    self, FieldError, ReviewAction, ReviewPayload, TimeOffPayload, TimesheetPayload,
};

// --- Error taxonomy ---

/// Every failure the core can produce. All recoverable at the request
/// boundary; the transport layer maps each variant to a status code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Invalid request payload")]
    Validation(Vec<FieldError>),

    #[error("You already have a time off request for this period")]
    Conflict,

    #[error("{message}")]
    InvalidState { message: String },

    #[error("Invalid action")]
    InvalidAction,

    #[error("Cannot submit empty timesheet")]
    EmptyPayload,

    #[error("Access denied")]
    AccessDenied,

    #[error("{resource} not found")]
    NotFound { resource: String },
}

impl WorkflowError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        WorkflowError::InvalidState {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        WorkflowError::NotFound {
            resource: resource.into(),
        }
    }
}

/// Listing parameters shared by every list operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// --- Service ---

#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<Store>,
}

impl WorkflowService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // --- Timesheets ---

    /// Create-or-update for the principal's own week. Idempotent per
    /// (employee, week); only Draft sheets (or absent ones) may be written.
    pub fn upsert_timesheet(
        &self,
        principal: &Principal,
        payload: &TimesheetPayload,
    ) -> Result<(Timesheet, bool), WorkflowError> {
        let valid = validation::validate_timesheet(payload).map_err(WorkflowError::Validation)?;

        let total_hours = aggregate::total_hours(&valid.entries);
        let week_end_date = aggregate::week_end(valid.week_start_date);

        let (timesheet, created) = self.store.upsert_timesheet(
            &principal.employee_id,
            valid.week_start_date,
            week_end_date,
            valid.entries,
            total_hours,
        )?;

        info!(
            employee = %principal.employee_id,
            week_start = %timesheet.week_start_date,
            total_hours = timesheet.total_hours,
            created,
            "timesheet saved"
        );
        Ok((timesheet, created))
    }

    pub fn submit_timesheet(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<Timesheet, WorkflowError> {
        let owner = principal.employee_id.clone();
        let timesheet = self.store.update_timesheet(id, |ts| {
            policy::require_owner_by_id(&owner, &ts.employee)?;
            if ts.status != TimesheetStatus::Draft {
                return Err(WorkflowError::invalid_state(
                    "Only draft timesheets can be submitted",
                ));
            }
            if ts.entries.is_empty() {
                return Err(WorkflowError::EmptyPayload);
            }
            ts.total_hours = aggregate::total_hours(&ts.entries);
            ts.status = TimesheetStatus::Submitted;
            ts.submitted_at = Some(Utc::now());
            Ok(())
        })?;

        info!(employee = %timesheet.employee, id, "timesheet submitted");
        Ok(timesheet)
    }

    pub fn review_timesheet(
        &self,
        principal: &Principal,
        id: &str,
        review: &ReviewPayload,
    ) -> Result<Timesheet, WorkflowError> {
        policy::require_manager(principal)?;

        let reviewer = principal.employee_id.clone();
        let timesheet = self.store.update_timesheet(id, |ts| {
            // State precondition comes first: a sheet that is not Submitted is
            // rejected regardless of what the action field says.
            if ts.status != TimesheetStatus::Submitted {
                return Err(WorkflowError::invalid_state(
                    "Only submitted timesheets can be reviewed",
                ));
            }
            let action =
                ReviewAction::parse(&review.action).ok_or(WorkflowError::InvalidAction)?;
            match action {
                ReviewAction::Approve => {
                    ts.status = TimesheetStatus::Approved;
                }
                ReviewAction::Reject => {
                    let reason =
                        validation::validate_rejection_reason(review.rejection_reason.as_deref())
                            .map_err(WorkflowError::Validation)?;
                    ts.status = TimesheetStatus::Rejected;
                    ts.rejection_reason = Some(reason);
                }
            }
            ts.reviewed_at = Some(Utc::now());
            ts.reviewed_by = Some(reviewer.clone());
            Ok(())
        })?;

        info!(
            reviewer = %principal.employee_id,
            id,
            status = ?timesheet.status,
            "timesheet reviewed"
        );
        Ok(timesheet)
    }

    pub fn get_timesheet(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<Timesheet, WorkflowError> {
        let timesheet = self
            .store
            .get_timesheet(id)
            .ok_or_else(|| WorkflowError::not_found("Timesheet"))?;
        policy::require_read_access(principal, &timesheet.employee)?;
        Ok(timesheet)
    }

    pub fn list_my_timesheets(
        &self,
        principal: &Principal,
        params: ListParams,
        status: Option<&str>,
    ) -> Result<Page<Timesheet>, WorkflowError> {
        let status = parse_status_filter(status, TimesheetStatus::parse)?;
        let (page, limit) = normalize_paging(params);
        Ok(self
            .store
            .list_timesheets_for_employee(&principal.employee_id, status, page, limit))
    }

    pub fn list_pending_timesheets(
        &self,
        principal: &Principal,
        params: ListParams,
    ) -> Result<Page<Timesheet>, WorkflowError> {
        policy::require_manager(principal)?;
        let (page, limit) = normalize_paging(params);
        Ok(self.store.list_pending_timesheets(page, limit))
    }

    // --- Time off ---

    /// Validate, check for overlapping {Pending, Approved} requests, then
    /// insert as Pending. Check and insert run atomically in the store, so a
    /// conflict writes nothing.
    pub fn create_time_off(
        &self,
        principal: &Principal,
        payload: &TimeOffPayload,
    ) -> Result<TimeOffRequest, WorkflowError> {
        let valid = validation::validate_time_off(payload).map_err(WorkflowError::Validation)?;

        let days_requested = aggregate::days_requested(valid.from_date, valid.to_date);
        let request = self.store.insert_time_off_checked(
            &principal.employee_id,
            valid.from_date,
            valid.to_date,
            valid.reason,
            days_requested,
        )?;

        info!(
            employee = %principal.employee_id,
            from = %request.from_date,
            to = %request.to_date,
            days = request.days_requested,
            "time off request created"
        );
        Ok(request)
    }

    pub fn review_time_off(
        &self,
        principal: &Principal,
        id: &str,
        review: &ReviewPayload,
    ) -> Result<TimeOffRequest, WorkflowError> {
        policy::require_manager(principal)?;

        let reviewer = principal.employee_id.clone();
        let request = self.store.update_time_off(id, |req| {
            if req.status != TimeOffStatus::Pending {
                return Err(WorkflowError::invalid_state(
                    "Only pending requests can be reviewed",
                ));
            }
            let action =
                ReviewAction::parse(&review.action).ok_or(WorkflowError::InvalidAction)?;
            match action {
                ReviewAction::Approve => {
                    req.status = TimeOffStatus::Approved;
                }
                ReviewAction::Reject => {
                    let reason =
                        validation::validate_rejection_reason(review.rejection_reason.as_deref())
                            .map_err(WorkflowError::Validation)?;
                    req.status = TimeOffStatus::Rejected;
                    req.rejection_reason = Some(reason);
                }
            }
            req.reviewed_at = Some(Utc::now());
            req.reviewed_by = Some(reviewer.clone());
            Ok(())
        })?;

        info!(
            reviewer = %principal.employee_id,
            id,
            status = ?request.status,
            "time off request reviewed"
        );
        Ok(request)
    }

    pub fn get_time_off(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<TimeOffRequest, WorkflowError> {
        let request = self
            .store
            .get_time_off(id)
            .ok_or_else(|| WorkflowError::not_found("Time off request"))?;
        policy::require_read_access(principal, &request.employee)?;
        Ok(request)
    }

    pub fn list_my_time_off(
        &self,
        principal: &Principal,
        params: ListParams,
        status: Option<&str>,
    ) -> Result<Page<TimeOffRequest>, WorkflowError> {
        let status = parse_status_filter(status, TimeOffStatus::parse)?;
        let (page, limit) = normalize_paging(params);
        Ok(self
            .store
            .list_time_off_for_employee(&principal.employee_id, status, page, limit))
    }

    pub fn list_pending_time_off(
        &self,
        principal: &Principal,
        params: ListParams,
    ) -> Result<Page<TimeOffRequest>, WorkflowError> {
        policy::require_manager(principal)?;
        let (page, limit) = normalize_paging(params);
        Ok(self.store.list_pending_time_off(page, limit))
    }
}

// --- Helpers ---

fn normalize_paging(params: ListParams) -> (u64, u64) {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).max(1);
    (page, limit)
}

fn parse_status_filter<S>(
    status: Option<&str>,
    parse: impl Fn(&str) -> Option<S>,
) -> Result<Option<S>, WorkflowError> {
    match status {
        None => Ok(None),
        Some(raw) => parse(raw).map(Some).ok_or_else(|| {
            WorkflowError::Validation(vec![FieldError {
                field: "status".to_string(),
                message: "Invalid status filter".to_string(),
            }])
        }),
    }
}
