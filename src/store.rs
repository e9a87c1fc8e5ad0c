// src/store.rs
//
// In-process document store standing in for the external one. Two collections
// keyed by generated id behind a single mutex; every compound operation
// (find+insert, check+insert, precondition-guarded update) runs under one
// lock acquisition, which is what closes the races on duplicate weeks,
// overlapping requests, and double review.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::aggregate::intervals_overlap;
use crate::model::{
    Page, TimeOffRequest, TimeOffStatus, Timesheet, TimesheetEntry, TimesheetStatus,
};
use crate::workflow::WorkflowError;

const ID_LEN: usize = 24;

fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[derive(Default)]
struct StoreInner {
    timesheets: HashMap<String, Timesheet>,
    time_off: HashMap<String, TimeOffRequest>,
}

#[derive(Default)]
pub struct Store {
    inner: Mutex<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Timesheets ---

    /// Find-or-create keyed uniquely on (employee, week_start_date). The scan
    /// and the insert happen under the same lock, so two concurrent saves for
    /// the same week cannot both create a sheet. Returns the stored sheet and
    /// whether it was newly created.
    pub fn upsert_timesheet(
        &self,
        employee: &str,
        week_start_date: NaiveDate,
        week_end_date: NaiveDate,
        entries: Vec<TimesheetEntry>,
        total_hours: f64,
    ) -> Result<(Timesheet, bool), WorkflowError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let now = Utc::now();

        let existing_id = inner
            .timesheets
            .values()
            .find(|ts| ts.employee == employee && ts.week_start_date == week_start_date)
            .map(|ts| ts.id.clone());

        if let Some(id) = existing_id {
            let ts = inner.timesheets.get_mut(&id).expect("id just looked up");
            if ts.status != TimesheetStatus::Draft {
                return Err(WorkflowError::invalid_state(
                    "Only draft timesheets can be updated",
                ));
            }
            ts.entries = entries;
            ts.total_hours = total_hours;
            ts.week_end_date = week_end_date;
            ts.updated_at = now;
            return Ok((ts.clone(), false));
        }

        let timesheet = Timesheet {
            id: generate_id(),
            employee: employee.to_string(),
            week_start_date,
            week_end_date,
            entries,
            status: TimesheetStatus::Draft,
            total_hours,
            submitted_at: None,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        inner
            .timesheets
            .insert(timesheet.id.clone(), timesheet.clone());
        Ok((timesheet, true))
    }

    /// Atomic read-modify-write. The closure sees a copy of the current
    /// record; nothing is written back unless it succeeds, so a failed
    /// precondition leaves no partial state.
    pub fn update_timesheet<F>(&self, id: &str, f: F) -> Result<Timesheet, WorkflowError>
    where
        F: FnOnce(&mut Timesheet) -> Result<(), WorkflowError>,
    {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = inner
            .timesheets
            .get_mut(id)
            .ok_or_else(|| WorkflowError::not_found("Timesheet"))?;

        let mut candidate = stored.clone();
        f(&mut candidate)?;
        candidate.updated_at = Utc::now();
        *stored = candidate.clone();
        Ok(candidate)
    }

    pub fn get_timesheet(&self, id: &str) -> Option<Timesheet> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.timesheets.get(id).cloned()
    }

    /// An employee's own sheets, newest week first.
    pub fn list_timesheets_for_employee(
        &self,
        employee: &str,
        status: Option<TimesheetStatus>,
        page: u64,
        limit: u64,
    ) -> Page<Timesheet> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut items: Vec<Timesheet> = inner
            .timesheets
            .values()
            .filter(|ts| ts.employee == employee)
            .filter(|ts| status.map_or(true, |s| ts.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.week_start_date.cmp(&a.week_start_date));
        paginate(items, page, limit)
    }

    /// Review queue for managers: everything Submitted, oldest submission
    /// first.
    pub fn list_pending_timesheets(&self, page: u64, limit: u64) -> Page<Timesheet> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut items: Vec<Timesheet> = inner
            .timesheets
            .values()
            .filter(|ts| ts.status == TimesheetStatus::Submitted)
            .cloned()
            .collect();
        items.sort_by_key(|ts| ts.submitted_at.unwrap_or(ts.created_at));
        paginate(items, page, limit)
    }

    // --- Time off ---

    /// Overlap check plus insert under one lock: if any {Pending, Approved}
    /// request for this employee intersects the candidate interval
    /// (inclusive bounds), nothing is written and Conflict is returned.
    pub fn insert_time_off_checked(
        &self,
        employee: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
        reason: String,
        days_requested: i64,
    ) -> Result<TimeOffRequest, WorkflowError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let now = Utc::now();

        let overlapping = inner.time_off.values().any(|req| {
            req.employee == employee
                && req.status.blocks_interval()
                && intervals_overlap(req.from_date, req.to_date, from_date, to_date)
        });
        if overlapping {
            return Err(WorkflowError::Conflict);
        }

        let request = TimeOffRequest {
            id: generate_id(),
            employee: employee.to_string(),
            from_date,
            to_date,
            reason,
            status: TimeOffStatus::Pending,
            days_requested,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        inner
            .time_off
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    pub fn update_time_off<F>(&self, id: &str, f: F) -> Result<TimeOffRequest, WorkflowError>
    where
        F: FnOnce(&mut TimeOffRequest) -> Result<(), WorkflowError>,
    {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let stored = inner
            .time_off
            .get_mut(id)
            .ok_or_else(|| WorkflowError::not_found("Time off request"))?;

        let mut candidate = stored.clone();
        f(&mut candidate)?;
        candidate.updated_at = Utc::now();
        *stored = candidate.clone();
        Ok(candidate)
    }

    pub fn get_time_off(&self, id: &str) -> Option<TimeOffRequest> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.time_off.get(id).cloned()
    }

    /// An employee's own requests, most recent first.
    pub fn list_time_off_for_employee(
        &self,
        employee: &str,
        status: Option<TimeOffStatus>,
        page: u64,
        limit: u64,
    ) -> Page<TimeOffRequest> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut items: Vec<TimeOffRequest> = inner
            .time_off
            .values()
            .filter(|req| req.employee == employee)
            .filter(|req| status.map_or(true, |s| req.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        paginate(items, page, limit)
    }

    /// Review queue for managers: everything Pending, oldest first.
    pub fn list_pending_time_off(&self, page: u64, limit: u64) -> Page<TimeOffRequest> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut items: Vec<TimeOffRequest> = inner
            .time_off
            .values()
            .filter(|req| req.status == TimeOffStatus::Pending)
            .cloned()
            .collect();
        items.sort_by_key(|req| req.created_at);
        paginate(items, page, limit)
    }
}

fn paginate<T>(items: Vec<T>, page: u64, limit: u64) -> Page<T> {
    let total = items.len() as u64;
    let total_pages = total.div_ceil(limit);
    let start = page.saturating_sub(1).saturating_mul(limit) as usize;
    let items = items
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();
    Page {
        items,
        total_pages,
        current_page: page,
        total,
    }
}
