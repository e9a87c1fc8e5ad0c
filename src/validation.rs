// src/validation.rs
//
// Record Validator: pure field-level checks over wire-shaped payloads.
// Collects every failing field instead of stopping at the first one, and on
// success hands back fully typed values so the workflow never re-parses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Day, TimesheetEntry};

pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_REASON_CHARS: usize = 1000;
pub const MAX_REJECTION_REASON_CHARS: usize = 500;
pub const MAX_HOURS_PER_DAY: f64 = 24.0;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One failed field check. The taxonomy-level `Validation` error carries a
/// list of these, not just the first failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// --- Payloads (wire shape) ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetPayload {
    pub week_start_date: String,
    #[serde(default)]
    pub entries: Vec<EntryPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryPayload {
    pub day: String,
    pub hours: f64,
    pub project: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffPayload {
    pub from_date: String,
    pub to_date: String,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPayload {
    pub action: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn parse(s: &str) -> Option<ReviewAction> {
        match s {
            "approve" => Some(ReviewAction::Approve),
            "reject" => Some(ReviewAction::Reject),
            _ => None,
        }
    }
}

// --- Validated results ---

#[derive(Debug, Clone, PartialEq)]
pub struct ValidTimesheet {
    pub week_start_date: NaiveDate,
    pub entries: Vec<TimesheetEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidTimeOff {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
}

// --- Validators ---

pub fn validate_timesheet(payload: &TimesheetPayload) -> Result<ValidTimesheet, Vec<FieldError>> {
    let mut errors = Vec::new();

    let week_start_date = match NaiveDate::parse_from_str(&payload.week_start_date, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError::new(
                "weekStartDate",
                "Please provide a valid week start date",
            ));
            None
        }
    };

    if payload.entries.is_empty() {
        errors.push(FieldError::new("entries", "At least one entry is required"));
    }

    let mut entries = Vec::with_capacity(payload.entries.len());
    for (i, entry) in payload.entries.iter().enumerate() {
        let day = match Day::parse(&entry.day) {
            Some(day) => Some(day),
            None => {
                errors.push(FieldError::new(format!("entries[{i}].day"), "Invalid day"));
                None
            }
        };

        if !(0.0..=MAX_HOURS_PER_DAY).contains(&entry.hours) {
            errors.push(FieldError::new(
                format!("entries[{i}].hours"),
                "Hours must be between 0 and 24",
            ));
        }

        let project = entry.project.trim();
        if project.is_empty() {
            errors.push(FieldError::new(
                format!("entries[{i}].project"),
                "Project/Task name is required",
            ));
        }

        let description = entry.description.as_ref().map(|d| d.trim().to_string());
        if let Some(desc) = &description {
            if desc.chars().count() > MAX_DESCRIPTION_CHARS {
                errors.push(FieldError::new(
                    format!("entries[{i}].description"),
                    "Description cannot exceed 500 characters",
                ));
            }
        }

        if let Some(day) = day {
            entries.push(TimesheetEntry {
                day,
                hours: entry.hours,
                project: project.to_string(),
                description: description.filter(|d| !d.is_empty()),
            });
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidTimesheet {
        // Safe: a parse failure pushed an error and we returned above.
        week_start_date: week_start_date.ok_or_else(Vec::new)?,
        entries,
    })
}

pub fn validate_time_off(payload: &TimeOffPayload) -> Result<ValidTimeOff, Vec<FieldError>> {
    let mut errors = Vec::new();

    let from_date = match NaiveDate::parse_from_str(&payload.from_date, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError::new(
                "fromDate",
                "Please provide a valid from date",
            ));
            None
        }
    };

    let to_date = match NaiveDate::parse_from_str(&payload.to_date, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError::new("toDate", "Please provide a valid to date"));
            None
        }
    };

    if let (Some(from), Some(to)) = (from_date, to_date) {
        if to < from {
            errors.push(FieldError::new(
                "toDate",
                "To date must be after or equal to from date",
            ));
        }
    }

    let reason = payload.reason.trim();
    if reason.is_empty() {
        errors.push(FieldError::new("reason", "Reason is required"));
    } else if reason.chars().count() > MAX_REASON_CHARS {
        errors.push(FieldError::new(
            "reason",
            "Reason cannot exceed 1000 characters",
        ));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidTimeOff {
        from_date: from_date.ok_or_else(Vec::new)?,
        to_date: to_date.ok_or_else(Vec::new)?,
        reason: reason.to_string(),
    })
}

/// Rejection reason is mandatory server-side when the action is reject.
pub fn validate_rejection_reason(
    rejection_reason: Option<&str>,
) -> Result<String, Vec<FieldError>> {
    let reason = rejection_reason.map(str::trim).unwrap_or("");
    if reason.is_empty() {
        return Err(vec![FieldError::new(
            "rejectionReason",
            "Rejection reason is required when rejecting",
        )]);
    }
    if reason.chars().count() > MAX_REJECTION_REASON_CHARS {
        return Err(vec![FieldError::new(
            "rejectionReason",
            "Rejection reason cannot exceed 500 characters",
        )]);
    }
    Ok(reason.to_string())
}
