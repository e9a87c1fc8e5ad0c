// src/model.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// --- Principal ---

/// Authenticated actor, resolved by the upstream session layer before the
/// core is invoked. Core operations take this explicitly; it is never ambient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub employee_id: String,
    pub role: Role,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "employee" => Some(Role::Employee),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }
}

// --- Timesheets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub fn parse(s: &str) -> Option<Day> {
        match s {
            "Monday" => Some(Day::Monday),
            "Tuesday" => Some(Day::Tuesday),
            "Wednesday" => Some(Day::Wednesday),
            "Thursday" => Some(Day::Thursday),
            "Friday" => Some(Day::Friday),
            "Saturday" => Some(Day::Saturday),
            "Sunday" => Some(Day::Sunday),
            _ => None,
        }
    }
}

/// One row of a weekly timesheet. Owned exclusively by its Timesheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub day: Day,
    pub hours: f64,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimesheetStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl TimesheetStatus {
    pub fn parse(s: &str) -> Option<TimesheetStatus> {
        match s {
            "Draft" => Some(TimesheetStatus::Draft),
            "Submitted" => Some(TimesheetStatus::Submitted),
            "Approved" => Some(TimesheetStatus::Approved),
            "Rejected" => Some(TimesheetStatus::Rejected),
            _ => None,
        }
    }

    /// Approved and Rejected are terminal; no further mutation is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, TimesheetStatus::Approved | TimesheetStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub id: String,
    pub employee: String,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub entries: Vec<TimesheetEntry>,
    pub status: TimesheetStatus,
    pub total_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Time off ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Rejected,
}

impl TimeOffStatus {
    pub fn parse(s: &str) -> Option<TimeOffStatus> {
        match s {
            "Pending" => Some(TimeOffStatus::Pending),
            "Approved" => Some(TimeOffStatus::Approved),
            "Rejected" => Some(TimeOffStatus::Rejected),
            _ => None,
        }
    }

    /// Pending and Approved requests both block the covered interval.
    pub fn blocks_interval(self) -> bool {
        matches!(self, TimeOffStatus::Pending | TimeOffStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffRequest {
    pub id: String,
    pub employee: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub status: TimeOffStatus,
    pub days_requested: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Listing ---

/// Paginated listing envelope shared by both collections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u64,
    pub current_page: u64,
    pub total: u64,
}
