use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::config::Config;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Urgency {
    Normal,
    Urgent,
    Emergency,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WfhStatus {
    Pending,
    Approved,
    Rejected,
    AutoApproved,
    Expired,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WfhApproval {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2000)]
    pub manager_id: Option<u64>,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub requested_date: NaiveDate,
    #[schema(example = "Plumber visit in the morning")]
    pub reason: String,
    #[schema(example = "normal", value_type = String)]
    pub urgency: String,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    pub decided_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decided_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Emergency requests are provisionally auto-approved at creation and only
/// reviewed after the fact; everything else waits for a manager.
pub fn initial_status(urgency: Urgency) -> WfhStatus {
    match urgency {
        Urgency::Emergency => WfhStatus::AutoApproved,
        Urgency::Normal | Urgency::Urgent => WfhStatus::Pending,
    }
}

/// Deadline after which an untouched pending request is marked expired.
/// Emergency requests never sit in `pending`, so they have no deadline.
pub fn sla_deadline(
    urgency: Urgency,
    created_at: DateTime<Utc>,
    cfg: &Config,
) -> Option<DateTime<Utc>> {
    match urgency {
        Urgency::Normal => Some(created_at + Duration::hours(cfg.wfh_sla_normal_hours)),
        Urgency::Urgent => Some(created_at + Duration::hours(cfg.wfh_sla_urgent_hours)),
        Urgency::Emergency => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_is_auto_approved_at_creation() {
        assert_eq!(initial_status(Urgency::Emergency), WfhStatus::AutoApproved);
        assert_eq!(initial_status(Urgency::Normal), WfhStatus::Pending);
        assert_eq!(initial_status(Urgency::Urgent), WfhStatus::Pending);
    }

    #[test]
    fn status_db_strings() {
        assert_eq!(WfhStatus::AutoApproved.to_string(), "auto_approved");
        assert_eq!(
            "auto_approved".parse::<WfhStatus>().unwrap(),
            WfhStatus::AutoApproved
        );
    }
}
