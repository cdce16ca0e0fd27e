use chrono::{DateTime, NaiveDateTime, Utc};
use derive_more::Display;
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[display(fmt = "room")]
    Room,
    #[display(fmt = "parking")]
    Parking,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReleasedResource {
    pub resource_type: ResourceType,
    #[schema(example = 12)]
    pub resource_id: u64,
    #[schema(example = 35)]
    pub minutes_overdue: i64,
    #[schema(value_type = String, format = "date-time")]
    pub released_at: DateTime<Utc>,
}

pub fn minutes_overdue(expected_start: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now - expected_start).num_minutes()
}

/// A confirmed room booking is abandoned once its start has passed by more
/// than the grace period with no office check-in from the holder that day.
pub fn room_release_eligible(holder_checked_in: bool, overdue_min: i64, grace_min: i64) -> bool {
    !holder_checked_in && overdue_min > grace_min
}

/// An active parking reservation is abandoned once the holder's attendance
/// for that date is anything but `office` (wfh, leave, or no record) and the
/// expected arrival window has passed by more than the overdue threshold.
pub fn parking_release_eligible(
    holder_status: Option<&str>,
    overdue_min: i64,
    threshold_min: i64,
) -> bool {
    holder_status != Some("office") && overdue_min > threshold_min
}

/// A booking or reservation as the sweep sees it: current status, the
/// holder's office check-in for that date (if any), and the expected start.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SweepCandidate {
    pub id: u64,
    pub status: String,
    pub holder_status: Option<String>,
    pub start_dt: NaiveDateTime,
}

/// Decide which candidates get released at `now`. Pure over the fetched
/// rows, so a second pass over the same state after the statuses have moved
/// plans nothing.
pub fn plan_releases(
    rooms: &[SweepCandidate],
    parking: &[SweepCandidate],
    room_grace_min: i64,
    parking_overdue_min: i64,
    now: DateTime<Utc>,
) -> Vec<ReleasedResource> {
    let now_naive = now.naive_utc();
    let mut planned = Vec::new();

    for c in rooms {
        let overdue = minutes_overdue(c.start_dt, now_naive);
        let checked_in = c.holder_status.as_deref() == Some("office");
        if c.status == "confirmed" && room_release_eligible(checked_in, overdue, room_grace_min) {
            planned.push(ReleasedResource {
                resource_type: ResourceType::Room,
                resource_id: c.id,
                minutes_overdue: overdue,
                released_at: now,
            });
        }
    }

    for c in parking {
        let overdue = minutes_overdue(c.start_dt, now_naive);
        if c.status == "active"
            && parking_release_eligible(c.holder_status.as_deref(), overdue, parking_overdue_min)
        {
            planned.push(ReleasedResource {
                resource_type: ResourceType::Parking,
                resource_id: c.id,
                minutes_overdue: overdue,
                released_at: now,
            });
        }
    }

    planned
}

async fn fetch_candidates(pool: &MySqlPool, sql: &str, now: NaiveDateTime) -> Vec<SweepCandidate> {
    match sqlx::query_as(sql).bind(now).fetch_all(pool).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "auto-release scan failed; will retry next tick");
            Vec::new()
        }
    }
}

/// One pass of the auto-release scheduler. Safe to run repeatedly and
/// concurrently: `plan_releases` decides from the fetched state, and each
/// release is a compare-and-set on the current status, so a resource already
/// released (or cancelled by its holder in the meantime) is a no-op, never
/// an error. Per-item storage failures are logged and the item is left for
/// the next tick.
pub async fn sweep(pool: &MySqlPool, cfg: &Config, now: DateTime<Utc>) -> Vec<ReleasedResource> {
    let now_naive = now.naive_utc();

    // Past-start rows only; eligibility (grace window, holder check-in) is
    // decided in plan_releases over the fetched state.
    let rooms = fetch_candidates(
        pool,
        r#"
        SELECT b.id, b.status, a.status AS holder_status,
               TIMESTAMP(b.date, b.start_time) AS start_dt
        FROM room_bookings b
        LEFT JOIN attendance_records a
          ON a.user_id = b.user_id AND a.date = b.date
         AND a.status = 'office' AND a.check_in IS NOT NULL
        WHERE b.status = 'confirmed'
          AND TIMESTAMP(b.date, b.start_time) < ?
        "#,
        now_naive,
    )
    .await;

    let parking = fetch_candidates(
        pool,
        r#"
        SELECT p.id, p.status, a.status AS holder_status,
               TIMESTAMP(p.date, p.start_time) AS start_dt
        FROM parking_reservations p
        LEFT JOIN attendance_records a
          ON a.user_id = p.user_id AND a.date = p.date
         AND a.status = 'office' AND a.check_in IS NOT NULL
        WHERE p.status = 'active'
          AND TIMESTAMP(p.date, p.start_time) < ?
        "#,
        now_naive,
    )
    .await;

    let planned = plan_releases(
        &rooms,
        &parking,
        cfg.room_no_show_grace_min,
        cfg.parking_overdue_min,
        now,
    );

    let mut released = Vec::new();
    for item in planned {
        let sql = match item.resource_type {
            ResourceType::Room => {
                "UPDATE room_bookings SET status = 'released' WHERE id = ? AND status = 'confirmed'"
            }
            ResourceType::Parking => {
                "UPDATE parking_reservations SET status = 'released' WHERE id = ? AND status = 'active'"
            }
        };
        match sqlx::query(sql).bind(item.resource_id).execute(pool).await {
            // 0 rows: someone else (a concurrent sweep, or the user's own
            // cancel) transitioned it first. First CAS wins.
            Ok(res) if res.rows_affected() == 1 => {
                info!(
                    resource_type = %item.resource_type,
                    resource_id = item.resource_id,
                    minutes_overdue = item.minutes_overdue,
                    "auto-released resource"
                );
                released.push(item);
            }
            Ok(_) => {}
            Err(e) => error!(
                error = %e,
                resource_type = %item.resource_type,
                resource_id = item.resource_id,
                "auto-release failed; will retry next tick"
            ),
        }
    }

    released
}

/// Moves pending WFH requests whose SLA window has elapsed into `expired`.
/// An expired request stays expired; resubmission means a new request.
pub async fn expire_overdue_wfh(
    pool: &MySqlPool,
    cfg: &Config,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        r#"
        UPDATE wfh_approvals
        SET status = 'expired'
        WHERE status = 'pending'
          AND (
                (urgency = 'normal' AND created_at < ? - INTERVAL ? HOUR)
             OR (urgency = 'urgent' AND created_at < ? - INTERVAL ? HOUR)
          )
        "#,
    )
    .bind(now)
    .bind(cfg.wfh_sla_normal_hours)
    .bind(now)
    .bind(cfg.wfh_sla_urgent_hours)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    #[test]
    fn wfh_holder_past_threshold_is_released() {
        // 35 minutes past office-hours start, holder checked in as wfh.
        let overdue = minutes_overdue(dt(9, 0), dt(9, 35));
        assert_eq!(overdue, 35);
        assert!(parking_release_eligible(Some("wfh"), overdue, 30));
    }

    #[test]
    fn office_holder_is_never_released() {
        assert!(!parking_release_eligible(Some("office"), 120, 30));
    }

    #[test]
    fn absent_holder_is_released_only_past_threshold() {
        assert!(!parking_release_eligible(None, 30, 30)); // exactly at threshold: keep
        assert!(parking_release_eligible(None, 31, 30));
    }

    #[test]
    fn checked_in_room_holder_keeps_the_booking() {
        assert!(!room_release_eligible(true, 120, 15));
        assert!(room_release_eligible(false, 16, 15));
        assert!(!room_release_eligible(false, 15, 15));
    }

    #[test]
    fn overdue_minutes_are_negative_before_start() {
        assert!(minutes_overdue(dt(10, 0), dt(9, 0)) < 0);
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt(h, m), Utc)
    }

    #[test]
    fn plan_skips_checked_in_and_fresh_candidates() {
        let rooms = vec![
            SweepCandidate {
                id: 1,
                status: "confirmed".into(),
                holder_status: None,
                start_dt: dt(9, 0),
            },
            SweepCandidate {
                id: 2,
                status: "confirmed".into(),
                holder_status: Some("office".into()),
                start_dt: dt(9, 0),
            },
            SweepCandidate {
                id: 3,
                status: "confirmed".into(),
                holder_status: None,
                start_dt: dt(10, 55),
            },
        ];
        let planned = plan_releases(&rooms, &[], 15, 30, at(11, 0));
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].resource_id, 1);
        assert_eq!(planned[0].minutes_overdue, 120);
    }

    #[test]
    fn second_pass_over_released_state_plans_nothing() {
        let mut rooms = vec![SweepCandidate {
            id: 1,
            status: "confirmed".into(),
            holder_status: None,
            start_dt: dt(9, 0),
        }];
        let mut parking = vec![SweepCandidate {
            id: 7,
            status: "active".into(),
            holder_status: Some("wfh".into()),
            start_dt: dt(9, 0),
        }];

        let now = at(10, 0);
        let first = plan_releases(&rooms, &parking, 15, 30, now);
        assert_eq!(first.len(), 2);

        // Apply the planned transitions, then sweep the same state again.
        for item in &first {
            match item.resource_type {
                ResourceType::Room => rooms[0].status = "released".into(),
                ResourceType::Parking => parking[0].status = "released".into(),
            }
        }
        let second = plan_releases(&rooms, &parking, 15, 30, now);
        assert!(second.is_empty());
    }
}
