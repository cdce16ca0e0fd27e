use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use derive_more::Display;
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

/// Minimal booking projection the detector works over.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    pub id: u64,
    pub room_id: u64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    #[display(fmt = "low")]
    Low,
    #[display(fmt = "medium")]
    Medium,
    #[display(fmt = "high")]
    High,
}

/// A group of confirmed bookings for the same room whose intervals overlap.
/// Surfaced for resolution, never mutated here: the store's own exclusion
/// check stops *new* overlaps, but legacy data, manual overrides and races
/// can still leave violations behind.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomConflict {
    #[schema(example = 12)]
    pub room_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// At least two bookings, ordered by start time.
    pub booking_ids: Vec<u64>,
    pub overlap_minutes: i64,
    pub severity: ConflictSeverity,
    #[schema(example = "keep booking 3 (earliest created); offer an alternate room or time to bookings 7")]
    pub suggested_resolution: String,
}

fn pair_overlap_minutes(a: &BookingRow, b: &BookingRow) -> i64 {
    let start = a.start_time.max(b.start_time);
    let end = a.end_time.min(b.end_time);
    if end > start {
        (end - start).num_minutes()
    } else {
        0
    }
}

fn severity_for(booking_count: usize, overlap_minutes: i64) -> ConflictSeverity {
    if booking_count >= 3 || overlap_minutes >= 60 {
        ConflictSeverity::High
    } else if overlap_minutes >= 30 {
        ConflictSeverity::Medium
    } else {
        ConflictSeverity::Low
    }
}

fn build_conflict(cluster: &[BookingRow]) -> RoomConflict {
    let overlap_minutes: i64 = cluster
        .iter()
        .enumerate()
        .flat_map(|(i, a)| cluster[i + 1..].iter().map(move |b| pair_overlap_minutes(a, b)))
        .sum();

    let keeper = cluster
        .iter()
        .min_by_key(|b| (b.created_at, b.id))
        .expect("cluster is non-empty");
    let others: Vec<String> = cluster
        .iter()
        .filter(|b| b.id != keeper.id)
        .map(|b| b.id.to_string())
        .collect();

    RoomConflict {
        room_id: cluster[0].room_id,
        date: cluster[0].date,
        booking_ids: cluster.iter().map(|b| b.id).collect(),
        overlap_minutes,
        severity: severity_for(cluster.len(), overlap_minutes),
        suggested_resolution: format!(
            "keep booking {} (earliest created); offer an alternate room or time to bookings {}",
            keeper.id,
            others.join(", ")
        ),
    }
}

/// Groups confirmed bookings into overlap clusters per room+date. Pure over
/// its input so it can be pinned down in tests.
pub fn group_overlaps(rows: &[BookingRow]) -> Vec<RoomConflict> {
    let mut rows: Vec<BookingRow> = rows.to_vec();
    rows.sort_by_key(|r| (r.room_id, r.date, r.start_time, r.id));

    let mut conflicts = Vec::new();
    let mut cluster: Vec<BookingRow> = Vec::new();
    let mut cluster_end: Option<NaiveTime> = None;

    for row in rows {
        let chained = match (cluster.last(), cluster_end) {
            (Some(last), Some(end)) => {
                last.room_id == row.room_id && last.date == row.date && row.start_time < end
            }
            _ => false,
        };

        if chained {
            cluster_end = Some(cluster_end.unwrap().max(row.end_time));
            cluster.push(row);
        } else {
            if cluster.len() >= 2 {
                conflicts.push(build_conflict(&cluster));
            }
            cluster_end = Some(row.end_time);
            cluster = vec![row];
        }
    }
    if cluster.len() >= 2 {
        conflicts.push(build_conflict(&cluster));
    }

    conflicts
}

/// Fetches confirmed bookings for the scope and hands them to the pure
/// grouping pass. `room_id = None` scans every room.
pub async fn detect_conflicts(
    pool: &MySqlPool,
    room_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RoomConflict>, sqlx::Error> {
    let rows: Vec<BookingRow> = match room_id {
        Some(room) => {
            sqlx::query_as(
                r#"
                SELECT id, room_id, date, start_time, end_time, created_at
                FROM room_bookings
                WHERE status = 'confirmed' AND room_id = ? AND date BETWEEN ? AND ?
                ORDER BY room_id, date, start_time
                "#,
            )
            .bind(room)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT id, room_id, date, start_time, end_time, created_at
                FROM room_bookings
                WHERE status = 'confirmed' AND date BETWEEN ? AND ?
                ORDER BY room_id, date, start_time
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(group_overlaps(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking(id: u64, room_id: u64, start: (u32, u32), end: (u32, u32)) -> BookingRow {
        BookingRow {
            id,
            room_id,
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            // created_at ordering follows id for fixture convenience
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, id as u32).unwrap(),
        }
    }

    #[test]
    fn two_overlapping_bookings_form_one_conflict() {
        // The "Falcon" case: 10:00-11:00 vs 10:30-11:30.
        let rows = vec![
            booking(1, 12, (10, 0), (11, 0)),
            booking(2, 12, (10, 30), (11, 30)),
        ];
        let conflicts = group_overlaps(&rows);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].booking_ids, vec![1, 2]);
        assert_eq!(conflicts[0].overlap_minutes, 30);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Medium);
        assert!(conflicts[0].suggested_resolution.contains("keep booking 1"));
    }

    #[test]
    fn disjoint_and_back_to_back_bookings_do_not_conflict() {
        let rows = vec![
            booking(1, 12, (9, 0), (10, 0)),
            booking(2, 12, (10, 0), (11, 0)), // touching endpoints: half-open intervals
            booking(3, 12, (13, 0), (14, 0)),
        ];
        assert!(group_overlaps(&rows).is_empty());
    }

    #[test]
    fn different_rooms_never_conflict() {
        let rows = vec![
            booking(1, 12, (10, 0), (11, 0)),
            booking(2, 13, (10, 0), (11, 0)),
        ];
        assert!(group_overlaps(&rows).is_empty());
    }

    #[test]
    fn chained_overlaps_group_into_one_high_severity_cluster() {
        let rows = vec![
            booking(1, 12, (10, 0), (11, 0)),
            booking(2, 12, (10, 45), (11, 45)),
            booking(3, 12, (11, 30), (12, 30)),
        ];
        let conflicts = group_overlaps(&rows);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].booking_ids, vec![1, 2, 3]);
        assert_eq!(conflicts[0].severity, ConflictSeverity::High);
    }

    #[test]
    fn separate_clusters_are_reported_separately() {
        let rows = vec![
            booking(1, 12, (9, 0), (10, 0)),
            booking(2, 12, (9, 30), (10, 0)),
            booking(3, 12, (14, 0), (15, 0)),
            booking(4, 12, (14, 10), (14, 20)),
        ];
        let conflicts = group_overlaps(&rows);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].booking_ids, vec![1, 2]);
        assert_eq!(conflicts[1].booking_ids, vec![3, 4]);
    }
}
