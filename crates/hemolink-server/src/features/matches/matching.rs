//! The matching pass: propose eligible donors for a blood request.
//!
//! SQL prefilters on blood group and availability; the donation-interval
//! rule is evaluated in Rust so the calendar arithmetic lives in one place
//! (`hemolink_common::types::is_eligible_on`).

use chrono::NaiveDate;
use hemolink_common::types::{is_eligible_on, BloodGroup};
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Candidate row pulled by the prefilter query.
#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    last_donation_date: Option<NaiveDate>,
}

/// Proposes pending matches for a request and returns the new match ids.
///
/// Candidates must carry the exact blood group, be marked available, pass
/// the minimum-interval rule as of `today`, and not already hold a match
/// (of any status) for this request. Every candidate that passes is
/// proposed; the ordering only makes the output deterministic.
///
/// Runs on a caller-supplied connection so it can join an enclosing
/// transaction; re-running the pass never duplicates a pairing.
pub async fn run_matching_pass(
    conn: &mut SqliteConnection,
    request_id: Uuid,
    blood_group: BloodGroup,
    today: NaiveDate,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let candidates = sqlx::query_as::<_, CandidateRow>(
        r#"
        SELECT id, last_donation_date
        FROM donors
        WHERE blood_group = ?1
          AND availability_status = 'available'
          AND NOT EXISTS (
              SELECT 1 FROM donor_matches
              WHERE donor_matches.donor_id = donors.id
                AND donor_matches.request_id = ?2
          )
        ORDER BY last_donation_date IS NULL, last_donation_date ASC, created_at ASC
        "#,
    )
    .bind(blood_group)
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut created = Vec::new();
    for candidate in candidates {
        if !is_eligible_on(candidate.last_donation_date, today) {
            continue;
        }
        let match_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO donor_matches (id, donor_id, request_id, status, created_at)
            VALUES (?1, ?2, ?3, 'pending', ?4)
            "#,
        )
        .bind(match_id)
        .bind(candidate.id)
        .bind(request_id)
        .bind(chrono::Utc::now())
        .execute(&mut *conn)
        .await?;
        created.push(match_id);
    }

    Ok(created)
}
