use chrono::{NaiveDate, Utc};
use hemolink_common::types::{MatchStatus, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Command;
use crate::features::donations::ledger::{record_donation, NewDonationRecord};
use crate::features::shared::validation::{validate_notes, NotesValidationError};

// ============================================================================
// Command
// ============================================================================

/// Records that a confirmed match actually resulted in a donation.
///
/// One transaction closes the match, appends the ledger entry, stamps the
/// donor's last donation date, and fulfils the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteMatch {
    pub match_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub notes: Option<String>,
}

impl Command for CompleteMatch {}

impl mediator::Request<Result<CompleteMatchResponse, CompleteMatchError>> for CompleteMatch {}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteMatchResponse {
    pub match_id: Uuid,
    pub donation_record_id: Uuid,
    pub donor_id: Uuid,
    pub request_id: Uuid,
    pub hospital_id: Uuid,
    pub donation_date: NaiveDate,
    pub quantity_units: i64,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CompleteMatchError {
    #[error("invalid notes: {0}")]
    InvalidNotes(#[from] NotesValidationError),

    #[error("match {0} not found")]
    NotFound(Uuid),

    #[error("only the matched donor or an admin may complete a match")]
    NotAuthorized,

    #[error("match is {status}, only a confirmed match can be completed")]
    NotConfirmed { status: MatchStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MatchRow {
    id: Uuid,
    donor_id: Uuid,
    request_id: Uuid,
    status: MatchStatus,
    hospital_id: Uuid,
    quantity_units: i64,
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    command: CompleteMatch,
) -> Result<CompleteMatchResponse, CompleteMatchError> {
    if let Some(notes) = &command.notes {
        validate_notes(notes)?;
    }

    let row = sqlx::query_as::<_, MatchRow>(
        r#"
        SELECT m.id, m.donor_id, m.request_id, m.status, r.hospital_id, r.quantity_units
        FROM donor_matches m
        JOIN blood_requests r ON r.id = m.request_id
        WHERE m.id = ?1
        "#,
    )
    .bind(command.match_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(CompleteMatchError::NotFound(command.match_id))?;

    let authorized = match command.caller_role {
        Role::Admin => true,
        Role::Donor => command.caller_id == row.donor_id,
        Role::Hospital => false,
    };
    if !authorized {
        return Err(CompleteMatchError::NotAuthorized);
    }

    if row.status != MatchStatus::Confirmed {
        return Err(CompleteMatchError::NotConfirmed { status: row.status });
    }

    let today = Utc::now().date_naive();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE donor_matches SET status = 'completed', notes = COALESCE(?2, notes) WHERE id = ?1",
    )
    .bind(row.id)
    .bind(&command.notes)
    .execute(&mut *tx)
    .await?;

    let donation_record_id = record_donation(
        &mut tx,
        NewDonationRecord {
            donor_id: row.donor_id,
            request_id: row.request_id,
            hospital_id: row.hospital_id,
            donation_date: today,
            quantity_units: row.quantity_units,
            notes: command.notes.clone(),
        },
    )
    .await?;

    sqlx::query(
        r#"
        UPDATE donors
        SET last_donation_date = ?2, availability_status = 'recently_donated'
        WHERE id = ?1
        "#,
    )
    .bind(row.donor_id)
    .bind(today)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE blood_requests SET status = 'fulfilled' WHERE id = ?1 AND status = 'matched'")
        .bind(row.request_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        match_id = %row.id,
        donor_id = %row.donor_id,
        request_id = %row.request_id,
        "donation completed"
    );

    Ok(CompleteMatchResponse {
        match_id: row.id,
        donation_record_id,
        donor_id: row.donor_id,
        request_id: row.request_id,
        hospital_id: row.hospital_id,
        donation_date: today,
        quantity_units: row.quantity_units,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{
        memory_pool, seed_donor, seed_hospital, seed_match, seed_request,
    };
    use hemolink_common::types::{AvailabilityStatus, BloodGroup, RequestStatus, UrgencyLevel};

    async fn setup_confirmed(pool: &SqlitePool) -> (Uuid, Uuid, Uuid, Uuid) {
        let hospital_id = seed_hospital(pool, "City General", "Springfield").await;
        let donor_id = seed_donor(
            pool,
            "donor@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Unavailable,
            None,
        )
        .await;
        let request_id = seed_request(
            pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Matched,
        )
        .await;
        let match_id = seed_match(pool, donor_id, request_id, MatchStatus::Confirmed).await;
        (hospital_id, donor_id, request_id, match_id)
    }

    #[tokio::test]
    async fn completion_writes_ledger_and_fulfils_request() {
        let pool = memory_pool().await;
        let (_, donor_id, request_id, match_id) = setup_confirmed(&pool).await;

        let response = handle(
            pool.clone(),
            CompleteMatch {
                match_id,
                caller_id: donor_id,
                caller_role: Role::Donor,
                notes: Some("smooth draw".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.donor_id, donor_id);
        assert_eq!(response.quantity_units, 2);
        assert_eq!(response.donation_date, Utc::now().date_naive());

        let (ledger_donor, ledger_units): (Uuid, i64) = sqlx::query_as(
            "SELECT donor_id, quantity_units FROM donation_records WHERE id = ?1",
        )
        .bind(response.donation_record_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(ledger_donor, donor_id);
        assert_eq!(ledger_units, 2);

        let (availability, last_donation): (AvailabilityStatus, Option<NaiveDate>) =
            sqlx::query_as("SELECT availability_status, last_donation_date FROM donors WHERE id = ?1")
                .bind(donor_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(availability, AvailabilityStatus::RecentlyDonated);
        assert_eq!(last_donation, Some(Utc::now().date_naive()));

        let request_status: RequestStatus =
            sqlx::query_scalar("SELECT status FROM blood_requests WHERE id = ?1")
                .bind(request_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(request_status, RequestStatus::Fulfilled);

        let match_status: MatchStatus =
            sqlx::query_scalar("SELECT status FROM donor_matches WHERE id = ?1")
                .bind(match_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(match_status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn only_confirmed_matches_complete() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let donor_id = seed_donor(
            &pool,
            "donor@example.com",
            BloodGroup::APositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::APositive,
            UrgencyLevel::Medium,
            RequestStatus::Pending,
        )
        .await;
        let match_id = seed_match(&pool, donor_id, request_id, MatchStatus::Pending).await;

        let error = handle(
            pool.clone(),
            CompleteMatch {
                match_id,
                caller_id: donor_id,
                caller_role: Role::Donor,
                notes: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            CompleteMatchError::NotConfirmed { status: MatchStatus::Pending }
        ));
    }

    #[tokio::test]
    async fn completing_twice_fails_the_second_time() {
        let pool = memory_pool().await;
        let (_, donor_id, _, match_id) = setup_confirmed(&pool).await;

        let command = CompleteMatch {
            match_id,
            caller_id: donor_id,
            caller_role: Role::Donor,
            notes: None,
        };
        handle(pool.clone(), command.clone()).await.unwrap();
        let error = handle(pool.clone(), command).await.unwrap_err();

        assert!(matches!(
            error,
            CompleteMatchError::NotConfirmed { status: MatchStatus::Completed }
        ));

        let ledger_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM donation_records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(ledger_rows, 1);
    }

    #[tokio::test]
    async fn admin_can_complete_any_confirmed_match() {
        let pool = memory_pool().await;
        let (_, donor_id, _, match_id) = setup_confirmed(&pool).await;

        let response = handle(
            pool.clone(),
            CompleteMatch {
                match_id,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
                notes: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.donor_id, donor_id);
    }

    #[tokio::test]
    async fn hospitals_cannot_complete_on_the_donors_behalf() {
        let pool = memory_pool().await;
        let (hospital_id, _, _, match_id) = setup_confirmed(&pool).await;

        let error = handle(
            pool.clone(),
            CompleteMatch {
                match_id,
                caller_id: hospital_id,
                caller_role: Role::Hospital,
                notes: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, CompleteMatchError::NotAuthorized));
    }

    #[tokio::test]
    async fn stranger_donor_cannot_complete() {
        let pool = memory_pool().await;
        let (_, _, _, match_id) = setup_confirmed(&pool).await;
        let stranger = seed_donor(
            &pool,
            "stranger@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;

        let error = handle(
            pool.clone(),
            CompleteMatch {
                match_id,
                caller_id: stranger,
                caller_role: Role::Donor,
                notes: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, CompleteMatchError::NotAuthorized));
    }
}
