//! Append-only writes to the donation ledger.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// A ledger entry in the making. `request_id` is kept as a plain value,
/// not a foreign key: the entry must outlive the request it came from.
#[derive(Debug, Clone)]
pub struct NewDonationRecord {
    pub donor_id: Uuid,
    pub request_id: Uuid,
    pub hospital_id: Uuid,
    pub donation_date: NaiveDate,
    pub quantity_units: i64,
    pub notes: Option<String>,
}

/// Appends one entry and returns its id.
///
/// Takes a connection rather than a pool so completion can write the
/// entry inside its transaction.
pub async fn record_donation(
    conn: &mut SqliteConnection,
    record: NewDonationRecord,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO donation_records
            (id, donor_id, request_id, hospital_id, donation_date, quantity_units, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(id)
    .bind(record.donor_id)
    .bind(record.request_id)
    .bind(record.hospital_id)
    .bind(record.donation_date)
    .bind(record.quantity_units)
    .bind(&record.notes)
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{
        memory_pool, seed_donor, seed_hospital, seed_request,
    };
    use chrono::Utc;
    use hemolink_common::types::{AvailabilityStatus, BloodGroup, RequestStatus, UrgencyLevel};

    #[tokio::test]
    async fn entry_survives_deletion_of_its_request() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let donor_id = seed_donor(
            &pool,
            "donor@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Fulfilled,
        )
        .await;

        let mut conn = pool.acquire().await.unwrap();
        let record_id = record_donation(
            &mut conn,
            NewDonationRecord {
                donor_id,
                request_id,
                hospital_id,
                donation_date: Utc::now().date_naive(),
                quantity_units: 2,
                notes: None,
            },
        )
        .await
        .unwrap();
        drop(conn);

        sqlx::query("DELETE FROM blood_requests WHERE id = ?1")
            .bind(request_id)
            .execute(&pool)
            .await
            .unwrap();

        let stored_request: Uuid =
            sqlx::query_scalar("SELECT request_id FROM donation_records WHERE id = ?1")
                .bind(record_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored_request, request_id);
    }
}
