//! Fixtures for feature unit tests.

use chrono::{NaiveDate, Utc};
use hemolink_common::types::{
    AvailabilityStatus, BloodGroup, MatchStatus, RequestStatus, UrgencyLevel,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

/// In-memory database with migrations applied.
///
/// A single connection is pinned for the pool's lifetime: every
/// `sqlite::memory:` connection is its own empty database, so the pool
/// must never open (or recycle into) a second one.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    crate::db::MIGRATOR
        .run(&pool)
        .await
        .expect("failed to apply migrations");
    pool
}

pub async fn seed_hospital(pool: &SqlitePool, name: &str, city: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO hospitals (id, name, city, phone, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(name)
    .bind(city)
    .bind("022-5551234")
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("failed to seed hospital");
    id
}

pub async fn seed_donor(
    pool: &SqlitePool,
    email: &str,
    blood_group: BloodGroup,
    availability: AvailabilityStatus,
    last_donation_date: Option<NaiveDate>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO donors
             (id, full_name, email, phone, blood_group, availability_status,
              last_donation_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(id)
    .bind("Test Donor")
    .bind(email)
    .bind("+91 98765 43210")
    .bind(blood_group)
    .bind(availability)
    .bind(last_donation_date)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("failed to seed donor");
    id
}

pub async fn seed_request(
    pool: &SqlitePool,
    hospital_id: Uuid,
    blood_group: BloodGroup,
    urgency: UrgencyLevel,
    status: RequestStatus,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO blood_requests
             (id, hospital_id, blood_group, quantity_units, urgency, status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
    )
    .bind(id)
    .bind(hospital_id)
    .bind(blood_group)
    .bind(2i64)
    .bind(urgency)
    .bind(status)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("failed to seed blood request");
    id
}

pub async fn seed_match(
    pool: &SqlitePool,
    donor_id: Uuid,
    request_id: Uuid,
    status: MatchStatus,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO donor_matches (id, donor_id, request_id, status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
    )
    .bind(id)
    .bind(donor_id)
    .bind(request_id)
    .bind(status)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("failed to seed match");
    id
}
