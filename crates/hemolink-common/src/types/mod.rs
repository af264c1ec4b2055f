//! Core domain types for blood donation coordination.
//!
//! These enums are the single source of truth for the status vocabularies
//! and their legal transitions. Server code never matches on raw strings;
//! everything goes through [`RequestStatus::can_transition_to`] and
//! [`MatchStatus::can_transition_to`].

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::HemolinkError;

/// Months a donor must wait after a donation before becoming eligible again.
pub const MIN_MONTHS_BETWEEN_DONATIONS: u32 = 3;

/// Estimated lives saved per completed donation, used in donor statistics.
pub const LIVES_SAVED_PER_DONATION: i64 = 3;

// ============================================================================
// Blood groups
// ============================================================================

/// ABO/Rh blood group. Matching is exact-group only; compatibility rules
/// (e.g. O- as universal donor) are intentionally out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    #[sqlx(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    #[sqlx(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    #[sqlx(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    #[sqlx(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    #[sqlx(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    #[sqlx(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    #[sqlx(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    #[sqlx(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = HemolinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A+" => Ok(BloodGroup::APositive),
            "A-" => Ok(BloodGroup::ANegative),
            "B+" => Ok(BloodGroup::BPositive),
            "B-" => Ok(BloodGroup::BNegative),
            "AB+" => Ok(BloodGroup::AbPositive),
            "AB-" => Ok(BloodGroup::AbNegative),
            "O+" => Ok(BloodGroup::OPositive),
            "O-" => Ok(BloodGroup::ONegative),
            other => Err(HemolinkError::parse(format!(
                "'{other}' is not a blood group"
            ))),
        }
    }
}

// ============================================================================
// Donor availability
// ============================================================================

/// Whether a donor can currently be offered to a request.
///
/// `RecentlyDonated` is set when a donation completes and means the donor is
/// inside the re-donation waiting window. It does not flip back
/// automatically; the matching pass re-checks the window against
/// `last_donation_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Unavailable,
    RecentlyDonated,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::Unavailable => "unavailable",
            AvailabilityStatus::RecentlyDonated => "recently_donated",
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Request urgency
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    /// Sort rank, most urgent first. Listings order by this before recency.
    pub fn priority(&self) -> u8 {
        match self {
            UrgencyLevel::Critical => 0,
            UrgencyLevel::High => 1,
            UrgencyLevel::Medium => 2,
            UrgencyLevel::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Request lifecycle
// ============================================================================

/// Lifecycle of a blood request.
///
/// ```text
/// pending --> matched --> fulfilled
///    |           |
///    +-----------+------> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Matched,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Matched) | (Pending, Cancelled) | (Matched, Fulfilled) | (Matched, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Fulfilled | RequestStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Matched => "matched",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Match lifecycle
// ============================================================================

/// Lifecycle of a donor match.
///
/// ```text
/// pending --> contacted --> confirmed --> completed
///    |            |             |
///    +------------+-------------+-------> cancelled
/// ```
///
/// `Completed` is only ever reached through the completion operation, which
/// also writes the donation record; the generic transition operation
/// rejects it as a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Pending,
    Contacted,
    Confirmed,
    Completed,
    Cancelled,
}

impl MatchStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, next),
            (Pending, Contacted)
                | (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Contacted, Confirmed)
                | (Contacted, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }

    /// Open matches still hold a claim on their donor.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Contacted => "contacted",
            MatchStatus::Confirmed => "confirmed",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Caller roles
// ============================================================================

/// Role attached to an authenticated caller by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Hospital,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Hospital => "hospital",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = HemolinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "donor" => Ok(Role::Donor),
            "hospital" => Ok(Role::Hospital),
            "admin" => Ok(Role::Admin),
            other => Err(HemolinkError::parse(format!("'{other}' is not a role"))),
        }
    }
}

// ============================================================================
// Donation eligibility window
// ============================================================================

/// First calendar date on which a donor who last donated on `last_donation`
/// may donate again. `None` only on date overflow, which cannot happen for
/// realistic dates.
pub fn next_eligible_date(last_donation: NaiveDate) -> Option<NaiveDate> {
    last_donation.checked_add_months(Months::new(MIN_MONTHS_BETWEEN_DONATIONS))
}

/// Whether a donor with the given donation history may donate on `date`.
///
/// A donor who has never donated is always inside the window. The boundary
/// is inclusive: exactly `MIN_MONTHS_BETWEEN_DONATIONS` calendar months
/// after the last donation the donor is eligible again. Calendar-month
/// arithmetic clamps to month end, so e.g. Nov 30 + 3 months is Feb 28.
pub fn is_eligible_on(last_donation: Option<NaiveDate>, date: NaiveDate) -> bool {
    match last_donation {
        None => true,
        Some(last) => next_eligible_date(last).is_some_and(|next| next <= date),
    }
}
