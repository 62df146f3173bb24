//! Teacher profiles, billing tiers, and subscription records.
//!
//! A profile is the owner of every other row in the store. Its `plan` column
//! is the only thing billing ever changes; subscriptions are append-only
//! records of what the billing provider reported.

use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Plan ────────────────────────────────────────────────────────────────────

/// The billing tier a teacher is on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
  #[default]
  Free,
  Pro,
  School,
}

impl Plan {
  /// Number of gradings allowed per calendar month; `None` is unlimited.
  pub fn monthly_allowance(self) -> Option<u32> {
    match self {
      Self::Free => Some(10),
      Self::Pro => Some(250),
      Self::School => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Free => "free",
      Self::Pro => "pro",
      Self::School => "school",
    }
  }
}

impl FromStr for Plan {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "free" => Ok(Self::Free),
      "pro" => Ok(Self::Pro),
      "school" => Ok(Self::School),
      other => Err(Error::UnknownVariant {
        kind:  "plan",
        value: other.to_owned(),
      }),
    }
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// A teacher account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub profile_id:   Uuid,
  /// Always stored lower-cased.
  pub email:        String,
  pub display_name: String,
  pub plan:         Plan,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::GradingStore::add_profile`].
#[derive(Debug, Clone)]
pub struct NewProfile {
  pub email:         String,
  pub display_name:  String,
  /// argon2 PHC string.
  pub password_hash: String,
  pub plan:          Plan,
}

/// Login material for a profile. Never serialised into API responses.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub profile_id:    Uuid,
  pub password_hash: String,
}

/// Normalise an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

// ─── Subscriptions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
  Active,
  Trialing,
  PastDue,
  Canceled,
}

impl SubscriptionStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Trialing => "trialing",
      Self::PastDue => "past_due",
      Self::Canceled => "canceled",
    }
  }
}

impl FromStr for SubscriptionStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "active" => Ok(Self::Active),
      "trialing" => Ok(Self::Trialing),
      "past_due" => Ok(Self::PastDue),
      "canceled" | "cancelled" => Ok(Self::Canceled),
      other => Err(Error::UnknownVariant {
        kind:  "subscription status",
        value: other.to_owned(),
      }),
    }
  }
}

/// A billing event as reported by the provider. Append-only; the most
/// recently recorded subscription for a profile is the current one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id:    Uuid,
  pub profile_id:         Uuid,
  pub plan:               Plan,
  pub status:             SubscriptionStatus,
  /// Opaque identifier on the billing provider's side.
  pub external_ref:       Option<String>,
  pub current_period_end: Option<DateTime<Utc>>,
  pub recorded_at:        DateTime<Utc>,
}

impl Subscription {
  /// The plan this subscription entitles the profile to.
  pub fn effective_plan(&self) -> Plan {
    effective_plan(self.plan, self.status)
  }
}

/// A canceled subscription drops the profile back to [`Plan::Free`]; every
/// other status keeps the subscribed plan.
pub fn effective_plan(plan: Plan, status: SubscriptionStatus) -> Plan {
  match status {
    SubscriptionStatus::Canceled => Plan::Free,
    SubscriptionStatus::Active
    | SubscriptionStatus::Trialing
    | SubscriptionStatus::PastDue => plan,
  }
}

/// Input to [`crate::store::GradingStore::record_subscription`].
#[derive(Debug, Clone)]
pub struct NewSubscription {
  pub profile_id:         Uuid,
  pub plan:               Plan,
  pub status:             SubscriptionStatus,
  pub external_ref:       Option<String>,
  pub current_period_end: Option<DateTime<Utc>>,
}

// ─── Usage ───────────────────────────────────────────────────────────────────

/// How much of the monthly allowance a teacher has used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
  pub plan:         Plan,
  pub used:         u32,
  /// `None` when the plan is unlimited.
  pub allowance:    Option<u32>,
  pub period_start: DateTime<Utc>,
}

impl Usage {
  pub fn remaining(&self) -> Option<u32> {
    self.allowance.map(|a| a.saturating_sub(self.used))
  }

  pub fn is_exhausted(&self) -> bool { self.remaining() == Some(0) }
}

/// Midnight UTC on the first day of the month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
  NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
    .unwrap_or(now)
}
