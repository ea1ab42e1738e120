//! Local subscription status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Status of a subscriber's relationship to a creator.
///
/// Only the status mapper translates provider states into this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Time-boxed access granted before billing begins.
    Trialing,

    /// Paid and current.
    Active,

    /// Payment outstanding; access revoked until it clears.
    PastDue,

    /// Terminal. A new checkout creates a new relationship.
    Canceled,
}

impl SubscriptionStatus {
    /// Returns true if this status grants access to the creator's content.
    pub fn has_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Trialing | SubscriptionStatus::Active)
    }

    /// Returns true for the terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled)
    }

    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    /// Parses a stored local status. Provider strings go through the mapper instead.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown local status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_trialing_and_active_grant_access() {
        assert!(SubscriptionStatus::Trialing.has_access());
        assert!(SubscriptionStatus::Active.has_access());
        assert!(!SubscriptionStatus::PastDue.has_access());
        assert!(!SubscriptionStatus::Canceled.has_access());
    }

    #[test]
    fn canceled_is_the_only_terminal_status() {
        assert!(SubscriptionStatus::Canceled.is_terminal());
        assert!(!SubscriptionStatus::PastDue.is_terminal());
    }

    #[test]
    fn storage_strings_parse_back() {
        for status in [
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn parse_rejects_provider_only_states() {
        assert!("unpaid".parse::<SubscriptionStatus>().is_err());
        assert!("incomplete".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }
}
