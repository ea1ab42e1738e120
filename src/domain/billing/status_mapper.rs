//! Translation of provider subscription states into local statuses.
//!
//! Fails closed: any provider state not listed here is an error, never a
//! default. Unknown states must block access, not grant it.
//!
//! | Provider status | Local status |
//! |-----------------|--------------|
//! | `active` | `active` |
//! | `trialing` | `trialing` |
//! | `past_due`, `unpaid` | `past_due` |
//! | `canceled`, `incomplete_expired` | `canceled` |
//! | `incomplete` | `past_due` |
//! | `paused` | `past_due` |

use thiserror::Error;

use super::status::SubscriptionStatus;

/// The provider reported a lifecycle state this system does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported provider subscription status: '{status}'")]
pub struct UnsupportedStatus {
    pub status: String,
}

/// Maps a provider subscription status onto the local status enum.
///
/// # Errors
///
/// Returns `UnsupportedStatus` for every string outside the mapping table.
pub fn map_provider_status(provider_status: &str) -> Result<SubscriptionStatus, UnsupportedStatus> {
    match provider_status {
        "active" => Ok(SubscriptionStatus::Active),
        "trialing" => Ok(SubscriptionStatus::Trialing),
        "past_due" | "unpaid" => Ok(SubscriptionStatus::PastDue),
        "canceled" | "incomplete_expired" => Ok(SubscriptionStatus::Canceled),
        // Payment pending, e.g. step-up authentication
        "incomplete" => Ok(SubscriptionStatus::PastDue),
        "paused" => Ok(SubscriptionStatus::PastDue),
        other => Err(UnsupportedStatus {
            status: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KNOWN: [&str; 8] = [
        "active",
        "trialing",
        "past_due",
        "unpaid",
        "canceled",
        "incomplete_expired",
        "incomplete",
        "paused",
    ];

    #[test]
    fn maps_access_granting_states() {
        assert_eq!(map_provider_status("active"), Ok(SubscriptionStatus::Active));
        assert_eq!(map_provider_status("trialing"), Ok(SubscriptionStatus::Trialing));
    }

    #[test]
    fn maps_payment_problems_to_past_due() {
        for status in ["past_due", "unpaid", "incomplete", "paused"] {
            assert_eq!(map_provider_status(status), Ok(SubscriptionStatus::PastDue));
        }
    }

    #[test]
    fn maps_terminal_states_to_canceled() {
        assert_eq!(map_provider_status("canceled"), Ok(SubscriptionStatus::Canceled));
        assert_eq!(
            map_provider_status("incomplete_expired"),
            Ok(SubscriptionStatus::Canceled)
        );
    }

    #[test]
    fn rejects_unknown_status() {
        let err = map_provider_status("suspended_for_review").unwrap_err();
        assert_eq!(err.status, "suspended_for_review");
        assert!(err.to_string().contains("suspended_for_review"));
    }

    #[test]
    fn matching_is_exact() {
        assert!(map_provider_status("Active").is_err());
        assert!(map_provider_status(" active").is_err());
        assert!(map_provider_status("").is_err());
    }

    proptest! {
        #[test]
        fn unknown_statuses_never_grant_access(status in "\\PC{0,24}") {
            prop_assume!(!KNOWN.contains(&status.as_str()));
            prop_assert!(map_provider_status(&status).is_err());
        }

        #[test]
        fn mapping_is_total_over_the_table(idx in 0usize..KNOWN.len()) {
            prop_assert!(map_provider_status(KNOWN[idx]).is_ok());
        }
    }
}
