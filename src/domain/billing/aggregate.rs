//! Subscription aggregate entity.
//!
//! One subscriber's relationship to one creator. Rows are never deleted;
//! the terminal state is `Canceled`.
//!
//! # Design Decisions
//!
//! - **One per pair**: Unique constraint on (subscriber_id, creator_id) enforced at database level
//! - **Money in minor units**: `price_at_purchase` is captured per purchase and never recomputed
//! - **Fail closed**: Status only comes from the status mapper or a fixed event transition

use serde::{Deserialize, Serialize};

use super::errors::SubscriptionError;
use super::period_extractor::BillingPeriod;
use super::SubscriptionStatus;
use crate::domain::foundation::{CreatorId, MinorUnits, SubscriberId, SubscriptionId, Timestamp};

/// Status change caused by a paid invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRecovery {
    /// `past_due` → `active`.
    Recovered,
    /// `trialing` → `active` on the first post-trial invoice.
    TrialConverted,
}

/// Subscription aggregate.
///
/// # Invariants
///
/// - `(subscriber_id, creator_id)` is unique
/// - `price_at_purchase` changes only when a canceled subscription is restarted by a new purchase
/// - `provider_subscription_id` once set is only ever replaced by the same provider's id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,

    pub subscriber_id: SubscriberId,

    pub creator_id: CreatorId,

    /// External provider reference. `None` until the provider confirms one.
    pub provider_subscription_id: Option<String>,

    pub status: SubscriptionStatus,

    /// Whether the provider will cancel at the end of the current period.
    pub cancel_at_period_end: bool,

    pub current_period_start: Option<Timestamp>,

    pub current_period_end: Option<Timestamp>,

    /// Creator's price at the moment this subscription was created (grandfathered).
    pub price_at_purchase: MinorUnits,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a new subscription record from confirmed provider state.
    pub fn create(
        subscriber_id: SubscriberId,
        creator_id: CreatorId,
        provider_subscription_id: Option<String>,
        status: SubscriptionStatus,
        period: BillingPeriod,
        cancel_at_period_end: bool,
        price_at_purchase: MinorUnits,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            subscriber_id,
            creator_id,
            provider_subscription_id,
            status,
            cancel_at_period_end,
            current_period_start: period.start,
            current_period_end: period.end,
            price_at_purchase,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the subscriber currently has paid access.
    pub fn has_access(&self) -> bool {
        self.status.has_access()
    }

    /// Returns true when cancellation at period end is scheduled on a live subscription.
    pub fn is_canceling(&self) -> bool {
        self.cancel_at_period_end && !self.status.is_terminal()
    }

    /// Records the provider reference. Returns true if it changed.
    pub fn link_provider(&mut self, provider_subscription_id: &str) -> bool {
        if self.provider_subscription_id.as_deref() == Some(provider_subscription_id) {
            return false;
        }
        self.provider_subscription_id = Some(provider_subscription_id.to_string());
        self.touch();
        true
    }

    /// Applies the known sides of a billing period. Unknown sides keep their value.
    pub fn apply_period(&mut self, period: BillingPeriod) {
        if let Some(start) = period.start {
            self.current_period_start = Some(start);
        }
        if let Some(end) = period.end {
            self.current_period_end = Some(end);
        }
        self.touch();
    }

    /// Converges status, period and cancel flag onto the provider's state.
    ///
    /// Returns the previous status when it changed.
    pub fn apply_provider_state(
        &mut self,
        status: SubscriptionStatus,
        period: BillingPeriod,
        cancel_at_period_end: bool,
    ) -> Option<SubscriptionStatus> {
        let previous = self.status;
        self.status = status;
        self.cancel_at_period_end = cancel_at_period_end;
        self.apply_period(period);
        (previous != status).then_some(previous)
    }

    /// Terminal transition for a provider-side deletion. Idempotent.
    pub fn mark_canceled(&mut self) {
        self.status = SubscriptionStatus::Canceled;
        self.cancel_at_period_end = false;
        self.touch();
    }

    /// Applies a failed invoice payment. Returns true if the status changed.
    ///
    /// Canceled rows are left untouched.
    pub fn record_payment_failure(&mut self) -> bool {
        match self.status {
            SubscriptionStatus::Active | SubscriptionStatus::Trialing => {
                self.status = SubscriptionStatus::PastDue;
                self.touch();
                true
            }
            SubscriptionStatus::PastDue | SubscriptionStatus::Canceled => false,
        }
    }

    /// Applies a paid invoice. Steady-state renewals and canceled rows return `None`.
    pub fn record_payment_success(&mut self) -> Option<PaymentRecovery> {
        let recovery = match self.status {
            SubscriptionStatus::PastDue => PaymentRecovery::Recovered,
            SubscriptionStatus::Trialing => PaymentRecovery::TrialConverted,
            SubscriptionStatus::Active | SubscriptionStatus::Canceled => return None,
        };
        self.status = SubscriptionStatus::Active;
        self.touch();
        Some(recovery)
    }

    /// Checks that cancellation at period end may be requested.
    pub fn ensure_cancelable(&self) -> Result<(), SubscriptionError> {
        if self.status.is_terminal() {
            return Err(SubscriptionError::AlreadyCanceled);
        }
        if self.cancel_at_period_end {
            return Err(SubscriptionError::AlreadyCanceling);
        }
        Ok(())
    }

    /// Checks that a scheduled cancellation may be withdrawn.
    pub fn ensure_reactivatable(&self) -> Result<(), SubscriptionError> {
        if self.status.is_terminal() {
            return Err(SubscriptionError::Expired);
        }
        if !self.cancel_at_period_end {
            return Err(SubscriptionError::NotCanceling);
        }
        Ok(())
    }

    pub fn set_cancel_at_period_end(&mut self, cancel_at_period_end: bool) {
        self.cancel_at_period_end = cancel_at_period_end;
        self.touch();
    }

    /// A canceled subscription picked up by a new provider subscription.
    ///
    /// This is a new purchase, so the price is re-captured.
    pub fn restart(
        &mut self,
        provider_subscription_id: &str,
        status: SubscriptionStatus,
        period: BillingPeriod,
        cancel_at_period_end: bool,
        price: MinorUnits,
    ) {
        self.link_provider(provider_subscription_id);
        self.apply_provider_state(status, period, cancel_at_period_end);
        self.price_at_purchase = price;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(status: SubscriptionStatus) -> Subscription {
        Subscription::create(
            SubscriberId::new("user-1").unwrap(),
            CreatorId::new("creator-1").unwrap(),
            Some("sub_123".to_string()),
            status,
            BillingPeriod {
                start: Timestamp::from_unix_secs(1_700_000_000),
                end: Timestamp::from_unix_secs(1_702_592_000),
            },
            false,
            MinorUnits::new(500).unwrap(),
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Creation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn create_sets_all_fields() {
        let sub = subscription(SubscriptionStatus::Trialing);

        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert_eq!(sub.provider_subscription_id.as_deref(), Some("sub_123"));
        assert_eq!(sub.price_at_purchase.value(), 500);
        assert!(sub.current_period_end.is_some());
        assert!(sub.has_access());
    }

    #[test]
    fn link_provider_reports_change_only_once() {
        let mut sub = subscription(SubscriptionStatus::Active);
        sub.provider_subscription_id = None;

        assert!(sub.link_provider("sub_456"));
        assert!(!sub.link_provider("sub_456"));
        assert_eq!(sub.provider_subscription_id.as_deref(), Some("sub_456"));
    }

    // ══════════════════════════════════════════════════════════════
    // Provider State Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn empty_period_keeps_existing_dates() {
        let mut sub = subscription(SubscriptionStatus::Active);
        let before = sub.current_period_end;

        sub.apply_provider_state(SubscriptionStatus::Active, BillingPeriod::default(), true);

        assert_eq!(sub.current_period_end, before);
        assert!(sub.cancel_at_period_end);
    }

    #[test]
    fn apply_provider_state_reports_previous_status() {
        let mut sub = subscription(SubscriptionStatus::Trialing);

        let previous =
            sub.apply_provider_state(SubscriptionStatus::Active, BillingPeriod::default(), false);

        assert_eq!(previous, Some(SubscriptionStatus::Trialing));
        assert_eq!(
            sub.apply_provider_state(SubscriptionStatus::Active, BillingPeriod::default(), false),
            None
        );
    }

    #[test]
    fn restart_recaptures_price_and_reference() {
        let mut sub = subscription(SubscriptionStatus::Active);
        sub.mark_canceled();

        sub.restart(
            "sub_789",
            SubscriptionStatus::Active,
            BillingPeriod::default(),
            false,
            MinorUnits::new(999).unwrap(),
        );

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.provider_subscription_id.as_deref(), Some("sub_789"));
        assert_eq!(sub.price_at_purchase.value(), 999);
        assert!(sub.current_period_end.is_some());
    }

    #[test]
    fn mark_canceled_clears_cancel_flag() {
        let mut sub = subscription(SubscriptionStatus::PastDue);
        sub.cancel_at_period_end = true;

        sub.mark_canceled();

        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert!(!sub.cancel_at_period_end);
        assert!(!sub.has_access());
    }

    // ══════════════════════════════════════════════════════════════
    // Invoice Transition Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn payment_failure_moves_active_to_past_due_once() {
        let mut sub = subscription(SubscriptionStatus::Active);

        assert!(sub.record_payment_failure());
        assert!(!sub.record_payment_failure());
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
    }

    #[test]
    fn payment_failure_leaves_canceled_untouched() {
        let mut sub = subscription(SubscriptionStatus::Canceled);

        assert!(!sub.record_payment_failure());
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
    }

    #[test]
    fn payment_success_recovers_past_due() {
        let mut sub = subscription(SubscriptionStatus::PastDue);

        assert_eq!(sub.record_payment_success(), Some(PaymentRecovery::Recovered));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn payment_success_converts_trial() {
        let mut sub = subscription(SubscriptionStatus::Trialing);

        assert_eq!(sub.record_payment_success(), Some(PaymentRecovery::TrialConverted));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn renewal_on_active_is_a_no_op() {
        let mut sub = subscription(SubscriptionStatus::Active);
        assert_eq!(sub.record_payment_success(), None);
    }

    #[test]
    fn payment_success_does_not_resurrect_canceled() {
        let mut sub = subscription(SubscriptionStatus::Canceled);

        assert_eq!(sub.record_payment_success(), None);
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
    }

    // ══════════════════════════════════════════════════════════════
    // Mutation Guard Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn cancel_guard_rejects_canceled_and_canceling() {
        assert_eq!(
            subscription(SubscriptionStatus::Canceled).ensure_cancelable(),
            Err(SubscriptionError::AlreadyCanceled)
        );

        let mut canceling = subscription(SubscriptionStatus::Active);
        canceling.cancel_at_period_end = true;
        assert_eq!(canceling.ensure_cancelable(), Err(SubscriptionError::AlreadyCanceling));

        assert!(subscription(SubscriptionStatus::PastDue).ensure_cancelable().is_ok());
    }

    #[test]
    fn reactivate_guard_requires_canceling_state() {
        assert_eq!(
            subscription(SubscriptionStatus::Active).ensure_reactivatable(),
            Err(SubscriptionError::NotCanceling)
        );
        assert_eq!(
            subscription(SubscriptionStatus::Canceled).ensure_reactivatable(),
            Err(SubscriptionError::Expired)
        );

        let mut canceling = subscription(SubscriptionStatus::Trialing);
        canceling.cancel_at_period_end = true;
        assert!(canceling.ensure_reactivatable().is_ok());
        assert!(canceling.is_canceling());
    }
}
