//! CreatorPricing port - The creator's current listed price.
//!
//! Read once when a subscription row is created; that value becomes the
//! subscriber's grandfathered `price_at_purchase`.

use async_trait::async_trait;

use crate::domain::foundation::{CreatorId, DomainError, MinorUnits};

#[async_trait]
pub trait CreatorPricing: Send + Sync {
    /// Returns the creator's current monthly price, or `None` for an unknown creator.
    async fn current_price(&self, creator_id: &CreatorId) -> Result<Option<MinorUnits>, DomainError>;
}
