//! In-memory implementation of CreatorPricing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{CreatorId, DomainError, MinorUnits};
use crate::ports::CreatorPricing;

#[derive(Default)]
pub struct InMemoryCreatorPricing {
    prices: RwLock<HashMap<CreatorId, MinorUnits>>,
}

impl InMemoryCreatorPricing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or changes) a creator's current price.
    pub async fn set_price(&self, creator_id: CreatorId, price: MinorUnits) {
        self.prices.write().await.insert(creator_id, price);
    }
}

#[async_trait]
impl CreatorPricing for InMemoryCreatorPricing {
    async fn current_price(&self, creator_id: &CreatorId) -> Result<Option<MinorUnits>, DomainError> {
        Ok(self.prices.read().await.get(creator_id).copied())
    }
}
