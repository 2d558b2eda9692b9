//! Offer catalog.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OfferId;
use tokio::sync::RwLock;

use crate::error::{PromotionError, Result};
use crate::offer::Offer;

/// Filter for browsing the catalog. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferFilter {
    /// Case-insensitive substring of the name or description.
    pub query: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl OfferFilter {
    pub fn matches(&self, offer: &Offer) -> bool {
        self.is_active.is_none_or(|active| offer.is_active == active)
            && self
                .is_featured
                .is_none_or(|featured| offer.is_featured == featured)
            && self.query.as_deref().is_none_or(|query| {
                let needle = query.trim().to_lowercase();
                offer.name.to_lowercase().contains(&needle)
                    || offer.description.to_lowercase().contains(&needle)
            })
    }
}

/// Storage for offers.
#[async_trait]
pub trait OfferCatalog: Send + Sync {
    /// Inserts or replaces an offer.
    async fn save(&self, offer: Offer) -> Result<()>;

    async fn get(&self, offer_id: OfferId) -> Result<Option<Offer>>;

    /// Every offer, ranked.
    async fn offers(&self) -> Result<Vec<Offer>>;

    /// Offers matching a filter, ranked.
    async fn list(&self, filter: &OfferFilter) -> Result<Vec<Offer>>;

    /// Turns an offer on or off.
    async fn set_active(&self, offer_id: OfferId, active: bool) -> Result<()>;
}

/// In-memory offer catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOfferCatalog {
    offers: Arc<RwLock<HashMap<OfferId, Offer>>>,
}

impl InMemoryOfferCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding `offers`.
    pub fn with_offers(offers: impl IntoIterator<Item = Offer>) -> Self {
        let offers = offers.into_iter().map(|offer| (offer.id, offer)).collect();
        Self {
            offers: Arc::new(RwLock::new(offers)),
        }
    }
}

#[async_trait]
impl OfferCatalog for InMemoryOfferCatalog {
    async fn save(&self, offer: Offer) -> Result<()> {
        self.offers.write().await.insert(offer.id, offer);
        Ok(())
    }

    async fn get(&self, offer_id: OfferId) -> Result<Option<Offer>> {
        Ok(self.offers.read().await.get(&offer_id).cloned())
    }

    async fn offers(&self) -> Result<Vec<Offer>> {
        self.list(&OfferFilter::default()).await
    }

    async fn list(&self, filter: &OfferFilter) -> Result<Vec<Offer>> {
        let mut offers: Vec<Offer> = self
            .offers
            .read()
            .await
            .values()
            .filter(|offer| filter.matches(offer))
            .cloned()
            .collect();
        offers.sort_by(Offer::rank_cmp);
        Ok(offers)
    }

    #[tracing::instrument(skip(self))]
    async fn set_active(&self, offer_id: OfferId, active: bool) -> Result<()> {
        let mut offers = self.offers.write().await;
        let offer = offers
            .get_mut(&offer_id)
            .ok_or(PromotionError::OfferNotFound(offer_id))?;
        offer.is_active = active;
        Ok(())
    }
}
