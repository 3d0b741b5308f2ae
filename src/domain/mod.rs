pub mod cart;
mod helpers;
pub mod stores;

pub use helpers::{
    deadline::{retry_on_conflict, with_deadline},
    fake,
};

use std::sync::Arc;

use sqlx::PgPool;

use crate::infra::PricingSettings;
use stores::{CartStore, PgCartStore, PgProductCatalog, ProductCatalog};

/// Everything a cart operation needs: where carts live, where prices come from, and how
/// totals are computed.
#[derive(Clone)]
pub struct CartServices {
    pub carts: Arc<dyn CartStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub pricing: PricingSettings,
}

impl CartServices {
    pub fn new(
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn ProductCatalog>,
        pricing: PricingSettings,
    ) -> Self {
        Self {
            carts,
            catalog,
            pricing,
        }
    }

    pub fn postgres(pool: &PgPool, pricing: PricingSettings) -> Self {
        Self::new(
            Arc::new(PgCartStore::new(pool.clone())),
            Arc::new(PgProductCatalog::new(pool.clone())),
            pricing,
        )
    }
}

impl std::fmt::Debug for CartServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartServices")
            .field("pricing", &self.pricing)
            .finish_non_exhaustive()
    }
}
