use fake::{Dummy, rand::seq::IteratorRandom};
use rust_decimal::Decimal;

/// Prices between 0.10 and 9.99.
pub struct Price;

impl Dummy<Price> for Decimal {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_config: &Price, rng: &mut R) -> Self {
        let value = (10..1000).choose(rng).unwrap_or(100);
        Decimal::new(value, 2)
    }
}

/// Quantities a shopper would plausibly pick, 1 to 9.
pub struct SmallQuantity;

impl Dummy<SmallQuantity> for u32 {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_config: &SmallQuantity, rng: &mut R) -> Self {
        (1..10).choose(rng).unwrap_or(1)
    }
}
