//! Pricing Calculator. Pure: no I/O, no state.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::infra::PricingSettings;

/// One line as seen by the calculator. `price` is `None` when the product did not resolve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricingLine {
    pub price: Option<Decimal>,
    pub quantity: u32,
}

/// Monetary totals, rounded to cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub item_count: u64,
}

/// Totals the valid lines. A line counts only if its product resolved to a non-negative
/// price and its quantity is at least one; anything else is left out entirely.
/// Rounding happens once, on the way out.
pub fn calculate_totals<'a, I>(lines: I, settings: &PricingSettings) -> CartTotals
where
    I: IntoIterator<Item = &'a PricingLine>,
{
    let (subtotal, item_count) = lines
        .into_iter()
        .filter_map(|line| match line.price {
            Some(price) if price >= Decimal::ZERO && line.quantity >= 1 => {
                Some((price, line.quantity))
            }
            _ => None,
        })
        .fold((Decimal::ZERO, 0u64), |(sum, count), (price, quantity)| {
            (
                sum + price * Decimal::from(quantity),
                count + u64::from(quantity),
            )
        });

    let shipping = if subtotal > settings.free_shipping_threshold {
        Decimal::ZERO
    } else {
        settings.flat_shipping_fee
    };
    let tax = subtotal * settings.tax_rate;
    let total = subtotal + tax + shipping;

    CartTotals {
        subtotal: to_cents(subtotal),
        shipping: to_cents(shipping),
        tax: to_cents(tax),
        total: to_cents(total),
        item_count,
    }
}

fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
