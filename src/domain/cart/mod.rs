mod add_item;
mod cart_view;
mod errors;
mod get_cart;
mod identity;
mod ids;
mod merge_carts;
mod model;
mod pricing;
mod products;
mod purge_abandoned;
mod remove_item;

pub use add_item::{AddItemCommand, AddItemPayload, add_item, add_item_endpoint};
pub use cart_view::{CartView, CartViewItem, CartViewResponse, refresh_cart};
pub use errors::CartError;
pub use get_cart::{get_cart, get_cart_endpoint};
pub use identity::{Identity, SessionSlot, resolve_cart};
pub use ids::*;
pub use merge_carts::{merge_carts_endpoint, merge_guest_cart};
pub use model::{Cart, CartLineItem, CartOwner, OwnerKind, Quantity};
pub use pricing::{CartTotals, PricingLine, calculate_totals};
pub use products::{MalformedProduct, Product, resolve_product};
pub use purge_abandoned::{PurgeReport, purge_abandoned_carts};
pub use remove_item::{RemoveItemCommand, RemoveItemPayload, remove_item, remove_item_endpoint};
