//! Client-local cart model.
//!
//! The cart never touches the server until checkout; storefront clients keep
//! it in whatever durable key-value store they have (browser local storage,
//! a settings file) under [`CART_STORAGE_KEY`] and post the line items to the
//! order-creation endpoint when the shopper checks out.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed key the serialized cart is stored under.
pub const CART_STORAGE_KEY: &str = "hb_cart_v1";

pub const MIN_QTY: i32 = 1;
pub const MAX_QTY: i32 = 99;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<i64>,
    pub qty: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from a previously persisted payload. Anything that is
    /// not a JSON array of line items (missing key, corrupt data, wrong
    /// shape) yields an empty cart rather than an error.
    pub fn load(raw: Option<&str>) -> Self {
        let items = raw
            .and_then(|s| serde_json::from_str::<Vec<CartLineItem>>(s).ok())
            .unwrap_or_default();
        Self { items }
    }

    /// Serialize for persistence under [`CART_STORAGE_KEY`].
    pub fn dump(&self) -> String {
        serde_json::to_string(&self.items).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Total quantity across all lines.
    pub fn count(&self) -> i32 {
        self.items.iter().map(|it| it.qty).sum()
    }

    /// Add `qty` of a product. An existing line for the same product id has
    /// its quantity incremented; otherwise a new line is appended.
    pub fn add(&mut self, item: CartLineItem, qty: i32) {
        match self.items.iter_mut().find(|p| p.id == item.id) {
            Some(existing) => existing.qty += qty,
            None => self.items.push(CartLineItem { qty, ..item }),
        }
    }

    /// Remove the line for a product id. No-op when absent.
    pub fn remove(&mut self, id: Uuid) {
        self.items.retain(|p| p.id != id);
    }

    /// Replace a line's quantity, clamped to `[MIN_QTY, MAX_QTY]`. No-op
    /// when the id is absent.
    pub fn set_qty(&mut self, id: Uuid, qty: i32) {
        let safe = qty.clamp(MIN_QTY, MAX_QTY);
        if let Some(line) = self.items.iter_mut().find(|p| p.id == id) {
            line.qty = safe;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(id: Uuid) -> CartLineItem {
        CartLineItem {
            id,
            slug: "widget".into(),
            title: "Widget".into(),
            unit_price: Some(1000),
            qty: 1,
        }
    }

    #[test]
    fn add_same_product_sums_quantity() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(widget(id), 1);
        cart.add(widget(id), 2);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].qty, 3);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn set_qty_clamps_to_bounds() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(widget(id), 1);

        cart.set_qty(id, 150);
        assert_eq!(cart.items()[0].qty, 99);

        cart.set_qty(id, 0);
        assert_eq!(cart.items()[0].qty, 1);
    }

    #[test]
    fn set_qty_and_remove_ignore_unknown_ids() {
        let id = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add(widget(id), 2);

        cart.set_qty(Uuid::new_v4(), 5);
        cart.remove(Uuid::new_v4());

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].qty, 2);
    }

    #[test]
    fn persisted_cart_round_trips() {
        let mut cart = Cart::new();
        cart.add(widget(Uuid::new_v4()), 2);
        cart.add(widget(Uuid::new_v4()), 7);

        let raw = cart.dump();
        let reloaded = Cart::load(Some(&raw));

        assert_eq!(reloaded.items().len(), 2);
        assert_eq!(reloaded.dump(), raw);
    }

    #[test]
    fn invalid_persisted_data_is_treated_as_empty() {
        assert!(Cart::load(None).items().is_empty());
        assert!(Cart::load(Some("not json")).items().is_empty());
        assert!(Cart::load(Some("{\"items\":3}")).items().is_empty());
    }

    #[test]
    fn clear_empties_the_cart() {
        let mut cart = Cart::new();
        cart.add(widget(Uuid::new_v4()), 4);
        cart.clear();
        assert!(cart.items().is_empty());
        assert_eq!(cart.count(), 0);
    }
}
