//! # Response and Request Bodies
//!
//! JSON shapes the storefront theme consumes. TypeScript bindings are
//! exported with `ts-rs`.
//!
//! Prices travel twice: `priceHtml` is the rendered fragment (with
//! `<del>`/`<ins>` for sales and an en dash for ranges) and `price` is the
//! rounded amount a script can compare.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use maple_core::cart::CartTotals;
use maple_core::{Money, PriceDisplay, Product, ProductId, ProductKind};

/// One product in a listing or on its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub kind: ProductKind,
    pub price_html: String,
    pub price: Money,
    pub on_sale: bool,
}

impl ProductSummary {
    pub fn new(product: &Product, display: &PriceDisplay) -> Self {
        ProductSummary {
            id: product.id,
            name: product.name.clone(),
            kind: product.kind,
            price_html: display.render(),
            price: display.money(),
            on_sale: matches!(display, PriceDisplay::Sale { .. }),
        }
    }
}

/// `GET /products`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ListingResponse {
    /// Province code, or `None` when the shopper has not picked one.
    pub province: Option<String>,
    /// Cache-key component for rendered prices.
    pub fingerprint: String,
    pub products: Vec<ProductSummary>,
}

/// One purchasable option of a variable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VariationSummary {
    pub id: ProductId,
    pub name: String,
    pub size: Option<String>,
    pub price_html: String,
    pub price: Money,
}

/// `GET /products/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductPageResponse {
    pub province: Option<String>,
    pub fingerprint: String,
    pub product: ProductSummary,
    pub variations: Vec<VariationSummary>,
    /// False when add-to-cart from this page would be rejected.
    pub purchasable: bool,
}

/// `POST /cart/items`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Submitted from the single product page form.
    #[serde(default)]
    pub from_product_page: bool,
}

fn default_quantity() -> u32 {
    1
}

/// One cart line as rendered on the cart page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineResponse {
    pub key: String,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price_html: String,
    pub unit_price: Money,
    pub subtotal_html: String,
    pub subtotal: Money,
}

/// Cart totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotalsResponse {
    pub item_count: u32,
    pub total_quantity: u32,
    pub subtotal: Money,
    pub subtotal_html: String,
}

impl From<CartTotals> for CartTotalsResponse {
    fn from(totals: CartTotals) -> Self {
        CartTotalsResponse {
            item_count: u32::try_from(totals.item_count).unwrap_or(u32::MAX),
            total_quantity: totals.total_quantity,
            subtotal: totals.subtotal,
            subtotal_html: totals.subtotal.to_string(),
        }
    }
}

/// `GET /cart`, `POST /cart/items`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartResponse {
    pub province: Option<String>,
    pub lines: Vec<CartLineResponse>,
    pub totals: CartTotalsResponse,
}

/// `POST /checkout/validate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    /// Shipping state picked in the order review form.
    #[serde(default)]
    pub shipping_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutResponse {
    pub province: Option<String>,
    pub cart: CartResponse,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    pub products: u32,
    pub snapshot_loaded_at: String,
    pub database: Option<bool>,
}
