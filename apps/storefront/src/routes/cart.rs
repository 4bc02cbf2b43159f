//! # Cart Handlers
//!
//! ## Cart Page Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET /cart                                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  restore_cart      every line back to its stored base price            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  recompute_cart    base ─► size surcharge ─► province tax              │
//! │       │            (guarded: a nested pass is a no-op)                 │
//! │       ▼                                                                 │
//! │  render            CartLine / CartSubtotal prices, totals              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, info};

use super::{province_code, ProvinceQuery, Shopper};
use crate::dto::{AddToCartRequest, CartLineResponse, CartResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use maple_core::context::{RequestContext, RequestSurface};
use maple_core::{Cart, PriceContext, PriceDisplay, PurchaseOrigin};

/// Restores, recomputes and renders a cart.
pub(crate) fn render_cart(ctx: &RequestContext<'_>, cart: &mut Cart) -> CartResponse {
    ctx.restore_cart(cart);
    let outcome = ctx.recompute_cart(cart);
    debug!(?outcome, lines = cart.item_count(), "Cart priced");

    let lines = cart
        .items
        .iter()
        .map(|item| {
            let (unit, subtotal) = match ctx.catalog().product(item.product_id) {
                Some(product) => (
                    ctx.display_price(&product, PriceContext::CartLine),
                    ctx.display_price(
                        &product,
                        PriceContext::CartSubtotal {
                            quantity: item.quantity,
                        },
                    ),
                ),
                None => (
                    PriceDisplay::single(item.effective_price),
                    PriceDisplay::single(item.line_total()),
                ),
            };
            CartLineResponse {
                key: item.key.clone(),
                product_id: item.product_id,
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price_html: unit.render(),
                unit_price: unit.money(),
                subtotal_html: subtotal.render(),
                subtotal: subtotal.money(),
            }
        })
        .collect();

    CartResponse {
        province: province_code(ctx.jurisdiction()),
        lines,
        totals: cart.totals().into(),
    }
}

/// `GET /cart`
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<ProvinceQuery>,
) -> (CookieJar, ApiResult<Json<CartResponse>>) {
    let shopper = Shopper::from_request(jar, params.province);
    let engine = state.engine();
    let ctx = engine.begin_request(&shopper.signal, RequestSurface::CartOrCheckout);

    // Viewing never creates a cart; a session without one sees an empty cart.
    let response = state
        .carts
        .with_existing(&shopper.session, |cart| render_cart(&ctx, cart))
        .unwrap_or_else(|| render_cart(&ctx, &mut Cart::new(ctx.now())));

    let directive = ctx.resolution().cookie();
    (shopper.finish(&state.cookie_policy, directive), Ok(Json(response)))
}

/// `POST /cart/items`
///
/// Variable parents cannot be bought directly; a variation must be picked.
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<ProvinceQuery>,
    Json(request): Json<AddToCartRequest>,
) -> (CookieJar, ApiResult<Json<CartResponse>>) {
    let shopper = Shopper::from_request(jar, params.province);
    let engine = state.engine();
    let ctx = engine.begin_request(&shopper.signal, RequestSurface::CartOrCheckout);

    let result = add_to_session_cart(&state, &ctx, &shopper.session, &request).map(Json);

    let directive = ctx.resolution().cookie();
    (shopper.finish(&state.cookie_policy, directive), result)
}

fn add_to_session_cart(
    state: &AppState,
    ctx: &RequestContext<'_>,
    session: &str,
    request: &AddToCartRequest,
) -> ApiResult<CartResponse> {
    if request.quantity == 0 {
        return Err(ApiError::validation("Quantity must be at least 1"));
    }

    let product = ctx
        .catalog()
        .product(request.product_id)
        .ok_or_else(|| ApiError::not_found("Product", request.product_id))?;

    if product.is_variable() {
        return Err(ApiError::validation(format!(
            "Choose an option of {} before adding it to the cart",
            product.name
        )));
    }

    let origin = if request.from_product_page {
        PurchaseOrigin::ProductPage
    } else {
        PurchaseOrigin::Other
    };
    ctx.check_purchasable(&product, origin)?;

    state.carts.with_cart(session, |cart| -> ApiResult<CartResponse> {
        let key = cart.add_item(&product, request.quantity, ctx.now())?;
        info!(
            product_id = %product.id,
            quantity = request.quantity,
            line = %key,
            "Added to cart"
        );
        Ok(render_cart(ctx, cart))
    })
}
