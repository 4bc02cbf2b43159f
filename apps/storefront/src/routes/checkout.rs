//! # Checkout Validation
//!
//! The order review form posts the shipping state it has selected. That
//! value outranks both the query parameter and the cookie for this request,
//! so the cart is priced and checked for the province the order ships to.
//!
//! ```text
//! POST /checkout/validate { "shippingState": "QC" }
//!        │
//!        ▼
//! restore + recompute for QC
//!        │
//!        ▼
//! any line hidden in QC? ──yes──► 422 UNAVAILABLE_ITEMS (names listed once)
//!        │ no
//!        ▼
//! 200 with the repriced cart
//! ```

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use super::cart::render_cart;
use super::{province_code, ProvinceQuery, Shopper};
use crate::dto::{CheckoutRequest, CheckoutResponse};
use crate::error::ApiResult;
use crate::state::AppState;
use maple_core::context::RequestSurface;
use maple_core::Cart;

/// `POST /checkout/validate`
pub async fn validate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<ProvinceQuery>,
    Json(request): Json<CheckoutRequest>,
) -> (CookieJar, ApiResult<Json<CheckoutResponse>>) {
    let mut shopper = Shopper::from_request(jar, params.province);
    if let Some(shipping) = request.shipping_state.filter(|s| !s.trim().is_empty()) {
        shopper.signal = shopper.signal.with_checkout_override(shipping);
    }

    let engine = state.engine();
    let ctx = engine.begin_request(&shopper.signal, RequestSurface::CartOrCheckout);

    let check = |cart: &mut Cart| -> ApiResult<CheckoutResponse> {
        let rendered = render_cart(&ctx, cart);
        if let Err(e) = ctx.validate_checkout(&*cart, ctx.jurisdiction()) {
            warn!(session = %shopper.session, error = %e, "Checkout blocked");
            return Err(e.into());
        }
        info!(
            province = ?ctx.jurisdiction(),
            lines = cart.item_count(),
            "Checkout validated"
        );
        Ok(CheckoutResponse {
            province: province_code(ctx.jurisdiction()),
            cart: rendered,
        })
    };
    let result = state
        .carts
        .with_existing(&shopper.session, &check)
        .unwrap_or_else(|| check(&mut Cart::new(ctx.now())))
        .map(Json);

    let directive = ctx.resolution().cookie();
    (shopper.finish(&state.cookie_policy, directive), result)
}
