//! # Product Handlers
//!
//! Listing and single product pages. Both run on the catalog surface, so
//! prices are province-adjusted and hidden products never appear.
//!
//! ## Listing Parameters
//! ```text
//! /products?province=ON                     archive
//! /products?province=ON&ids=12,15,40        shortcode whitelist
//! /products?exclude_categories=7            archive minus a category
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::debug;

use super::{province_code, Shopper};
use crate::dto::{ListingResponse, ProductPageResponse, ProductSummary, VariationSummary};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use maple_core::context::{RequestContext, RequestSurface};
use maple_core::{
    CategoryId, ListingQuery, PriceContext, Product, ProductId, ProductKind, PurchaseOrigin,
};

/// Query string of `GET /products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    #[serde(default)]
    pub province: Option<String>,
    /// Comma-separated whitelist.
    #[serde(default)]
    pub ids: Option<String>,
    /// Comma-separated category ids to leave out.
    #[serde(default)]
    pub exclude_categories: Option<String>,
}

impl ListingParams {
    fn listing_query(&self) -> ApiResult<ListingQuery> {
        let mut query = match &self.ids {
            Some(ids) => {
                let ids = parse_ids(ids, "ids")?;
                ListingQuery::including(ids.into_iter().map(ProductId).collect())
            }
            None => ListingQuery::all(),
        };
        if let Some(categories) = &self.exclude_categories {
            query.exclude_categories = parse_ids(categories, "exclude_categories")?
                .into_iter()
                .map(CategoryId)
                .collect::<BTreeSet<_>>();
        }
        Ok(query)
    }
}

fn parse_ids(raw: &str, field: &str) -> ApiResult<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| ApiError::validation(format!("Invalid id in {}: '{}'", field, s)))
        })
        .collect()
}

/// Price touchpoint for a product shown on the catalog surface.
fn catalog_context(product: &Product) -> PriceContext {
    match product.kind {
        ProductKind::Variable => PriceContext::CatalogVariableRange,
        ProductKind::Simple | ProductKind::Variation { .. } => PriceContext::CatalogSingle,
    }
}

/// A province switch must not leave the cart priced for the old province.
fn recompute_cart_on_change(state: &AppState, ctx: &RequestContext<'_>, session: &str) {
    if ctx.resolution().changed() {
        if let Some(outcome) = state
            .carts
            .with_existing(session, |cart| ctx.recompute_cart(cart))
        {
            debug!(?outcome, "Province changed, cart recomputed");
        }
    }
}

/// `GET /products`
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<ListingParams>,
) -> (CookieJar, ApiResult<Json<ListingResponse>>) {
    let shopper = Shopper::from_request(jar, params.province.clone());
    let engine = state.engine();
    let ctx = engine.begin_request(&shopper.signal, RequestSurface::Catalog);

    recompute_cart_on_change(&state, &ctx, &shopper.session);

    let result = params.listing_query().map(|query| {
        let products = ctx
            .visible_products(query)
            .iter()
            .map(|p| ProductSummary::new(p, &ctx.display_price(p, catalog_context(p))))
            .collect::<Vec<_>>();

        debug!(count = products.len(), "Listing rendered");
        Json(ListingResponse {
            province: province_code(ctx.jurisdiction()),
            fingerprint: ctx.fingerprint().to_string(),
            products,
        })
    });

    let directive = ctx.resolution().cookie();
    (shopper.finish(&state.cookie_policy, directive), result)
}

/// `GET /products/{id}`
///
/// A product hidden in the shopper's province is reported as not found,
/// the same as it being absent from every listing.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<u64>,
    Query(params): Query<super::ProvinceQuery>,
) -> (CookieJar, ApiResult<Json<ProductPageResponse>>) {
    let shopper = Shopper::from_request(jar, params.province);
    let engine = state.engine();
    let ctx = engine.begin_request(&shopper.signal, RequestSurface::Catalog);

    recompute_cart_on_change(&state, &ctx, &shopper.session);

    let result = product_page(&ctx, ProductId(id)).map(Json);

    let directive = ctx.resolution().cookie();
    (shopper.finish(&state.cookie_policy, directive), result)
}

fn product_page(ctx: &RequestContext<'_>, id: ProductId) -> ApiResult<ProductPageResponse> {
    let product = ctx
        .catalog()
        .product(id)
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    if let Some(j) = ctx.jurisdiction() {
        if ctx.is_hidden(&product, j) {
            return Err(ApiError::not_found("Product", id));
        }
    }

    let display = ctx.display_price(&product, catalog_context(&product));

    let variations = if product.is_variable() {
        ctx.catalog()
            .variations(product.id)
            .into_iter()
            .filter_map(|vid| ctx.catalog().product(vid))
            .filter(|variation| match ctx.jurisdiction() {
                Some(j) => !ctx.is_hidden(variation, j),
                None => true,
            })
            .map(|variation| {
                let display = ctx.display_price(&variation, PriceContext::CatalogSingle);
                VariationSummary {
                    id: variation.id,
                    name: variation.name.clone(),
                    size: variation.size.clone(),
                    price_html: display.render(),
                    price: display.money(),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let purchasable = ctx
        .check_purchasable(&product, PurchaseOrigin::ProductPage)
        .is_ok();

    Ok(ProductPageResponse {
        province: province_code(ctx.jurisdiction()),
        fingerprint: ctx.fingerprint().to_string(),
        product: ProductSummary::new(&product, &display),
        variations,
        purchasable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_params_build_query() {
        let params = ListingParams {
            province: None,
            ids: Some("3, 1,".to_string()),
            exclude_categories: Some("9".to_string()),
        };
        let query = params.listing_query().unwrap();
        assert_eq!(query.include_ids, Some(vec![ProductId(3), ProductId(1)]));
        assert!(query.exclude_categories.contains(&CategoryId(9)));
    }

    #[test]
    fn test_listing_params_reject_garbage() {
        let params = ListingParams {
            ids: Some("3,x".to_string()),
            ..Default::default()
        };
        assert!(params.listing_query().is_err());
    }
}
