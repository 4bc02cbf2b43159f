//! # Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET  /health              snapshot + database status                  │
//! │  GET  /products            visible listing, catalog prices             │
//! │  GET  /products/{id}       product page price + purchasability         │
//! │  GET  /cart                restore, recompute, render lines            │
//! │  POST /cart/items          add to cart behind the purchase guard       │
//! │  POST /checkout/validate   province availability of every line         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every pricing handler follows the same shape:
//!
//! ```text
//! Shopper::from_request(jar, ?province=)      read cookies, mint session
//!        │
//!        ▼
//! state.engine().begin_request(signal, surface)
//!        │   (no .await from here on: RequestContext is not Send)
//!        ▼
//! core operations ──► DTO
//!        │
//!        ▼
//! shopper.finish(cookie directive) ──► (CookieJar, Json)
//! ```

pub mod cart;
pub mod checkout;
pub mod health;
pub mod products;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use maple_core::jurisdiction::{CookieDirective, CookiePolicy, JurisdictionSignal, PROVINCE_PARAM};
use maple_core::Jurisdiction;

/// Name of the cookie carrying the cart session id.
pub const SESSION_COOKIE: &str = "session";

/// The `?province=` parameter every page accepts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvinceQuery {
    #[serde(default)]
    pub province: Option<String>,
}

/// Cookie-level identity of the shopper for one request.
#[derive(Debug)]
pub struct Shopper {
    jar: CookieJar,
    pub session: String,
    pub signal: JurisdictionSignal,
}

impl Shopper {
    /// Reads the province and session cookies. A session id is minted when
    /// the shopper has none.
    pub fn from_request(jar: CookieJar, province: Option<String>) -> Self {
        let cookie = jar.get(PROVINCE_PARAM).map(|c| c.value().to_string());
        let signal = JurisdictionSignal {
            query: province,
            cookie,
            checkout_override: None,
        };

        let (jar, session) = match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
            Some(session) if !session.is_empty() => (jar, session),
            _ => {
                let session = Uuid::new_v4().to_string();
                let cookie = Cookie::build((SESSION_COOKIE, session.clone()))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .build();
                (jar.add(cookie), session)
            }
        };

        Shopper { jar, session, signal }
    }

    /// Applies the resolver's cookie directive and returns the jar to send.
    pub fn finish(self, policy: &CookiePolicy, directive: Option<CookieDirective>) -> CookieJar {
        match directive {
            Some(CookieDirective::Set(jurisdiction)) => {
                self.jar.add(province_cookie(policy, jurisdiction))
            }
            Some(CookieDirective::Clear) => self.jar.remove(
                Cookie::build(PROVINCE_PARAM)
                    .path(policy.path)
                    .domain(policy.domain.clone()),
            ),
            None => self.jar,
        }
    }
}

fn province_cookie(policy: &CookiePolicy, jurisdiction: Jurisdiction) -> Cookie<'static> {
    let same_site = match policy.same_site() {
        "Strict" => SameSite::Strict,
        "None" => SameSite::None,
        _ => SameSite::Lax,
    };
    Cookie::build((policy.name, jurisdiction.code()))
        .domain(policy.domain.clone())
        .path(policy.path)
        .max_age(time::Duration::seconds(policy.max_age.num_seconds()))
        .secure(policy.secure)
        .http_only(policy.http_only)
        .same_site(same_site)
        .build()
}

/// Province code for response bodies.
pub(crate) fn province_code(jurisdiction: Option<Jurisdiction>) -> Option<String> {
    jurisdiction.map(|j| j.code().to_string())
}
