//! # Jurisdiction Resolution
//!
//! Decides which province's pricing rules apply to a request.
//!
//! ## Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Resolving the Active Province                        │
//! │                                                                         │
//! │  checkout override (shipping state chosen during order review)         │
//! │       │ valid? ──────────────────────────────► use it, no cookie write │
//! │       ▼                                                                 │
//! │  ?province=XX                                                          │
//! │       │ "NO"     ──────────────────────────► none, clear cookie        │
//! │       │ valid    ──────────────────────────► XX, write cookie          │
//! │       │ anything else ─────────────────────► none (cookie NOT read)    │
//! │       ▼                                                                 │
//! │  province cookie                                                       │
//! │       │ valid    ──────────────────────────► XX                        │
//! │       │ garbage  ──────────────────────────► none, clear cookie        │
//! │       ▼                                                                 │
//! │  none (shopper sees the province gate)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution runs exactly once, when the request context is created, and
//! the result is immutable for the rest of the request.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use ts_rs::TS;

/// Query parameter and cookie name carrying the province code.
pub const PROVINCE_PARAM: &str = "province";

/// Query value meaning "explicitly no province".
pub const NO_PROVINCE_SENTINEL: &str = "NO";

/// Lifetime of the mirrored province cookie.
pub const COOKIE_LIFETIME_DAYS: i64 = 60;

// =============================================================================
// Jurisdiction
// =============================================================================

/// One of the 13 Canadian provinces and territories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Jurisdiction {
    #[serde(rename = "AB")]
    Alberta,
    #[serde(rename = "BC")]
    BritishColumbia,
    #[serde(rename = "MB")]
    Manitoba,
    #[serde(rename = "NB")]
    NewBrunswick,
    #[serde(rename = "NL")]
    NewfoundlandAndLabrador,
    #[serde(rename = "NS")]
    NovaScotia,
    #[serde(rename = "ON")]
    Ontario,
    #[serde(rename = "PE")]
    PrinceEdwardIsland,
    #[serde(rename = "QC")]
    Quebec,
    #[serde(rename = "SK")]
    Saskatchewan,
    #[serde(rename = "NT")]
    NorthwestTerritories,
    #[serde(rename = "NU")]
    Nunavut,
    #[serde(rename = "YT")]
    Yukon,
}

impl Jurisdiction {
    /// Every whitelisted code, in settings-screen order.
    pub const ALL: [Jurisdiction; 13] = [
        Jurisdiction::Alberta,
        Jurisdiction::BritishColumbia,
        Jurisdiction::Manitoba,
        Jurisdiction::NewBrunswick,
        Jurisdiction::NewfoundlandAndLabrador,
        Jurisdiction::NovaScotia,
        Jurisdiction::Ontario,
        Jurisdiction::PrinceEdwardIsland,
        Jurisdiction::Quebec,
        Jurisdiction::Saskatchewan,
        Jurisdiction::NorthwestTerritories,
        Jurisdiction::Nunavut,
        Jurisdiction::Yukon,
    ];

    /// Two-letter postal code.
    pub fn code(&self) -> &'static str {
        match self {
            Jurisdiction::Alberta => "AB",
            Jurisdiction::BritishColumbia => "BC",
            Jurisdiction::Manitoba => "MB",
            Jurisdiction::NewBrunswick => "NB",
            Jurisdiction::NewfoundlandAndLabrador => "NL",
            Jurisdiction::NovaScotia => "NS",
            Jurisdiction::Ontario => "ON",
            Jurisdiction::PrinceEdwardIsland => "PE",
            Jurisdiction::Quebec => "QC",
            Jurisdiction::Saskatchewan => "SK",
            Jurisdiction::NorthwestTerritories => "NT",
            Jurisdiction::Nunavut => "NU",
            Jurisdiction::Yukon => "YT",
        }
    }

    /// Lenient parse: trims and upper-cases, `None` for anything off the
    /// whitelist.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Marker error for codes outside the whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownJurisdiction;

impl FromStr for Jurisdiction {
    type Err = UnknownJurisdiction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Jurisdiction::ALL
            .into_iter()
            .find(|j| j.code() == code)
            .ok_or(UnknownJurisdiction)
    }
}

/// Label for an optional jurisdiction, `"none"` when unresolved.
pub fn label(jurisdiction: Option<Jurisdiction>) -> &'static str {
    jurisdiction.map(|j| j.code()).unwrap_or("none")
}

// =============================================================================
// Inbound Signal
// =============================================================================

/// Raw jurisdiction inputs carried by one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JurisdictionSignal {
    /// `?province=` value, if the parameter is present at all.
    pub query: Option<String>,
    /// `province` cookie value.
    pub cookie: Option<String>,
    /// Shipping state picked during checkout order review.
    pub checkout_override: Option<String>,
}

impl JurisdictionSignal {
    pub fn from_query(value: impl Into<String>) -> Self {
        JurisdictionSignal {
            query: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_cookie(mut self, value: impl Into<String>) -> Self {
        self.cookie = Some(value.into());
        self
    }

    pub fn with_checkout_override(mut self, value: impl Into<String>) -> Self {
        self.checkout_override = Some(value.into());
        self
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Where the resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    CheckoutOverride,
    Query,
    Cookie,
    Absent,
}

/// What the host should do with the `province` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieDirective {
    /// Mirror the resolved code for ~60 days.
    Set(Jurisdiction),
    /// Expire the cookie.
    Clear,
}

/// Outcome of resolving one request's signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    jurisdiction: Option<Jurisdiction>,
    source: ResolutionSource,
    cookie: Option<CookieDirective>,
    changed: bool,
}

impl Resolution {
    /// A request with no jurisdiction at all.
    pub fn none() -> Self {
        Resolution {
            jurisdiction: None,
            source: ResolutionSource::Absent,
            cookie: None,
            changed: false,
        }
    }

    /// Resolves a signal. Never fails: anything unrecognized becomes none.
    pub fn resolve(signal: &JurisdictionSignal) -> Self {
        if let Some(j) = signal.checkout_override.as_deref().and_then(Jurisdiction::parse) {
            debug!(jurisdiction = %j, "Using checkout-selected province");
            return Resolution {
                jurisdiction: Some(j),
                source: ResolutionSource::CheckoutOverride,
                cookie: None,
                changed: false,
            };
        }

        let cookie_code = signal
            .cookie
            .as_deref()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty());

        if let Some(raw) = signal.query.as_deref() {
            let code = raw.trim().to_ascii_uppercase();
            let changed = cookie_code.as_deref() != Some(code.as_str());

            if code == NO_PROVINCE_SENTINEL {
                return Resolution {
                    jurisdiction: None,
                    source: ResolutionSource::Query,
                    cookie: Some(CookieDirective::Clear),
                    changed,
                };
            }

            return match Jurisdiction::parse(&code) {
                Some(j) => Resolution {
                    jurisdiction: Some(j),
                    source: ResolutionSource::Query,
                    cookie: Some(CookieDirective::Set(j)),
                    changed,
                },
                None => {
                    debug!(value = %raw, "Ignoring unrecognized province parameter");
                    Resolution {
                        jurisdiction: None,
                        source: ResolutionSource::Query,
                        cookie: None,
                        changed: false,
                    }
                }
            };
        }

        match cookie_code {
            Some(code) => match Jurisdiction::parse(&code) {
                Some(j) => Resolution {
                    jurisdiction: Some(j),
                    source: ResolutionSource::Cookie,
                    cookie: None,
                    changed: false,
                },
                None => {
                    debug!(value = %code, "Clearing unrecognized province cookie");
                    Resolution {
                        jurisdiction: None,
                        source: ResolutionSource::Cookie,
                        cookie: Some(CookieDirective::Clear),
                        changed: false,
                    }
                }
            },
            None => Resolution::none(),
        }
    }

    pub fn jurisdiction(&self) -> Option<Jurisdiction> {
        self.jurisdiction
    }

    pub fn source(&self) -> ResolutionSource {
        self.source
    }

    /// Cookie write the host must perform, if any.
    pub fn cookie(&self) -> Option<CookieDirective> {
        self.cookie
    }

    /// True when the query parameter switched away from the cookie value.
    ///
    /// Hosts use this to force a cart recomputation on province change.
    pub fn changed(&self) -> bool {
        self.changed
    }
}

// =============================================================================
// Cookie Policy
// =============================================================================

/// Attributes for the mirrored `province` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub name: &'static str,
    pub domain: String,
    pub path: &'static str,
    pub max_age: Duration,
    pub secure: bool,
    pub http_only: bool,
}

impl CookiePolicy {
    /// Builds the policy for a site host.
    ///
    /// The domain covers both the bare and `www.` host: `www.shop.ca` and
    /// `shop.ca` both yield `.shop.ca`. An explicitly configured domain wins.
    pub fn for_site(site_host: &str, configured_domain: Option<&str>, secure: bool) -> Self {
        let domain = match configured_domain.map(str::trim).filter(|d| !d.is_empty()) {
            Some(domain) => domain.to_string(),
            None => {
                let host = site_host.trim().to_ascii_lowercase();
                let bare = host.strip_prefix("www.").unwrap_or(&host);
                format!(".{}", bare)
            }
        };

        CookiePolicy {
            name: PROVINCE_PARAM,
            domain,
            path: "/",
            max_age: Duration::days(COOKIE_LIFETIME_DAYS),
            secure,
            http_only: true,
        }
    }

    /// SameSite attribute value. Always `Lax`.
    pub fn same_site(&self) -> &'static str {
        "Lax"
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
