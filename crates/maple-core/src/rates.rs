//! # Rate Store
//!
//! Typed, request-memoized reads of rates, modes and surcharge gating.
//!
//! ## Defaults
//! ```text
//! missing / unparseable rate        → 0     (0 means "no adjustment")
//! missing / unknown mode            → Percentage
//! missing surcharge amount          → 0
//! unknown code in surcharge list    → ignored
//! no jurisdiction resolved          → rate 0
//! ```
//!
//! Each value is read from the settings source at most once per request.

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;

use crate::jurisdiction::Jurisdiction;
use crate::parse::parse_decimal_or_zero;
use crate::settings::{SettingKey, SettingsSource};
use crate::types::{CalculationMode, RateKind, SizeLabel};

/// Request-scoped accessor over a [`SettingsSource`].
pub struct RateStore<'a> {
    settings: &'a dyn SettingsSource,
    rates: RefCell<HashMap<Jurisdiction, Decimal>>,
    modes: RefCell<HashMap<RateKind, CalculationMode>>,
    surcharges: RefCell<HashMap<SizeLabel, Decimal>>,
    surcharge_jurisdictions: OnceCell<BTreeSet<Jurisdiction>>,
}

impl<'a> RateStore<'a> {
    pub fn new(settings: &'a dyn SettingsSource) -> Self {
        RateStore {
            settings,
            rates: RefCell::new(HashMap::new()),
            modes: RefCell::new(HashMap::new()),
            surcharges: RefCell::new(HashMap::new()),
            surcharge_jurisdictions: OnceCell::new(),
        }
    }

    /// Tax rate for a jurisdiction, as a percentage or fixed amount.
    pub fn rate(&self, jurisdiction: Option<Jurisdiction>) -> Decimal {
        let Some(j) = jurisdiction else {
            return Decimal::ZERO;
        };
        *self.rates.borrow_mut().entry(j).or_insert_with(|| {
            self.text(&SettingKey::TaxRate(j))
                .map(|raw| parse_decimal_or_zero(&raw))
                .unwrap_or(Decimal::ZERO)
        })
    }

    /// Calculation mode for general tax or size surcharges.
    pub fn mode(&self, kind: RateKind) -> CalculationMode {
        *self.modes.borrow_mut().entry(kind).or_insert_with(|| {
            let key = match kind {
                RateKind::General => SettingKey::GeneralMode,
                RateKind::Size => SettingKey::SizeMode,
            };
            self.text(&key)
                .and_then(|raw| CalculationMode::from_setting(&raw))
                .unwrap_or_default()
        })
    }

    /// Configured surcharge amount for a size.
    pub fn size_surcharge(&self, size: SizeLabel) -> Decimal {
        *self.surcharges.borrow_mut().entry(size).or_insert_with(|| {
            self.text(&SettingKey::SizeSurcharge(size))
                .map(|raw| parse_decimal_or_zero(&raw))
                .unwrap_or(Decimal::ZERO)
        })
    }

    /// True when size surcharges apply in this jurisdiction.
    pub fn surcharge_allowed(&self, jurisdiction: Jurisdiction) -> bool {
        self.surcharge_jurisdictions
            .get_or_init(|| {
                self.settings
                    .get(&SettingKey::SurchargeJurisdictions)
                    .map(|raw| {
                        raw.as_list()
                            .iter()
                            .filter_map(|code| Jurisdiction::parse(code))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .contains(&jurisdiction)
    }

    fn text(&self, key: &SettingKey) -> Option<String> {
        self.settings.get(key).map(|raw| raw.as_text().to_string())
    }
}
