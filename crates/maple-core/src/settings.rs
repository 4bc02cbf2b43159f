//! # Pricing Settings
//!
//! The configuration surface an external settings screen writes and this
//! crate only reads.
//!
//! ## Option Names
//! ```text
//! ┌──────────────────────────────────────┬──────────────────────────────────┐
//! │ SettingKey                           │ Stored option name               │
//! ├──────────────────────────────────────┼──────────────────────────────────┤
//! │ TaxRate(ON)                          │ tax_rate_ON                      │
//! │ GeneralMode                          │ tax_calculation_mode             │
//! │ SizeMode                             │ size_calculation_mode            │
//! │ SizeSurcharge(60ml)                  │ size_surcharge_60ml              │
//! │ TaxableRootCategories                │ taxable_categories        (list) │
//! │ SurchargeJurisdictions               │ surcharge_provinces       (list) │
//! │ HiddenProducts(QC)                   │ hidden_products_QC        (list) │
//! │ HiddenCategories(QC)                 │ hidden_categories_QC      (list) │
//! └──────────────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Values are handed over raw. Parsing (and falling back to defaults) is done
//! by [`crate::rates`] and [`crate::visibility`], never by the source.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::jurisdiction::Jurisdiction;
use crate::types::SizeLabel;

// =============================================================================
// Setting Key
// =============================================================================

/// Typed name of one configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    TaxRate(Jurisdiction),
    GeneralMode,
    SizeMode,
    SizeSurcharge(SizeLabel),
    TaxableRootCategories,
    SurchargeJurisdictions,
    HiddenProducts(Jurisdiction),
    HiddenCategories(Jurisdiction),
}

impl SettingKey {
    /// Name under which the value is persisted.
    pub fn option_name(&self) -> String {
        match self {
            SettingKey::TaxRate(j) => format!("tax_rate_{}", j.code()),
            SettingKey::GeneralMode => "tax_calculation_mode".to_string(),
            SettingKey::SizeMode => "size_calculation_mode".to_string(),
            SettingKey::SizeSurcharge(size) => format!("size_surcharge_{}", size.as_str()),
            SettingKey::TaxableRootCategories => "taxable_categories".to_string(),
            SettingKey::SurchargeJurisdictions => "surcharge_provinces".to_string(),
            SettingKey::HiddenProducts(j) => format!("hidden_products_{}", j.code()),
            SettingKey::HiddenCategories(j) => format!("hidden_categories_{}", j.code()),
        }
    }

    /// True for keys whose value is a list of ids or codes.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            SettingKey::TaxableRootCategories
                | SettingKey::SurchargeJurisdictions
                | SettingKey::HiddenProducts(_)
                | SettingKey::HiddenCategories(_)
        )
    }

    /// Every key the pricing engine reads.
    pub fn all() -> Vec<SettingKey> {
        let mut keys = vec![
            SettingKey::GeneralMode,
            SettingKey::SizeMode,
            SettingKey::TaxableRootCategories,
            SettingKey::SurchargeJurisdictions,
        ];
        keys.extend(SizeLabel::ALL.into_iter().map(SettingKey::SizeSurcharge));
        for j in Jurisdiction::ALL {
            keys.push(SettingKey::TaxRate(j));
            keys.push(SettingKey::HiddenProducts(j));
            keys.push(SettingKey::HiddenCategories(j));
        }
        keys
    }

    /// Reverse of [`SettingKey::option_name`].
    pub fn from_option_name(name: &str) -> Option<SettingKey> {
        SettingKey::all().into_iter().find(|k| k.option_name() == name)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.option_name())
    }
}

// =============================================================================
// Raw Setting
// =============================================================================

/// A stored value, untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSetting {
    Text(String),
    List(Vec<String>),
}

impl RawSetting {
    /// Value as a single string. Lists yield their first entry.
    pub fn as_text(&self) -> &str {
        match self {
            RawSetting::Text(text) => text,
            RawSetting::List(items) => items.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Value as a list. Text is split on commas; blank entries are dropped.
    pub fn as_list(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            RawSetting::Text(text) => text.split(',').collect(),
            RawSetting::List(items) => items.iter().map(String::as_str).collect(),
        };
        items
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Value as numeric ids. Entries that are not ids are skipped.
    pub fn as_ids(&self) -> Vec<u64> {
        self.as_list()
            .iter()
            .filter_map(|entry| entry.parse().ok())
            .collect()
    }
}

impl From<&str> for RawSetting {
    fn from(value: &str) -> Self {
        RawSetting::Text(value.to_string())
    }
}

// =============================================================================
// Settings Source
// =============================================================================

/// Read-only access to the configuration surface.
pub trait SettingsSource: Send + Sync {
    fn get(&self, key: &SettingKey) -> Option<RawSetting>;
}

/// In-memory settings, used by snapshots and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsMap {
    values: HashMap<SettingKey, RawSetting>,
}

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SettingKey, value: RawSetting) {
        self.values.insert(key, value);
    }

    /// Builder-style text value.
    pub fn with(mut self, key: SettingKey, value: impl Into<String>) -> Self {
        self.insert(key, RawSetting::Text(value.into()));
        self
    }

    /// Builder-style list value.
    pub fn with_list<I, S>(mut self, key: SettingKey, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let list = values.into_iter().map(|v| v.to_string()).collect();
        self.insert(key, RawSetting::List(list));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SettingKey, &RawSetting)> {
        self.values.iter()
    }
}

impl SettingsSource for SettingsMap {
    fn get(&self, key: &SettingKey) -> Option<RawSetting> {
        self.values.get(key).cloned()
    }
}
