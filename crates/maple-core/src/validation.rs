//! # Settings Audit
//!
//! Pricing never rejects configuration: a bad rate is 0, a bad mode is
//! Percentage. This module reports what was ignored so operators can fix it.
//!
//! ## Usage
//! ```rust
//! use maple_core::settings::{SettingKey, SettingsMap};
//! use maple_core::jurisdiction::Jurisdiction;
//! use maple_core::validation::audit_settings;
//!
//! let settings = SettingsMap::new().with(SettingKey::TaxRate(Jurisdiction::Ontario), "13%");
//! let problems = audit_settings(&settings);
//! assert_eq!(problems.len(), 1);
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::jurisdiction::Jurisdiction;
use crate::parse::parse_decimal_lenient;
use crate::settings::{RawSetting, SettingKey, SettingsSource};
use crate::types::CalculationMode;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Checks every pricing setting and returns the problems found.
pub fn audit_settings(settings: &dyn SettingsSource) -> Vec<ValidationError> {
    SettingKey::all()
        .into_iter()
        .filter_map(|key| settings.get(&key).map(|raw| (key, raw)))
        .flat_map(|(key, raw)| validate_setting(&key, &raw).err().unwrap_or_default())
        .collect()
}

/// Validates one stored value.
pub fn validate_setting(key: &SettingKey, raw: &RawSetting) -> Result<(), Vec<ValidationError>> {
    let field = key.option_name();
    let mut errors = Vec::new();

    match key {
        SettingKey::TaxRate(_) | SettingKey::SizeSurcharge(_) => {
            if let Err(e) = validate_amount(&field, raw.as_text()) {
                errors.push(e);
            }
        }
        SettingKey::GeneralMode | SettingKey::SizeMode => {
            if CalculationMode::from_setting(raw.as_text()).is_none() {
                errors.push(ValidationError::NotAllowed {
                    field,
                    allowed: vec![
                        CalculationMode::Percentage.to_string(),
                        CalculationMode::Fixed.to_string(),
                    ],
                });
            }
        }
        SettingKey::SurchargeJurisdictions => {
            if raw.as_list().iter().any(|code| Jurisdiction::parse(code).is_none()) {
                errors.push(ValidationError::NotAllowed {
                    field,
                    allowed: Jurisdiction::ALL.iter().map(|j| j.code().to_string()).collect(),
                });
            }
        }
        SettingKey::TaxableRootCategories
        | SettingKey::HiddenProducts(_)
        | SettingKey::HiddenCategories(_) => {
            for entry in raw.as_list() {
                if entry.parse::<u64>().is_err() {
                    errors.push(ValidationError::InvalidId {
                        field: field.clone(),
                        value: entry,
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A rate or surcharge: empty is allowed (means 0), otherwise a
/// non-negative number.
pub fn validate_amount(field: &str, value: &str) -> ValidationResult<Decimal> {
    if value.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }

    let amount = parse_decimal_lenient(value).ok_or_else(|| ValidationError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
    })?;

    if amount < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsMap;
    use crate::types::SizeLabel;

    #[test]
    fn test_clean_settings_pass() {
        let settings = SettingsMap::new()
            .with(SettingKey::TaxRate(Jurisdiction::Quebec), "14,975")
            .with(SettingKey::GeneralMode, "fixed")
            .with_list(SettingKey::SurchargeJurisdictions, ["ON", "BC"])
            .with_list(SettingKey::TaxableRootCategories, [3, 4]);
        assert!(audit_settings(&settings).is_empty());
    }

    #[test]
    fn test_reports_every_problem() {
        let settings = SettingsMap::new()
            .with(SettingKey::TaxRate(Jurisdiction::Ontario), "thirteen")
            .with(SettingKey::SizeSurcharge(SizeLabel::Ml60), "-2")
            .with(SettingKey::SizeMode, "flat")
            .with_list(SettingKey::HiddenProducts(Jurisdiction::Quebec), ["12", "abc"]);

        let problems = audit_settings(&settings);
        assert_eq!(problems.len(), 4);
        assert!(problems.contains(&ValidationError::InvalidId {
            field: "hidden_products_QC".to_string(),
            value: "abc".to_string(),
        }));
    }

    #[test]
    fn test_empty_amount_is_zero() {
        assert_eq!(validate_amount("tax_rate_ON", " "), Ok(Decimal::ZERO));
    }
}
