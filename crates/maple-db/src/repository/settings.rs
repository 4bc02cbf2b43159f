//! # Settings Repository
//!
//! Persisted pricing options, keyed by [`SettingKey::option_name`].
//!
//! Values round-trip as JSON so a list stays a list. Rows whose name is not
//! a known option are ignored when loading, and a row that is not valid
//! JSON is skipped with a warning: pricing falls back to its defaults
//! rather than refusing to start.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use maple_core::settings::{RawSetting, SettingKey, SettingsMap};

/// Repository for the `settings` table.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads one option.
    ///
    /// ## Returns
    /// * `Ok(None)` - never written
    /// * `Err(DbError::InvalidData)` - stored value is not JSON
    pub async fn get(&self, key: &SettingKey) -> DbResult<Option<RawSetting>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE name = ?1")
            .bind(key.option_name())
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Writes one option, replacing any previous value.
    pub async fn set(&self, key: &SettingKey, value: &RawSetting) -> DbResult<()> {
        debug!(option = %key, "Writing setting");

        let json = serde_json::to_string(value)?;

        sqlx::query(
            r#"
            INSERT INTO settings (name, value) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(key.option_name())
        .bind(json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes a text option.
    pub async fn set_text(&self, key: &SettingKey, value: impl Into<String>) -> DbResult<()> {
        self.set(key, &RawSetting::Text(value.into())).await
    }

    /// Writes a list option.
    pub async fn set_list<I, S>(&self, key: &SettingKey, values: I) -> DbResult<()>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let list = values.into_iter().map(|v| v.to_string()).collect();
        self.set(key, &RawSetting::List(list)).await
    }

    /// Removes an option. Removing a missing option is not an error.
    pub async fn delete(&self, key: &SettingKey) -> DbResult<()> {
        sqlx::query("DELETE FROM settings WHERE name = ?1")
            .bind(key.option_name())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Every known option, ready to hand to the pricing engine.
    pub async fn load_map(&self) -> DbResult<SettingsMap> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT name, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        let mut map = SettingsMap::new();
        for (name, json) in rows {
            let Some(key) = SettingKey::from_option_name(&name) else {
                debug!(option = %name, "Ignoring unknown setting");
                continue;
            };
            match serde_json::from_str::<RawSetting>(&json) {
                Ok(value) => map.insert(key, value),
                Err(e) => warn!(option = %name, error = %e, "Skipping unreadable setting"),
            }
        }

        debug!(count = map.len(), "Loaded settings");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use maple_core::jurisdiction::Jurisdiction;
    use maple_core::settings::SettingsSource;

    #[tokio::test]
    async fn test_text_and_list_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        let rate = SettingKey::TaxRate(Jurisdiction::Quebec);
        let hidden = SettingKey::HiddenProducts(Jurisdiction::Quebec);

        repo.set_text(&rate, "14,975").await.unwrap();
        repo.set_list(&hidden, [12, 15]).await.unwrap();

        assert_eq!(repo.get(&rate).await.unwrap(), Some(RawSetting::from("14,975")));
        assert_eq!(
            repo.get(&hidden).await.unwrap(),
            Some(RawSetting::List(vec!["12".to_string(), "15".to_string()]))
        );

        repo.set_text(&rate, "15").await.unwrap();
        assert_eq!(repo.get(&rate).await.unwrap(), Some(RawSetting::from("15")));

        repo.delete(&rate).await.unwrap();
        assert_eq!(repo.get(&rate).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_map_skips_unknown_and_unreadable_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();
        repo.set_text(&SettingKey::GeneralMode, "fixed").await.unwrap();

        sqlx::query("INSERT INTO settings (name, value) VALUES ('legacy_option', '\"x\"')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO settings (name, value) VALUES ('tax_rate_ON', '13')")
            .execute(db.pool())
            .await
            .unwrap();

        let map = repo.load_map().await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get(&SettingKey::GeneralMode),
            Some(RawSetting::from("fixed"))
        );

        let unreadable = repo.get(&SettingKey::TaxRate(Jurisdiction::Ontario)).await;
        assert!(matches!(unreadable, Err(DbError::InvalidData { .. })));
    }
}
