//! # Application State
//!
//! Shared across all requests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AppState (Arc)                                                         │
//! │  ├── snapshot: RwLock<Arc<CatalogSnapshot>>   swapped by the refresher │
//! │  ├── cache:    Arc<MemoryCache>               shared TTL cache         │
//! │  ├── clock:    Arc<dyn Clock>                                           │
//! │  ├── carts:    CartStore                      one cart per session     │
//! │  ├── cart_idle                                idle carts are swept     │
//! │  ├── options:  EngineOptions                                            │
//! │  └── cookie_policy                                                      │
//! │                                                                         │
//! │  Per request: engine() pins the current snapshot, then the handler     │
//! │  opens exactly one RequestContext from it.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use maple_core::cache::{Clock, MemoryCache};
use maple_core::catalog::Catalog;
use maple_core::context::{EngineOptions, PricingEngine};
use maple_core::jurisdiction::CookiePolicy;
use maple_core::settings::SettingsSource;
use maple_core::validation::audit_settings;
use maple_core::Cart;
use maple_db::{CatalogSnapshot, Database};

/// How long an untouched cart survives by default.
pub const DEFAULT_CART_IDLE_HOURS: i64 = 48;

/// Shared application state.
pub struct AppState {
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    cache: Arc<MemoryCache>,
    clock: Arc<dyn Clock>,
    pub carts: CartStore,
    cart_idle: chrono::Duration,
    pub options: EngineOptions,
    pub cookie_policy: CookiePolicy,
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(
        snapshot: CatalogSnapshot,
        clock: Arc<dyn Clock>,
        options: EngineOptions,
        cookie_policy: CookiePolicy,
    ) -> Self {
        AppState {
            snapshot: RwLock::new(Arc::new(snapshot)),
            cache: Arc::new(MemoryCache::new(clock.clone())),
            carts: CartStore::new(clock.clone()),
            clock,
            cart_idle: chrono::Duration::hours(DEFAULT_CART_IDLE_HOURS),
            options,
            cookie_policy,
            db: None,
        }
    }

    /// Attaches the database the refresher reloads from.
    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    /// How long a cart may go untouched before the refresher drops it.
    pub fn with_cart_idle(mut self, idle: chrono::Duration) -> Self {
        self.cart_idle = idle;
        self
    }

    /// Drops carts idle for longer than the configured window.
    pub fn expire_idle_carts(&self) -> usize {
        let expired = self.carts.sweep(self.cart_idle);
        if expired > 0 {
            info!(expired, remaining = self.carts.session_count(), "Expired idle carts");
        }
        expired
    }

    /// The snapshot current at this instant.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace_snapshot(&self, snapshot: CatalogSnapshot) {
        let mut current = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::new(snapshot);
    }

    /// An engine over the current snapshot. The snapshot stays pinned for as
    /// long as the engine lives, even if the refresher swaps in a new one.
    pub fn engine(&self) -> PricingEngine {
        let snapshot = self.snapshot();
        let catalog: Arc<dyn Catalog> = snapshot.clone();
        let settings: Arc<dyn SettingsSource> = snapshot;
        PricingEngine::new(catalog, settings, self.cache.clone(), self.clock.clone())
            .with_options(self.options)
    }

    /// Reloads the snapshot from the database.
    pub async fn refresh(&self) -> Result<(), maple_db::DbError> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        let snapshot = db.snapshot().await?;
        report_setting_problems(&snapshot);
        self.replace_snapshot(snapshot);
        self.cache.purge_expired();
        Ok(())
    }
}

/// Logs every pricing setting the engine will ignore.
pub fn report_setting_problems(snapshot: &CatalogSnapshot) -> usize {
    let problems = audit_settings(snapshot.settings());
    for problem in &problems {
        warn!(%problem, "Ignoring invalid pricing setting");
    }
    problems.len()
}

/// Reloads the snapshot and sweeps idle carts on a fixed interval. A failed
/// reload keeps the previous snapshot.
pub fn spawn_refresher(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.refresh().await {
                Ok(()) => debug!("Catalog snapshot refreshed"),
                Err(e) => warn!(error = %e, "Snapshot refresh failed, keeping previous"),
            }
            state.expire_idle_carts();
        }
    })
}

// =============================================================================
// Cart Store
// =============================================================================

/// Carts by session id.
///
/// The lock is held only for synchronous work; handlers never await while
/// holding a cart. Every access stamps the cart so idle ones can be swept.
pub struct CartStore {
    carts: Mutex<HashMap<String, StoredCart>>,
    clock: Arc<dyn Clock>,
}

struct StoredCart {
    cart: Cart,
    touched_at: DateTime<Utc>,
}

impl CartStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        CartStore {
            carts: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Executes a function with the session's cart, creating it if needed.
    ///
    /// Only paths that put something in the cart should call this; read
    /// paths use [`CartStore::with_existing`].
    pub fn with_cart<F, R>(&self, session: &str, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let now = self.clock.now();
        let mut carts = self.carts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let stored = carts.entry(session.to_string()).or_insert_with(|| {
            info!(session = %session, "Starting new cart");
            StoredCart {
                cart: Cart::new(now),
                touched_at: now,
            }
        });
        stored.touched_at = now;
        f(&mut stored.cart)
    }

    /// Executes a function with the session's cart only if one exists.
    pub fn with_existing<F, R>(&self, session: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let now = self.clock.now();
        let mut carts = self.carts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        carts.get_mut(session).map(|stored| {
            stored.touched_at = now;
            f(&mut stored.cart)
        })
    }

    /// Removes carts not touched within `idle`. Returns how many went.
    pub fn sweep(&self, idle: chrono::Duration) -> usize {
        let cutoff = self.clock.now() - idle;
        let mut carts = self.carts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = carts.len();
        carts.retain(|_, stored| stored.touched_at > cutoff);
        let removed = before - carts.len();
        if removed > 0 {
            debug!(removed, "Swept idle carts");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.carts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
