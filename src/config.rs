use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorCode, FlagCacheError, Result};
use crate::types::FlagKind;

/// Default interval between dynamic refresh cycles.
pub const DEFAULT_REFRESH_RATE: Duration = Duration::from_millis(30_000);

/// Reserved dynamic flag id that, when self-reconfiguration is enabled,
/// controls the refresh interval (in milliseconds) of the scheduler
/// reading it.
pub const REFRESH_RATE_FLAG_ID: &str = "DynamicFFlagRefreshRate";

/// Hook producing extra equality predicates for a load/refresh query.
///
/// Called once per cycle with the kind being fetched. `None` means the
/// default query (kind tag only); `Some(map)` merges the given key/value
/// predicates into the query alongside the kind tag. The result is never
/// cached, so a hook may scope each cycle differently.
pub type FilterHook =
    Arc<dyn Fn(FlagKind) -> Option<HashMap<String, serde_json::Value>> + Send + Sync>;

/// Configuration for a [`FlagCacheClient`](crate::FlagCacheClient).
#[derive(Clone)]
pub struct FlagCacheOptions {
    /// Interval between dynamic refresh cycles. Default: 30 seconds.
    pub refresh_rate: Duration,

    /// When true, changes to the reserved [`REFRESH_RATE_FLAG_ID`] flag
    /// retime the scheduler at runtime. Default: false.
    pub self_reconfigure: bool,

    /// Optional query-scoping hook. Default: no extra predicates.
    pub filter_hook: Option<FilterHook>,
}

impl Default for FlagCacheOptions {
    fn default() -> Self {
        Self {
            refresh_rate: DEFAULT_REFRESH_RATE,
            self_reconfigure: false,
            filter_hook: None,
        }
    }
}

impl std::fmt::Debug for FlagCacheOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagCacheOptions")
            .field("refresh_rate", &self.refresh_rate)
            .field("self_reconfigure", &self.self_reconfigure)
            .field("filter_hook", &self.filter_hook.as_ref().map(|_| "..."))
            .finish()
    }
}

impl FlagCacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FlagCacheOptionsBuilder {
        FlagCacheOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_rate.is_zero() {
            return Err(FlagCacheError::config_error(
                ErrorCode::ConfigInvalidRefreshRate,
                "Refresh rate must be positive",
            ));
        }
        Ok(())
    }
}

/// Builder for [`FlagCacheOptions`].
#[derive(Default)]
pub struct FlagCacheOptionsBuilder {
    refresh_rate: Option<Duration>,
    self_reconfigure: Option<bool>,
    filter_hook: Option<FilterHook>,
}

impl FlagCacheOptionsBuilder {
    /// Set the refresh interval.
    pub fn refresh_rate(mut self, rate: Duration) -> Self {
        self.refresh_rate = Some(rate);
        self
    }

    /// Set the refresh interval in milliseconds.
    pub fn refresh_rate_ms(mut self, ms: u64) -> Self {
        self.refresh_rate = Some(Duration::from_millis(ms));
        self
    }

    /// Enable or disable runtime retiming via the reserved rate flag.
    pub fn self_reconfigure(mut self, enabled: bool) -> Self {
        self.self_reconfigure = Some(enabled);
        self
    }

    /// Install a query-scoping hook.
    pub fn filter_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(FlagKind) -> Option<HashMap<String, serde_json::Value>> + Send + Sync + 'static,
    {
        self.filter_hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> FlagCacheOptions {
        FlagCacheOptions {
            refresh_rate: self.refresh_rate.unwrap_or(DEFAULT_REFRESH_RATE),
            self_reconfigure: self.self_reconfigure.unwrap_or(false),
            filter_hook: self.filter_hook,
        }
    }
}
