//! Sliding-window rate limiter for market data providers.
//!
//! Every provider owns a [`RateWindow`]: the timestamps of the requests it
//! admitted during the trailing window. Admission evicts expired stamps,
//! waits for the oldest one to age out when the window is full, then records
//! the new request. The evict/check/append sequence runs under a per-provider
//! async mutex, so two providers never contend and callers of one provider
//! are admitted in arrival order (tokio's mutex is fair).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

/// Default ceiling: 30 requests per 60 seconds.
pub const DEFAULT_MAX_REQUESTS: u32 = 30;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Rate limit configuration for a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests admitted inside any trailing `window`.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl RateLimitConfig {
    /// Create a config. Zero values are clamped so the window always admits
    /// at least one request per millisecond-long window.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window: window.max(Duration::from_millis(1)),
        }
    }

    /// `n` requests per rolling minute.
    pub fn per_minute(n: u32) -> Self {
        Self::new(n, Duration::from_secs(60))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Request timestamps for one provider, oldest first.
#[derive(Debug)]
struct RateWindow {
    stamps: VecDeque<Instant>,
    config: RateLimitConfig,
}

impl RateWindow {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            stamps: VecDeque::with_capacity(config.max_requests as usize),
            config,
        }
    }

    /// Drop stamps that are a full window old or older.
    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) >= self.config.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until a slot frees up; zero when one is free now.
    fn wait_time(&mut self, now: Instant) -> Duration {
        self.evict(now);
        if self.stamps.len() < self.config.max_requests as usize {
            return Duration::ZERO;
        }
        match self.stamps.front() {
            Some(&oldest) => (oldest + self.config.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    fn record(&mut self, now: Instant) {
        self.stamps.push_back(now);
    }
}

/// Per-provider sliding-window rate limiter.
///
/// Windows are created on demand from the provider's configured limits,
/// or from the limiter-wide default.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Arc<AsyncMutex<RateWindow>>>>,
    configs: Mutex<HashMap<String, RateLimitConfig>>,
    default_config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter using [`RateLimitConfig::default`] for every provider.
    pub fn new() -> Self {
        Self::with_default(RateLimitConfig::default())
    }

    /// Create a limiter with a custom default applied to unconfigured providers.
    pub fn with_default(default_config: RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            configs: Mutex::new(HashMap::new()),
            default_config,
        }
    }

    /// Lock the windows map, recovering from poison if necessary.
    ///
    /// The map only holds handles; a panic while holding it cannot leave a
    /// window half-updated.
    fn lock_windows(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<RateWindow>>>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter windows mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_configs(&self) -> MutexGuard<'_, HashMap<String, RateLimitConfig>> {
        self.configs.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter configs mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Install limits for a provider.
    ///
    /// An existing window keeps its recorded requests and switches to the new
    /// limits after the callers already queued on it have been admitted.
    pub async fn configure(&self, provider: &str, config: RateLimitConfig) {
        // config first: a window created after this point already uses it,
        // one created before is found below
        self.lock_configs().insert(provider.to_string(), config);
        let existing = self.lock_windows().get(provider).cloned();

        if let Some(window) = existing {
            window.lock().await.config = config;
            debug!("Rate limiter: reconfigured '{}' to {:?}", provider, config);
        }
    }

    /// Limits in effect for a provider.
    pub fn config_for(&self, provider: &str) -> RateLimitConfig {
        self.lock_configs()
            .get(provider)
            .copied()
            .unwrap_or(self.default_config)
    }

    fn window(&self, provider: &str) -> Arc<AsyncMutex<RateWindow>> {
        // config is read under the windows lock so `configure` cannot miss a new window
        let mut windows = self.lock_windows();
        Arc::clone(
            windows
                .entry(provider.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(RateWindow::new(self.config_for(provider))))),
        )
    }

    /// Wait until the provider has a free slot, then take it.
    ///
    /// Never fails. The window lock is held while sleeping so that later
    /// callers queue behind earlier ones instead of racing for the slot.
    pub async fn admit(&self, provider: &str) {
        let window = self.window(provider);
        let mut window = window.lock().await;

        loop {
            let now = Instant::now();
            let wait = window.wait_time(now);
            if wait.is_zero() {
                window.record(now);
                debug!("Rate limiter: admitted request for '{}'", provider);
                return;
            }

            debug!(
                "Rate limiter: window full for '{}', waiting {:?}",
                provider, wait
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a slot only if one is free right now.
    ///
    /// Returns false when the window is full or another caller is queued.
    pub fn try_admit(&self, provider: &str) -> bool {
        let window = self.window(provider);
        let Ok(mut window) = window.try_lock() else {
            return false;
        };

        let now = Instant::now();
        if window.wait_time(now).is_zero() {
            window.record(now);
            true
        } else {
            false
        }
    }

    /// Number of requests admitted inside the current window.
    pub async fn recent_requests(&self, provider: &str) -> usize {
        let window = self.window(provider);
        let mut window = window.lock().await;
        window.evict(Instant::now());
        window.stamps.len()
    }

    /// Forget all recorded requests for a provider.
    ///
    /// Callers queued ahead of the reset are admitted against the old
    /// stamps first; everyone after sees an empty window.
    pub async fn reset(&self, provider: &str) {
        let existing = self.lock_windows().get(provider).cloned();
        if let Some(window) = existing {
            window.lock().await.stamps.clear();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_config_clamps_zero_values() {
        let config = RateLimitConfig::new(0, Duration::ZERO);
        assert_eq!(config.max_requests, 1);
        assert!(config.window > Duration::ZERO);
        assert_eq!(RateLimitConfig::default(), RateLimitConfig::per_minute(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_admit_respects_capacity() {
        let limiter = RateLimiter::with_default(RateLimitConfig::new(3, Duration::from_secs(60)));

        for _ in 0..3 {
            assert!(limiter.try_admit("FMP"));
        }
        assert!(!limiter.try_admit("FMP"));
        assert_eq!(limiter.recent_requests("FMP").await, 3);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.try_admit("FMP"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_provider_isolation() {
        let limiter = RateLimiter::with_default(RateLimitConfig::new(1, Duration::from_secs(60)));

        limiter.admit("FMP").await;
        assert!(!limiter.try_admit("FMP"));
        assert!(limiter.try_admit("FINNHUB"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_overrides_default() {
        let limiter = RateLimiter::new();
        limiter
            .configure("FINNHUB", RateLimitConfig::new(2, Duration::from_secs(1)))
            .await;

        assert!(limiter.try_admit("FINNHUB"));
        assert!(limiter.try_admit("FINNHUB"));
        assert!(!limiter.try_admit("FINNHUB"));
        assert_eq!(limiter.config_for("FMP"), RateLimitConfig::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_window() {
        let limiter = RateLimiter::with_default(RateLimitConfig::new(1, Duration::from_secs(60)));

        assert!(limiter.try_admit("FMP"));
        assert!(!limiter.try_admit("FMP"));

        limiter.reset("FMP").await;
        assert!(limiter.try_admit("FMP"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_keeps_queued_callers_in_one_window() {
        let window = Duration::from_secs(10);
        let limiter = Arc::new(RateLimiter::with_default(RateLimitConfig::new(1, window)));
        let start = Instant::now();

        limiter.admit("FMP").await;

        let queued = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter.admit("FMP").await;
                Instant::now()
            })
        };
        tokio::task::yield_now().await;

        let reconfigure = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.configure("FMP", RateLimitConfig::new(1, window)).await })
        };
        tokio::task::yield_now().await;

        limiter.admit("FMP").await;
        let last = start.elapsed();

        let queued_at = queued.await.unwrap().duration_since(start);
        reconfigure.await.unwrap();

        assert!(queued_at >= window);
        assert!(last >= window * 2);
        assert_eq!(limiter.recent_requests("FMP").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_updates_existing_window_limits() {
        let limiter = RateLimiter::with_default(RateLimitConfig::new(1, Duration::from_secs(60)));

        assert!(limiter.try_admit("FMP"));
        assert!(!limiter.try_admit("FMP"));

        limiter
            .configure("FMP", RateLimitConfig::new(2, Duration::from_secs(60)))
            .await;

        assert!(limiter.try_admit("FMP"));
        assert!(!limiter.try_admit("FMP"));
        assert_eq!(limiter.recent_requests("FMP").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_waits_for_oldest_stamp_to_expire() {
        let limiter = RateLimiter::with_default(RateLimitConfig::new(2, Duration::from_secs(60)));
        let start = Instant::now();

        limiter.admit("FMP").await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.admit("FMP").await;

        limiter.admit("FMP").await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_are_admitted_in_arrival_order() {
        let limiter = Arc::new(RateLimiter::with_default(RateLimitConfig::new(
            1,
            Duration::from_secs(10),
        )));
        let order = Arc::new(Mutex::new(Vec::new()));

        limiter.admit("FMP").await;

        let mut handles = Vec::new();
        for id in 0..3 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                limiter.admit("FMP").await;
                order.lock().unwrap().push(id);
            }));
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    /// Admission times for a set of callers arriving at the given offsets.
    fn simulate(config: RateLimitConfig, offsets_ms: Vec<u64>) -> Vec<Instant> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        runtime.block_on(async move {
            let limiter = Arc::new(RateLimiter::with_default(config));
            let mut handles = Vec::new();
            for offset in offsets_ms {
                let limiter = Arc::clone(&limiter);
                handles.push(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(offset)).await;
                    limiter.admit("PROP").await;
                    Instant::now()
                }));
            }

            let mut admitted = Vec::new();
            for handle in handles {
                admitted.push(handle.await.unwrap());
            }
            admitted.sort();
            admitted
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_never_exceeds_window_capacity(
            max_requests in 1u32..6,
            window_secs in 1u64..30,
            offsets in proptest::collection::vec(0u64..90_000, 1..40),
        ) {
            let config = RateLimitConfig::new(max_requests, Duration::from_secs(window_secs));
            let admitted = simulate(config, offsets.clone());

            prop_assert_eq!(admitted.len(), offsets.len());

            // Any max_requests + 1 consecutive admissions must span a full window.
            let k = max_requests as usize;
            for pair in admitted.windows(k + 1) {
                prop_assert!(pair[k].duration_since(pair[0]) >= config.window);
            }
        }
    }
}
