//! Adaptive throttling of provider calls.
//!
//! Every provider request goes through [`ThrottleController::wrap`], which:
//!
//! - keeps at least the minimum delay between the end of one call and the
//!   start of the next,
//! - rotates the presented [`Identity`] after a randomly drawn number of calls,
//! - treats an empty result set or an explicit block signal as a possible
//!   block: the mean delay doubles, the identity is rotated at once and the
//!   on-blocked hook runs,
//! - resets the mean delay to the baseline after any non-empty result.
//!
//! Between entries the batch scheduler sleeps for [`ThrottleController::next_delay`],
//! a normal sample around the current mean, re-drawn until it exceeds the floor.
//!
//! # Example
//!
//! ```
//! use bibdl_core::throttle::{ThrottleConfig, ThrottleController};
//!
//! let throttle = ThrottleController::new(ThrottleConfig::default());
//! let delay = throttle.state().mean_delay();
//! assert_eq!(delay.as_millis(), 500);
//! ```

mod config;
mod hook;

pub use config::{
    DEFAULT_BASELINE_DELAY, DEFAULT_JITTER_RATIO, DEFAULT_MIN_DELAY, DEFAULT_ROTATION_RANGE,
    ThrottleConfig, ThrottleConfigError,
};
pub use hook::{BlockEvent, BlockedHook, CommandHook};

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::search::{Identity, ResultRecord, SearchError};

/// Upper bound on re-draws before falling back to the mean.
const MAX_SAMPLE_ATTEMPTS: usize = 64;

/// Mutable throttle state, owned by the controller.
#[derive(Debug, Clone)]
pub struct ThrottleState {
    mean_delay: Duration,
    calls_issued: u64,
    calls_since_rotation: u32,
    rotation_threshold: u32,
    rotations: u64,
    blocks_detected: u64,
    identity: Identity,
    last_call_finished: Option<Instant>,
}

impl ThrottleState {
    /// Current mean of the inter-entry delay distribution.
    #[must_use]
    pub fn mean_delay(&self) -> Duration {
        self.mean_delay
    }

    /// Provider calls issued so far.
    #[must_use]
    pub fn calls_issued(&self) -> u64 {
        self.calls_issued
    }

    /// Calls issued with the current identity.
    #[must_use]
    pub fn calls_since_rotation(&self) -> u32 {
        self.calls_since_rotation
    }

    /// Calls after which the identity is rotated.
    #[must_use]
    pub fn rotation_threshold(&self) -> u32 {
        self.rotation_threshold
    }

    /// Identity rotations performed, scheduled and forced.
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Possible blocks detected.
    #[must_use]
    pub fn blocks_detected(&self) -> u64 {
        self.blocks_detected
    }

    /// Identity presented on the next call.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// When the most recent provider call completed.
    #[must_use]
    pub fn last_call_finished(&self) -> Option<Instant> {
        self.last_call_finished
    }
}

/// Adaptive delay and identity rotation around provider calls.
pub struct ThrottleController {
    config: ThrottleConfig,
    state: ThrottleState,
    rng: StdRng,
    hook: Option<Box<dyn BlockedHook>>,
}

impl ThrottleController {
    /// Creates a controller seeded from OS entropy.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Creates a controller with a caller-supplied RNG (deterministic in tests).
    #[must_use]
    pub fn with_rng(config: ThrottleConfig, mut rng: StdRng) -> Self {
        let identity = Identity::random(&mut rng);
        let rotation_threshold = rng.gen_range(config.rotation_range());
        let state = ThrottleState {
            mean_delay: config.baseline_delay(),
            calls_issued: 0,
            calls_since_rotation: 0,
            rotation_threshold,
            rotations: 0,
            blocks_detected: 0,
            identity,
            last_call_finished: None,
        };
        Self {
            config,
            state,
            rng,
            hook: None,
        }
    }

    /// Installs the hook run on every detected block.
    #[must_use]
    pub fn with_hook(mut self, hook: impl BlockedHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Read-only view of the current state.
    #[must_use]
    pub fn state(&self) -> &ThrottleState {
        &self.state
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Runs one provider call under throttling.
    ///
    /// `call` receives the identity to present. Empty results and
    /// [`SearchError::Blocked`] escalate the backoff; other errors pass
    /// through without touching the mean.
    ///
    /// # Errors
    ///
    /// Returns whatever error `call` returned.
    #[instrument(skip_all, fields(call = self.state.calls_issued + 1))]
    pub async fn wrap<F, Fut>(&mut self, call: F) -> Result<Vec<ResultRecord>, SearchError>
    where
        F: FnOnce(Identity) -> Fut,
        Fut: Future<Output = Result<Vec<ResultRecord>, SearchError>>,
    {
        self.pace().await;

        if self.state.calls_since_rotation >= self.state.rotation_threshold {
            self.rotate_identity("scheduled");
        }

        self.state.calls_issued += 1;
        self.state.calls_since_rotation += 1;
        let outcome = call(self.state.identity.clone()).await;
        self.state.last_call_finished = Some(Instant::now());

        match &outcome {
            Ok(records) if records.is_empty() => self.record_possible_block("empty result"),
            Ok(records) => {
                debug!(count = records.len(), "provider returned results");
                self.state.mean_delay = self.config.baseline_delay();
            }
            Err(SearchError::Blocked { reason, .. }) => self.record_possible_block(reason),
            Err(error) => debug!(error = %error, "provider call failed"),
        }

        outcome
    }

    /// Samples the delay to wait before the next entry.
    ///
    /// Draws from a normal distribution centred on the current mean with
    /// standard deviation `mean * jitter_ratio` until the sample exceeds the
    /// minimum floor.
    pub fn next_delay(&mut self) -> Duration {
        let mean = self.state.mean_delay.as_secs_f64();
        let floor = self.config.min_delay();
        let std_dev = mean * self.config.jitter_ratio();

        if let Ok(normal) = Normal::new(mean, std_dev) {
            for _ in 0..MAX_SAMPLE_ATTEMPTS {
                let sample = normal.sample(&mut self.rng);
                if let Ok(delay) = Duration::try_from_secs_f64(sample)
                    && delay > floor
                {
                    debug!(delay_ms = delay.as_millis(), "sampled inter-entry delay");
                    return delay;
                }
            }
        }

        self.state.mean_delay.max(floor + Duration::from_millis(1))
    }

    /// Sleeps until at least the minimum delay has passed since the last call.
    async fn pace(&self) {
        let Some(last) = self.state.last_call_finished else {
            return;
        };
        let elapsed = last.elapsed();
        let min = self.config.min_delay();
        if elapsed < min {
            let wait = min - elapsed;
            debug!(wait_ms = wait.as_millis(), "pacing provider call");
            tokio::time::sleep(wait).await;
        }
    }

    fn rotate_identity(&mut self, cause: &str) {
        self.state.identity = Identity::random(&mut self.rng);
        self.state.rotation_threshold = self.rng.gen_range(self.config.rotation_range());
        self.state.calls_since_rotation = 0;
        self.state.rotations += 1;
        debug!(
            cause,
            next_threshold = self.state.rotation_threshold,
            "rotated provider identity"
        );
    }

    fn record_possible_block(&mut self, reason: &str) {
        self.state.mean_delay = self.state.mean_delay.saturating_mul(2);
        self.state.blocks_detected += 1;
        self.rotate_identity("possible block");
        warn!(
            reason,
            mean_delay_ms = self.state.mean_delay.as_millis(),
            blocks = self.state.blocks_detected,
            "possible provider block; backing off"
        );

        if let Some(hook) = &self.hook {
            hook.on_blocked(&BlockEvent {
                reason: reason.to_string(),
                mean_delay: self.state.mean_delay,
                blocks_detected: self.state.blocks_detected,
            });
        }
    }
}

impl std::fmt::Debug for ThrottleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleController")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    fn seeded(config: ThrottleConfig) -> ThrottleController {
        ThrottleController::with_rng(config, StdRng::seed_from_u64(7))
    }

    fn hit() -> Vec<ResultRecord> {
        vec![ResultRecord::new("A Paper")]
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_doubles_mean_exactly() {
        let mut throttle = seeded(ThrottleConfig::default());
        let records = throttle.wrap(|_| async { Ok(Vec::new()) }).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(throttle.state().mean_delay(), Duration::from_millis(1000));
        assert_eq!(throttle.state().blocks_detected(), 1);

        throttle.wrap(|_| async { Ok(Vec::new()) }).await.unwrap();
        assert_eq!(throttle.state().mean_delay(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_empty_result_resets_mean_to_baseline() {
        let mut throttle = seeded(ThrottleConfig::default());
        throttle.wrap(|_| async { Ok(Vec::new()) }).await.unwrap();
        throttle.wrap(|_| async { Ok(Vec::new()) }).await.unwrap();
        assert_eq!(throttle.state().mean_delay(), Duration::from_millis(2000));

        throttle.wrap(|_| async { Ok(hit()) }).await.unwrap();
        assert_eq!(throttle.state().mean_delay(), DEFAULT_BASELINE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_error_escalates_and_propagates() {
        let mut throttle = seeded(ThrottleConfig::default());
        let before = throttle.state().identity().clone();
        let result = throttle
            .wrap(|_| async { Err(SearchError::blocked("https://scholar.example", "HTTP 429")) })
            .await;

        assert!(matches!(result, Err(SearchError::Blocked { .. })));
        assert_eq!(throttle.state().mean_delay(), Duration::from_millis(1000));
        assert_eq!(throttle.state().rotations(), 1);
        assert_ne!(throttle.state().identity(), &before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_leave_mean_untouched() {
        let mut throttle = seeded(ThrottleConfig::default());
        let result = throttle
            .wrap(|_| async { Err(SearchError::http_status("https://scholar.example", 500)) })
            .await;
        assert!(result.is_err());
        assert_eq!(throttle.state().mean_delay(), DEFAULT_BASELINE_DELAY);
        assert_eq!(throttle.state().blocks_detected(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_rotates_after_threshold() {
        let config = ThrottleConfig::new(
            DEFAULT_BASELINE_DELAY,
            DEFAULT_MIN_DELAY,
            DEFAULT_JITTER_RATIO,
            3..=3,
        )
        .unwrap();
        let mut throttle = seeded(config);
        let mut seen = Vec::new();
        for _ in 0..4 {
            throttle
                .wrap(|identity| {
                    seen.push(identity);
                    async { Ok(hit()) }
                })
                .await
                .unwrap();
        }

        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[1], seen[2]);
        assert_ne!(seen[2], seen[3]);
        assert_eq!(throttle.state().rotations(), 1);
        assert_eq!(throttle.state().calls_since_rotation(), 1);
        assert_eq!(throttle.state().calls_issued(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrap_enforces_min_gap_between_calls() {
        let mut throttle = seeded(ThrottleConfig::default());
        let mut starts = Vec::new();
        for _ in 0..3 {
            throttle
                .wrap(|_| {
                    starts.push(Instant::now());
                    async { Ok(hit()) }
                })
                .await
                .unwrap();
        }
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_MIN_DELAY);
        }
    }

    #[test]
    fn test_next_delay_always_exceeds_floor() {
        let mut throttle = seeded(ThrottleConfig::default());
        for _ in 0..500 {
            assert!(throttle.next_delay() > DEFAULT_MIN_DELAY);
        }
    }

    #[test]
    fn test_next_delay_is_deterministic_for_seed() {
        let mut a = seeded(ThrottleConfig::default());
        let mut b = seeded(ThrottleConfig::default());
        let left: Vec<Duration> = (0..10).map(|_| a.next_delay()).collect();
        let right: Vec<Duration> = (0..10).map(|_| b.next_delay()).collect();
        assert_eq!(left, right);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_receives_block_events() {
        let calls = Arc::new(AtomicU64::new(0));
        let observed = Arc::clone(&calls);
        let mut throttle = seeded(ThrottleConfig::default()).with_hook(move |event: &BlockEvent| {
            assert_eq!(event.reason, "empty result");
            observed.store(event.blocks_detected, Ordering::SeqCst);
        });
        throttle.wrap(|_| async { Ok(Vec::new()) }).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
