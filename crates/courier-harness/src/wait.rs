//! Synchronization primitive
//!
//! Actors run independently; the only way one learns about another's action is
//! by polling its own view. Every wait here is bounded and never blocks past its
//! timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::actor::ActorId;
use crate::error::{HarnessError, HarnessResult};
use crate::locator::Locator;
use crate::session::{AutomationSession, ElementHandle};

/// Default window for cross-device observations
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default interval between two probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bounds of one poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollConfig {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Probe until it yields a value or the timeout elapses.
///
/// The probe runs at least once and once more at the deadline. `Ok(None)` means
/// the window closed without the condition holding. Probe errors abort the loop.
pub async fn poll_until<T, F, Fut>(config: PollConfig, what: &str, mut probe: F) -> HarnessResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Option<T>>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            debug!("{} satisfied after {} probe(s)", what, attempts);
            return Ok(Some(value));
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("{} not satisfied within {:?} ({} probes)", what, config.timeout, attempts);
            return Ok(None);
        }
        sleep(config.interval.min(deadline - now)).await;
    }
}

/// Probe for the whole window and require the condition to stay false.
///
/// Returns `Ok(true)` only once the full timeout has elapsed without the
/// condition holding, and `Ok(false)` as soon as it holds.
pub async fn hold_absent<F, Fut>(config: PollConfig, what: &str, mut probe: F) -> HarnessResult<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<bool>>,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        if probe().await? {
            debug!("{} appeared during negative wait", what);
            return Ok(false);
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("{} stayed absent for {:?}", what, config.timeout);
            return Ok(true);
        }
        sleep(config.interval.min(deadline - now)).await;
    }
}

/// Run `op` up to `attempts` times, retrying only lookup misses.
///
/// Any other error, or the last miss, is returned as is.
pub async fn retry_bounded<T, F, Fut>(attempts: usize, interval: Duration, what: &str, mut op: F) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
{
    if attempts == 0 {
        return Err(HarnessError::Config(format!("{}: retry needs at least one attempt", what)));
    }

    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                debug!("{} attempt {}/{} missed: {}", what, attempt, attempts, e);
                attempt += 1;
                sleep(interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wait until `locator` matches on `actor`'s session.
pub async fn wait_for(
    session: &dyn AutomationSession,
    actor: ActorId,
    locator: &Locator,
    config: PollConfig,
) -> HarnessResult<ElementHandle> {
    let what = format!("{} on {}", locator, actor);
    let found = poll_until(config, &what, move || async move {
        Ok(session.find_elements(locator).await?.into_iter().next())
    })
    .await?;

    found.ok_or_else(|| HarnessError::ObservableTimeout {
        actor,
        step: None,
        predicate: locator.to_string(),
        timeout: config.timeout,
    })
}

/// Require `locator` to match nothing on `actor`'s session for the full window.
pub async fn wait_absent(
    session: &dyn AutomationSession,
    actor: ActorId,
    locator: &Locator,
    config: PollConfig,
) -> HarnessResult<()> {
    let what = format!("{} on {}", locator, actor);
    let held = hold_absent(config, &what, move || async move { session.is_present(locator).await }).await?;

    if held {
        Ok(())
    } else {
        Err(HarnessError::UnexpectedObservable {
            actor,
            predicate: locator.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config() -> PollConfig {
        PollConfig::new(Duration::from_secs(20), Duration::from_millis(500))
    }

    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(50),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_first_value() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let value = poll_until(config(), "third probe", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n == 3 { Some(n) } else { None })
        })
        .await
        .unwrap();

        assert_eq!(value, Some(3));
        assert_elapsed(started, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_gives_up_at_deadline() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let value: Option<()> = poll_until(config(), "never", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .await
        .unwrap();

        assert!(value.is_none());
        assert_elapsed(started, Duration::from_secs(20));
        // one probe at t=0 plus one per interval up to and including the deadline
        assert_eq!(calls.load(Ordering::SeqCst), 41);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_propagates_probe_errors() {
        let result: HarnessResult<Option<()>> = poll_until(config(), "broken", || async {
            Err(HarnessError::Session("socket closed".to_string()))
        })
        .await;
        assert!(matches!(result, Err(HarnessError::Session(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_absent_waits_full_window() {
        let started = Instant::now();
        let held = hold_absent(config(), "quiet", || async { Ok(false) }).await.unwrap();
        assert!(held);
        assert_elapsed(started, Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_absent_fails_when_condition_appears_late() {
        let started = Instant::now();
        let held = hold_absent(config(), "late", move || async move {
            Ok(started.elapsed() >= Duration::from_secs(15))
        })
        .await
        .unwrap();
        assert!(!held);
        assert_elapsed(started, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bounded_retries_only_lookup_misses() {
        let calls = &AtomicU32::new(0);
        let result = retry_bounded(2, Duration::from_millis(100), "options", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(HarnessError::ElementNotFound {
                locator: "options".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(HarnessError::ElementNotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let calls = &AtomicU32::new(0);
        let result = retry_bounded(5, Duration::from_millis(100), "send", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(HarnessError::Session("gone".to_string()))
        })
        .await;
        assert!(matches!(result, Err(HarnessError::Session(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_bounded_rejects_zero_attempts() {
        let result = retry_bounded(0, Duration::ZERO, "nothing", || async { Ok(()) }).await;
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }
}
