//! Status polling: drive a remote resource from a pending status set to a
//! target status set.
//!
//! The probe closure reports either the fetched object with its current
//! status, or `None` when the resource can no longer be found. An empty
//! target set means absence is the terminal state (deletes); otherwise
//! absence is an error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::errors::{ApiError, WaitError};

/// Default delay between two probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest delay allowed between two probes.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parameters of one wait: which statuses to sit through, which to stop at.
#[derive(Debug, Clone)]
pub struct StateChangeConf<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Sleep before the first probe.
    pub delay: Duration,
}

impl<S> StateChangeConf<S>
where
    S: PartialEq + Display,
{
    pub fn new(pending: Vec<S>, target: Vec<S>, timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            delay: Duration::ZERO,
        }
    }

    /// Values below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn expected(&self) -> String {
        if self.target.is_empty() {
            return "<absent>".to_string();
        }
        self.target
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Poll `refresh` until a target status (or absence, for an empty target
    /// set) is observed.
    ///
    /// Returns the last fetched object; `None` when the wait ended on absence.
    /// Probe errors are returned immediately and never retried here.
    pub async fn wait_for_state<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut refresh: F,
    ) -> Result<Option<T>, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<(T, S)>, ApiError>>,
    {
        let start = Instant::now();
        // A timeout too large to represent never expires.
        let deadline = start.checked_add(self.timeout);
        let expired = |now: Instant| deadline.is_some_and(|d| now >= d);
        let mut last_state = String::new();
        let mut next_sleep = self.delay;
        let mut attempt: u32 = 0;

        loop {
            if !next_sleep.is_zero() {
                let now = Instant::now();
                if expired(now) {
                    return Err(self.timeout_error(last_state));
                }
                let sleep = match deadline {
                    Some(d) => next_sleep.min(d - now),
                    None => next_sleep,
                };
                tokio::select! {
                    _ = cancel.cancelled() => return Err(WaitError::Cancelled),
                    _ = tokio::time::sleep(sleep) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled);
            }

            attempt += 1;
            let probe = tokio::select! {
                _ = cancel.cancelled() => return Err(WaitError::Cancelled),
                probe = refresh() => probe?,
            };

            match probe {
                None if self.target.is_empty() => {
                    debug!(attempt, elapsed = ?start.elapsed(), "resource absent, wait complete");
                    return Ok(None);
                }
                None => {
                    return Err(WaitError::NotFound {
                        expected: self.expected(),
                    });
                }
                Some((object, state)) => {
                    trace!(attempt, state = %state, "probed resource state");
                    if self.target.contains(&state) {
                        debug!(attempt, state = %state, elapsed = ?start.elapsed(), "target state reached");
                        return Ok(Some(object));
                    }
                    if !self.pending.contains(&state) {
                        return Err(WaitError::UnexpectedState {
                            state: state.to_string(),
                            expected: self.expected(),
                        });
                    }
                    last_state = state.to_string();
                }
            }

            if expired(Instant::now()) {
                return Err(self.timeout_error(last_state));
            }
            next_sleep = self.poll_interval;
        }
    }

    fn timeout_error(&self, last_state: String) -> WaitError {
        WaitError::Timeout {
            last_state,
            expected: self.expected(),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::model::TableStatus;

    type Script = Arc<Mutex<VecDeque<Result<Option<(u32, TableStatus)>, ApiError>>>>;

    fn script(steps: Vec<Result<Option<(u32, TableStatus)>, ApiError>>) -> Script {
        Arc::new(Mutex::new(steps.into()))
    }

    fn probe(
        steps: &Script,
    ) -> impl FnMut() -> std::future::Ready<Result<Option<(u32, TableStatus)>, ApiError>> + '_ {
        move || {
            let next = steps
                .lock()
                .unwrap()
                .pop_front()
                .expect("probe called more often than scripted");
            std::future::ready(next)
        }
    }

    fn create_conf(timeout: Duration) -> StateChangeConf<TableStatus> {
        StateChangeConf::new(vec![TableStatus::Creating], vec![TableStatus::Active], timeout)
            .with_poll_interval(Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target_and_returns_last_object() {
        let steps = script(vec![
            Ok(Some((1, TableStatus::Creating))),
            Ok(Some((2, TableStatus::Creating))),
            Ok(Some((3, TableStatus::Active))),
        ]);
        let result = create_conf(Duration::from_secs(60))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert_eq!(result, Ok(Some(3)));
        assert!(steps.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_while_pending() {
        let steps = script((0..10).map(|i| Ok(Some((i, TableStatus::Creating)))).collect());
        let result = create_conf(Duration::from_millis(2500))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        match result {
            Err(WaitError::Timeout {
                last_state,
                expected,
                ..
            }) => {
                assert_eq!(last_state, "CREATING");
                assert_eq!(expected, "ACTIVE");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_state_fails() {
        let steps = script(vec![
            Ok(Some((1, TableStatus::Creating))),
            Ok(Some((2, TableStatus::Other("RESTORING".to_string())))),
        ]);
        let result = create_conf(Duration::from_secs(60))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert_eq!(
            result,
            Err(WaitError::UnexpectedState {
                state: "RESTORING".to_string(),
                expected: "ACTIVE".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn absence_is_an_error_unless_target_is_empty() {
        let steps = script(vec![Ok(None)]);
        let result = create_conf(Duration::from_secs(60))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert!(matches!(result, Err(WaitError::NotFound { .. })));

        let steps = script(vec![Ok(Some((1, TableStatus::Deleting))), Ok(None)]);
        let result = StateChangeConf::new(vec![TableStatus::Deleting], vec![], Duration::from_secs(60))
            .with_poll_interval(Duration::from_secs(1))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_propagate_immediately() {
        let steps = script(vec![
            Err(ApiError::new(crate::errors::ApiErrorKind::Throttling, "slow down")),
            Ok(Some((1, TableStatus::Active))),
        ]);
        let result = create_conf(Duration::from_secs(60))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert!(matches!(result, Err(WaitError::Probe(_))));
        assert_eq!(steps.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_not_a_timeout() {
        let steps = script((0..10).map(|i| Ok(Some((i, TableStatus::Creating)))).collect());
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });
        let result = create_conf(Duration::from_secs(60))
            .wait_for_state(&cancel, probe(&steps))
            .await;
        assert_eq!(result, Err(WaitError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_timeout_never_expires() {
        let steps = script(vec![
            Ok(Some((1, TableStatus::Creating))),
            Ok(Some((2, TableStatus::Active))),
        ]);
        let result = create_conf(Duration::from_secs(u64::MAX))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert_eq!(result, Ok(Some(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_poll_interval_is_raised_to_minimum() {
        let steps = script(vec![
            Ok(Some((1, TableStatus::Creating))),
            Ok(Some((2, TableStatus::Creating))),
            Ok(Some((3, TableStatus::Active))),
        ]);
        let conf = create_conf(Duration::from_secs(60)).with_poll_interval(Duration::ZERO);
        assert_eq!(conf.poll_interval, MIN_POLL_INTERVAL);

        let start = Instant::now();
        let result = conf
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert_eq!(result, Ok(Some(3)));
        assert!(start.elapsed() >= MIN_POLL_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_before_first_probe() {
        let steps = script(vec![Ok(Some((1, TableStatus::Active)))]);
        let start = Instant::now();
        let result = create_conf(Duration::from_secs(60))
            .with_delay(Duration::from_secs(10))
            .wait_for_state(&CancellationToken::new(), probe(&steps))
            .await;
        assert_eq!(result, Ok(Some(1)));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
