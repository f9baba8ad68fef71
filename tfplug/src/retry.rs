//! Status poller for long-running remote operations
//!
//! [`StateChangeConf`] repeatedly calls a refresh function until the status it
//! reports lands in the target set. Pending statuses keep the loop going, a
//! refresh error or any status outside both sets aborts immediately.
//!
//! The poll interval is fixed: `poll_interval` when set, otherwise
//! `min_timeout`, otherwise [`DEFAULT_POLL_INTERVAL`], and never less than
//! `min_timeout`. The loop gives up after `timeout` or when the request
//! [`Context`] is cancelled, whichever comes first.
//!
//! A refresh returning no result means the object was not found. That is a
//! success when the reported status is a target (e.g. `DELETED`), otherwise it
//! is tolerated `not_found_checks` times in a row before failing.

use crate::context::Context;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// Outcome of a successful wait
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome<T> {
    /// Last object returned by refresh, `None` when the target was "gone"
    pub result: Option<T>,
    /// Target status that ended the wait
    pub state: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError<E>
where
    E: std::error::Error + 'static,
{
    #[error("{0}")]
    Refresh(#[source] E),

    #[error(
        "timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {})",
        format_duration(.timeout)
    )]
    Timeout {
        last_state: String,
        target: String,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{expected}'")]
    UnexpectedState { state: String, expected: String },

    #[error("couldn't find resource ({checks} retries)")]
    NotFound { checks: u32 },

    #[error("wait cancelled while in state '{last_state}'")]
    Cancelled { last_state: String },
}

impl<E> WaitError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    /// The refresh error, if that is what stopped the wait
    pub fn refresh_error(&self) -> Option<&E> {
        match self {
            WaitError::Refresh(e) => Some(e),
            _ => None,
        }
    }
}

/// Configuration of one wait loop
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    /// Zero means no timeout of its own; the context deadline still applies
    pub timeout: Duration,
    /// Floor on the sleep between polls
    pub min_timeout: Duration,
    /// Wait before the first poll
    pub delay: Duration,
    /// Fixed sleep between polls; zero falls back to `min_timeout`
    pub poll_interval: Duration,
    pub not_found_checks: u32,
    /// Number of consecutive target observations required
    pub continuous_target_occurrence: u32,
}

impl StateChangeConf {
    pub fn new<P, T, S>(pending: P, target: T) -> Self
    where
        P: IntoIterator<Item = S>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            timeout: Duration::ZERO,
            min_timeout: Duration::ZERO,
            delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurrence: 1,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurrence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrence = occurrences.max(1);
        self
    }

    /// Sleep between two polls
    pub fn interval(&self) -> Duration {
        let base = if !self.poll_interval.is_zero() {
            self.poll_interval
        } else if !self.min_timeout.is_zero() {
            self.min_timeout
        } else {
            DEFAULT_POLL_INTERVAL
        };
        base.max(self.min_timeout)
    }

    fn effective_timeout(&self, ctx: &Context) -> Option<Duration> {
        let own = (!self.timeout.is_zero()).then_some(self.timeout);
        match (own, ctx.remaining()) {
            (Some(own), Some(remaining)) => Some(own.min(remaining)),
            (own, remaining) => own.or(remaining),
        }
    }

    /// Poll `refresh` until a target status, an error, a timeout or cancellation
    pub async fn wait_for_state<T, E, F, Fut>(
        &self,
        ctx: &Context,
        mut refresh: F,
    ) -> Result<WaitOutcome<T>, WaitError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(Option<T>, String), E>>,
        E: std::error::Error + 'static,
    {
        let interval = self.interval();
        let timeout = self.effective_timeout(ctx);
        let mut last_state = String::new();

        tracing::debug!(
            pending = ?self.pending,
            target = ?self.target,
            ?timeout,
            ?interval,
            "waiting for state"
        );

        let outcome = {
            let poll = self.poll(ctx, interval, &mut refresh, &mut last_state);
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, poll).await {
                    Ok(outcome) => Some(outcome),
                    Err(_) => None,
                },
                None => Some(poll.await),
            }
        };

        match outcome {
            Some(Err(WaitError::Cancelled { .. })) if deadline_passed(ctx) => {
                Err(self.timeout_error(last_state, timeout))
            }
            Some(outcome) => outcome,
            None => Err(self.timeout_error(last_state, timeout)),
        }
    }

    async fn poll<T, E, F, Fut>(
        &self,
        ctx: &Context,
        interval: Duration,
        refresh: &mut F,
        last_state: &mut String,
    ) -> Result<WaitOutcome<T>, WaitError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(Option<T>, String), E>>,
        E: std::error::Error + 'static,
    {
        if !self.delay.is_zero() {
            sleep_or_cancel(ctx, self.delay, last_state).await?;
        }

        let mut not_found = 0u32;
        let mut target_seen = 0u32;

        loop {
            if ctx.is_cancelled() {
                return Err(WaitError::Cancelled {
                    last_state: last_state.clone(),
                });
            }

            let (result, state) = refresh().await.map_err(WaitError::Refresh)?;
            tracing::trace!(%state, found = result.is_some(), "refreshed state");
            *last_state = state.clone();

            let is_target = self.target.iter().any(|t| *t == state);

            match result {
                None if is_target => {
                    return Ok(WaitOutcome {
                        result: None,
                        state,
                    });
                }
                None => {
                    target_seen = 0;
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(WaitError::NotFound {
                            checks: self.not_found_checks,
                        });
                    }
                }
                Some(result) => {
                    not_found = 0;
                    if is_target {
                        target_seen += 1;
                        if target_seen >= self.continuous_target_occurrence {
                            return Ok(WaitOutcome {
                                result: Some(result),
                                state,
                            });
                        }
                    } else if self.pending.iter().any(|p| *p == state) {
                        target_seen = 0;
                    } else {
                        return Err(WaitError::UnexpectedState {
                            state,
                            expected: self.target.join(", "),
                        });
                    }
                }
            }

            sleep_or_cancel(ctx, interval, last_state).await?;
        }
    }

    fn timeout_error<E>(&self, last_state: String, timeout: Option<Duration>) -> WaitError<E>
    where
        E: std::error::Error + 'static,
    {
        WaitError::Timeout {
            last_state,
            target: self.target.join(", "),
            timeout: timeout.unwrap_or(self.timeout),
        }
    }
}

async fn sleep_or_cancel<E>(
    ctx: &Context,
    duration: Duration,
    last_state: &str,
) -> Result<(), WaitError<E>>
where
    E: std::error::Error + 'static,
{
    tokio::select! {
        _ = ctx.cancelled() => Err(WaitError::Cancelled {
            last_state: last_state.to_string(),
        }),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

fn deadline_passed(ctx: &Context) -> bool {
    ctx.deadline().is_some_and(|d| Instant::now() >= d)
}

/// Render a duration the way Go does, e.g. `1h0m0s`, `90s` -> `1m30s`
pub fn format_duration(duration: &Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    let millis = duration.subsec_millis();
    if millis > 0 {
        out.push_str(&format!("{}.{:03}s", seconds, millis));
    } else {
        out.push_str(&format!("{}s", seconds));
    }
    out
}

impl fmt::Display for StateChangeConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} -> {:?} (timeout {})",
            self.pending,
            self.target,
            format_duration(&self.timeout)
        )
    }
}
