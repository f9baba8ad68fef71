//! Status vocabularies and wait configurations for asynchronous Atlas operations

use std::future::Future;
use std::time::Duration;
use tfplug::{Context, StateChangeConf, WaitError};

// Cluster and flex cluster lifecycle
pub const CREATING: &str = "CREATING";
pub const UPDATING: &str = "UPDATING";
pub const REPAIRING: &str = "REPAIRING";
pub const REPEATING: &str = "REPEATING";
pub const PENDING: &str = "PENDING";
pub const IDLE: &str = "IDLE";
pub const DELETING: &str = "DELETING";
pub const DELETED: &str = "DELETED";

// Snapshot lifecycle
pub const SNAPSHOT_QUEUED: &str = "queued";
pub const SNAPSHOT_IN_PROGRESS: &str = "inProgress";
pub const SNAPSHOT_COMPLETED: &str = "completed";
pub const SNAPSHOT_FAILED: &str = "failed";

// Private endpoint service lifecycle
pub const INITIATING: &str = "INITIATING";
pub const WAITING_FOR_USER: &str = "WAITING_FOR_USER";
pub const AVAILABLE: &str = "AVAILABLE";
pub const FAILED: &str = "FAILED";

// Encryption at rest patch outcome
pub const COMPLETED: &str = "COMPLETED";

/// Error codes Atlas returns while a freshly created cloud role or key has
/// not propagated yet
pub const ENCRYPTION_TRANSIENT_ERROR_CODES: [&str; 3] = [
    "CANNOT_ASSUME_ROLE",
    "INVALID_AWS_CREDENTIALS",
    "CLOUD_PROVIDER_ACCESS_ROLE_NOT_AUTHORIZED",
];

pub const DEFAULT_CLUSTER_WAIT_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_SNAPSHOT_CREATE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_PRIVATELINK_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_FLEX_TIMEOUT: Duration = Duration::from_secs(3 * 60 * 60);
pub const ENCRYPTION_AT_REST_TIMEOUT: Duration = Duration::from_secs(60);

/// Time granted to the best-effort delete after a create timed out
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Cluster settling before a snapshot can be taken
pub fn cluster_idle_conf() -> StateChangeConf {
    StateChangeConf::new([CREATING, UPDATING, REPAIRING, REPEATING, PENDING], [IDLE])
        .timeout(DEFAULT_CLUSTER_WAIT_TIMEOUT)
        .min_timeout(Duration::from_secs(30))
        .delay(Duration::from_secs(60))
}

/// On-demand snapshot; `failed` is terminal and reported by the caller
///
/// The snapshot gets one minute less than the create timeout, leaving room
/// for the cluster wait that precedes it.
pub fn snapshot_conf(create_timeout: Duration) -> StateChangeConf {
    StateChangeConf::new(
        [SNAPSHOT_QUEUED, SNAPSHOT_IN_PROGRESS],
        [SNAPSHOT_COMPLETED, SNAPSHOT_FAILED],
    )
    .timeout(create_timeout.saturating_sub(Duration::from_secs(60)))
    .min_timeout(Duration::from_secs(60))
    .delay(Duration::from_secs(60))
}

pub fn privatelink_create_conf(timeout: Duration) -> StateChangeConf {
    StateChangeConf::new(
        [INITIATING, DELETING],
        [WAITING_FOR_USER, FAILED, DELETED, AVAILABLE],
    )
    .timeout(timeout)
    .min_timeout(Duration::from_secs(5))
    .delay(Duration::from_secs(3))
}

pub fn privatelink_delete_conf(timeout: Duration) -> StateChangeConf {
    StateChangeConf::new([DELETING], [DELETED, FAILED])
        .timeout(timeout)
        .min_timeout(Duration::from_secs(5))
        .delay(Duration::from_secs(3))
}

pub fn flex_create_update_conf(timeout: Duration) -> StateChangeConf {
    StateChangeConf::new([CREATING, UPDATING, REPAIRING], [IDLE])
        .timeout(timeout)
        .min_timeout(Duration::from_secs(30))
        .delay(Duration::from_secs(1))
}

pub fn flex_delete_conf(timeout: Duration) -> StateChangeConf {
    StateChangeConf::new([IDLE, UPDATING, DELETING], [DELETED])
        .timeout(timeout)
        .min_timeout(Duration::from_secs(30))
        .delay(Duration::from_secs(1))
}

/// A rejection that is not transient ends the wait as a refresh error
pub fn encryption_at_rest_conf() -> StateChangeConf {
    StateChangeConf::new([PENDING], [COMPLETED])
        .timeout(ENCRYPTION_AT_REST_TIMEOUT)
        .min_timeout(Duration::from_secs(1))
}

/// Unset `delete_on_create_timeout` means true
pub fn resolve_delete_on_create_timeout(configured: Option<bool>) -> bool {
    configured.unwrap_or(true)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The wait did not time out or cleanup is disabled
    NotAttempted,
    Deleted,
    Failed(String),
}

/// Best-effort delete of a half-created resource after its create wait timed out
///
/// The cleanup runs on a fresh context because the operation's own deadline
/// has already passed.
pub async fn handle_create_timeout<E, F, Fut, CE>(
    delete_on_create_timeout: bool,
    wait_error: &WaitError<E>,
    cleanup: F,
) -> CleanupOutcome
where
    E: std::error::Error + 'static,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<(), CE>>,
    CE: std::fmt::Display,
{
    if !delete_on_create_timeout || !wait_error.is_timeout() {
        return CleanupOutcome::NotAttempted;
    }

    tracing::warn!("create timed out, deleting the partially created resource");
    match cleanup(Context::new().with_timeout(CLEANUP_TIMEOUT)).await {
        Ok(()) => CleanupOutcome::Deleted,
        Err(e) => CleanupOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("refresh failed")]
    struct RefreshError;

    fn timeout_error() -> WaitError<RefreshError> {
        WaitError::Timeout {
            last_state: CREATING.to_string(),
            target: IDLE.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn snapshot_timeout_leaves_room_for_cluster_wait() {
        let conf = snapshot_conf(Duration::from_secs(3600));
        assert_eq!(conf.timeout, Duration::from_secs(3540));
        assert_eq!(conf.target, vec![SNAPSHOT_COMPLETED, SNAPSHOT_FAILED]);
    }

    #[test]
    fn encryption_at_rest_ends_only_on_completion() {
        let conf = encryption_at_rest_conf();
        assert_eq!(conf.pending, vec![PENDING]);
        assert_eq!(conf.target, vec![COMPLETED]);
        assert_eq!(conf.timeout, ENCRYPTION_AT_REST_TIMEOUT);
    }

    #[test]
    fn privatelink_timings() {
        let conf = privatelink_create_conf(DEFAULT_PRIVATELINK_TIMEOUT);
        assert_eq!(conf.delay, Duration::from_secs(3));
        assert_eq!(conf.interval(), Duration::from_secs(5));
        assert!(conf.pending.contains(&DELETING.to_string()));
    }

    #[tokio::test]
    async fn cleanup_runs_only_on_timeout() {
        let outcome = handle_create_timeout(true, &timeout_error(), |_| async {
            Ok::<(), String>(())
        })
        .await;
        assert_eq!(outcome, CleanupOutcome::Deleted);

        let outcome = handle_create_timeout(false, &timeout_error(), |_| async {
            Ok::<(), String>(())
        })
        .await;
        assert_eq!(outcome, CleanupOutcome::NotAttempted);

        let refresh_failure: WaitError<RefreshError> = WaitError::Refresh(RefreshError);
        let outcome = handle_create_timeout(true, &refresh_failure, |_| async {
            Ok::<(), String>(())
        })
        .await;
        assert_eq!(outcome, CleanupOutcome::NotAttempted);
    }

    #[tokio::test]
    async fn cleanup_failure_is_reported() {
        let outcome = handle_create_timeout(true, &timeout_error(), |_| async {
            Err::<(), String>("HTTP 500".to_string())
        })
        .await;
        assert_eq!(outcome, CleanupOutcome::Failed("HTTP 500".to_string()));
    }

    #[test]
    fn delete_on_create_timeout_defaults_to_true() {
        assert!(resolve_delete_on_create_timeout(None));
        assert!(!resolve_delete_on_create_timeout(Some(false)));
    }
}
