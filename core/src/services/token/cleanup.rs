//! Token cleanup service for periodic deletion of expired refresh tokens
//!
//! Expired records are kept for the retention period so reuse of an old
//! token can still be recognised, then removed by this job.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::errors::TokenResult;
use crate::repositories::TokenStore;

use super::config::TokenCleanupConfig;
use super::service::RefreshTokenService;

/// Service running the retention sweep, once or on an interval
pub struct TokenCleanupService<S: TokenStore + 'static> {
    service: Arc<RefreshTokenService<S>>,
    config: TokenCleanupConfig,
}

impl<S: TokenStore + 'static> TokenCleanupService<S> {
    pub fn new(service: Arc<RefreshTokenService<S>>, config: TokenCleanupConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &TokenCleanupConfig {
        &self.config
    }

    /// Run a single sweep
    ///
    /// Runs regardless of `enabled`, which only governs the background loop.
    ///
    /// # Returns
    /// * `Ok(CleanupReport)` - What was deleted and the cutoff used
    /// * `Err(TokenError::StorageFailure)` - The sweep failed; nothing was deleted
    /// * `Err(TokenError::TimestampOutOfRange)` - The retention window reaches before the earliest timestamp
    pub async fn run_cleanup(&self) -> TokenResult<CleanupReport> {
        let started_at = self.service.clock().now();
        let cutoff = self.service.retention_cutoff(started_at)?;

        info!(cutoff = %cutoff, "Starting refresh token cleanup");
        let deleted = self.service.delete_expired_before(cutoff).await?;
        let finished_at = self.service.clock().now();

        let report = CleanupReport {
            deleted,
            cutoff,
            started_at,
            finished_at,
        };
        info!(
            deleted = report.deleted,
            elapsed_ms = report.elapsed().num_milliseconds(),
            "Refresh token cleanup completed"
        );

        Ok(report)
    }

    /// Start the sweep as a background task
    ///
    /// The first sweep runs immediately, then once per configured interval.
    /// A failed sweep is logged and retried on the next tick.
    ///
    /// # Returns
    /// * `Some(JoinHandle)` - Handle of the spawned loop
    /// * `None` - Cleanup is disabled; nothing was spawned
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Refresh token cleanup is disabled");
            return None;
        }

        let handle = tokio::spawn(async move {
            info!(
                interval_seconds = self.config.interval.as_secs(),
                "Refresh token cleanup task started"
            );

            let mut interval_timer = tokio::time::interval(self.config.interval);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval_timer.tick().await;

                if let Err(e) = self.run_cleanup().await {
                    error!(error = %e, "Refresh token cleanup failed");
                }
            }
        });

        Some(handle)
    }
}

/// Result of one sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Records deleted
    pub deleted: u64,
    /// Records with `expires_at` strictly before this instant were deleted
    pub cutoff: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CleanupReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
