use std::future::Future;
use std::time::Duration;

use mimic_core::{JobStage, JobStatus};
use mimic_logging::{mimic_debug, mimic_warn};
use tokio_util::sync::CancellationToken;

use crate::{ApiError, PollError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 100,
        }
    }
}

/// Fetches a job status until `is_terminal` accepts it.
///
/// `on_status` sees every fetched status, terminal or not. A `Failed` stage
/// ends polling with [`PollError::Failed`]. There is no sleep after the last
/// attempt, and cancellation wins over both an in-flight fetch and the wait.
pub async fn poll_until_terminal<F, Fut, P, S>(
    mut fetch: F,
    settings: PollSettings,
    cancel: &CancellationToken,
    is_terminal: P,
    mut on_status: S,
) -> Result<JobStatus, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus, ApiError>>,
    P: Fn(&JobStatus) -> bool,
    S: FnMut(&JobStatus),
{
    for attempt in 1..=settings.max_attempts {
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = fetch() => result?,
        };
        mimic_debug!(
            "poll {}/{} job={} stage={}",
            attempt,
            settings.max_attempts,
            status.job_id,
            status.stage
        );
        on_status(&status);

        if status.stage == JobStage::Failed {
            let reason = status
                .error
                .clone()
                .unwrap_or_else(|| "analysis failed".to_string());
            return Err(PollError::Failed(reason));
        }
        if is_terminal(&status) {
            return Ok(status);
        }

        if attempt < settings.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(settings.interval) => {}
            }
        }
    }

    mimic_warn!("gave up after {} polls", settings.max_attempts);
    Err(PollError::Timeout {
        attempts: settings.max_attempts,
    })
}
