//! Notification routing.
//!
//! A small state machine fixed for the duration of a run: the configured mode
//! decides whether the final status becomes a persistent commit status, a
//! fatal process failure, or a log line. It runs exactly once per run; a push
//! failure propagates, there is no retry loop here.

use tracing::info;

use crate::config::{AnnotatorConfig, NotificationMode};
use crate::errors::{AnnotateResult, Error};
use crate::gitlab::GitlabClient;
use crate::report::status::RunStatus;

/// What the router will do for a given mode and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Push the persistent status marker.
    Push,
    /// Raise a fatal error carrying the status message.
    Fail,
    /// Log only.
    Log,
}

fn decide(mode: NotificationMode, status: &RunStatus) -> Action {
    match mode {
        NotificationMode::CommitStatus => Action::Push,
        NotificationMode::ExitCode if status.state.is_failure() => Action::Fail,
        NotificationMode::ExitCode => Action::Log,
        NotificationMode::Nothing => Action::Log,
    }
}

/// Delivers the final status of a run.
pub async fn dispatch(
    cfg: &AnnotatorConfig,
    client: &GitlabClient,
    status: &RunStatus,
) -> AnnotateResult<()> {
    let message = format!(
        "Report status={}, desc={}",
        status.state.name(),
        status.description
    );
    match decide(cfg.notification_mode, status) {
        Action::Push => {
            info!("{message}");
            client
                .post_commit_status(&cfg.gitlab, status.state.remote_name(), &status.description)
                .await
        }
        Action::Fail => Err(Error::RunFailed(message)),
        Action::Log => {
            info!("{message}");
            Ok(())
        }
    }
}
