//! Generic bounded-retry wait loop for asynchronous API operations
//!
//! Mutating MySQLCS calls return before the remote state machine settles, so
//! each resource handler hands a probe to [`poll_until`], which owns the
//! retry cadence. The probe reports progress through its return value:
//! `Ok(true)` means the awaited condition holds, `Ok(false)` means keep
//! waiting, and `Err` aborts the loop immediately. Probe errors are fatal by
//! convention; the probe itself decides whether a condition is "still in
//! progress" or a permanent failure.
//!
//! Optional progress callbacks let a CLI drive a spinner without the poller
//! knowing anything about presentation.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Poll cadence for one wait loop: how often to probe and how long to keep
/// trying before giving up.
///
/// Resolved explicitly per call; the handlers fall back to the per-resource
/// defaults below when the caller passes `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Time between probe invocations
    pub interval: Duration,
    /// Maximum total time to wait for a terminal verdict
    pub timeout: Duration,
}

impl PollOptions {
    /// Default cadence for service instance provisioning and teardown.
    /// Instances take tens of minutes to settle, so probe once a minute.
    pub const SERVICE_INSTANCE: PollOptions = PollOptions {
        interval: Duration::from_secs(60),
        timeout: Duration::from_secs(3600),
    };

    /// Default cadence for access rule changes, which settle in seconds.
    pub const ACCESS_RULE: PollOptions = PollOptions {
        interval: Duration::from_secs(2),
        timeout: Duration::from_secs(30),
    };

    /// Construct a cadence from whole seconds
    #[must_use]
    pub fn from_secs(interval: u64, timeout: u64) -> Self {
        PollOptions {
            interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
        }
    }
}

/// Progress events emitted while a wait loop runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The wait loop has started
    Started { description: String },
    /// One probe invocation is about to run
    Polling {
        description: String,
        attempt: u32,
        elapsed: Duration,
    },
    /// The awaited condition was observed
    Completed { description: String },
    /// The probe reported a fatal condition or the deadline elapsed
    Failed { description: String, error: String },
}

/// Callback type for progress updates
///
/// A CLI can use this to update spinners/progress bars. Library callers
/// typically pass `None`.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Poll a probe until it reports done, reports an error, or `opts.timeout`
/// elapses.
///
/// The probe runs immediately on entry and then once per `opts.interval`.
/// A probe returning `Ok(true)` ends the loop successfully regardless of
/// remaining budget; a probe error is returned unmodified without further
/// retries. If the deadline passes first, the returned
/// [`Error::WaitTimeout`] names `description`.
///
/// # Example
///
/// ```rust,ignore
/// poll_until(
///     "service instance demo to be ready",
///     PollOptions::SERVICE_INSTANCE,
///     None,
///     async || {
///         let instance = handler.get("demo").await?;
///         Ok(instance.status == ServiceInstanceStatus::Ready)
///     },
/// )
/// .await?;
/// ```
pub async fn poll_until(
    description: &str,
    opts: PollOptions,
    on_progress: Option<ProgressCallback>,
    mut probe: impl AsyncFnMut() -> Result<bool>,
) -> Result<()> {
    let start = Instant::now();
    let mut attempt: u32 = 0;

    debug!(
        description,
        interval_secs = opts.interval.as_secs_f64(),
        timeout_secs = opts.timeout.as_secs_f64(),
        "starting wait loop"
    );
    emit(
        &on_progress,
        ProgressEvent::Started {
            description: description.to_string(),
        },
    );

    loop {
        let elapsed = start.elapsed();
        if elapsed >= opts.timeout {
            let err = Error::WaitTimeout {
                description: description.to_string(),
                timeout: opts.timeout,
            };
            emit(
                &on_progress,
                ProgressEvent::Failed {
                    description: description.to_string(),
                    error: err.to_string(),
                },
            );
            return Err(err);
        }

        attempt += 1;
        trace!(description, attempt, ?elapsed, "probing");
        emit(
            &on_progress,
            ProgressEvent::Polling {
                description: description.to_string(),
                attempt,
                elapsed,
            },
        );

        match probe().await {
            Ok(true) => {
                debug!(description, attempt, ?elapsed, "condition observed");
                emit(
                    &on_progress,
                    ProgressEvent::Completed {
                        description: description.to_string(),
                    },
                );
                return Ok(());
            }
            Ok(false) => {
                // Still in progress, wait and try again
                tokio::time::sleep(opts.interval).await;
            }
            Err(e) => {
                emit(
                    &on_progress,
                    ProgressEvent::Failed {
                        description: description.to_string(),
                        error: e.to_string(),
                    },
                );
                return Err(e);
            }
        }
    }
}

/// Helper to emit progress events
fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
