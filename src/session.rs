//! Sensing sessions.
//!
//! A session connects a [`SensorSource`] to a [`HandednessPipeline`] for a bounded
//! period: it starts the pipeline, feeds every event through `ingest`, and stops the
//! pipeline when one of the following happens:
//!
//! - the source is exhausted,
//! - the caller's stop signal resolves (keyboard hidden, user pressed stop, Ctrl-C),
//! - the max-duration watchdog fires (10 minutes by default).
//!
//! Stopping always goes through [`HandednessPipeline::stop`], so in-flight inference from
//! the session is never delivered afterwards.

use crate::error::{AppResult, HandednessError};
use crate::pipeline::{HandednessPipeline, PipelineStats};
use crate::source::SensorSource;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{info, info_span, Instrument};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source reported no more events.
    SourceExhausted,
    /// The caller's stop signal resolved.
    Requested,
    /// The watchdog elapsed.
    MaxDuration,
}

/// What happened during one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    /// Why the session ended
    pub reason: StopReason,
    /// Counters accumulated during this session only
    pub stats: PipelineStats,
    /// Wall-clock time spent in the session
    pub elapsed: Duration,
}

/// Run one session until the source ends, `stop` resolves, or `max_duration` elapses.
///
/// A zero `max_duration` disables the watchdog. A source error stops the pipeline and is
/// returned as [`HandednessError::Session`].
pub async fn run_session<S, F>(
    pipeline: &mut HandednessPipeline,
    source: &mut S,
    max_duration: Duration,
    stop: F,
) -> AppResult<SessionSummary>
where
    S: SensorSource + ?Sized,
    F: Future<Output = ()>,
{
    let started = Instant::now();
    let baseline = pipeline.stats();
    let span = info_span!("session", max_duration = ?max_duration);

    let reason = async {
        pipeline.start();
        tokio::pin!(stop);
        let watchdog = sleep_until(started + max_duration);
        tokio::pin!(watchdog);
        let watchdog_armed = !max_duration.is_zero();

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => break Ok(StopReason::Requested),
                _ = &mut watchdog, if watchdog_armed => {
                    info!("Session watchdog elapsed");
                    break Ok(StopReason::MaxDuration);
                }
                next = source.next_event() => match next {
                    Ok(Some(event)) => {
                        pipeline.ingest(&event);
                    }
                    Ok(None) => break Ok(StopReason::SourceExhausted),
                    Err(e) => break Err(HandednessError::Session(format!("{e:#}"))),
                },
            }
        }
    }
    .instrument(span)
    .await;

    pipeline.stop();
    let reason = reason?;
    let summary = SessionSummary {
        reason,
        stats: pipeline.stats().since(&baseline),
        elapsed: started.elapsed(),
    };
    info!(reason = ?summary.reason, stats = ?summary.stats, "Session ended");
    Ok(summary)
}
