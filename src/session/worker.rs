use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureError, FrameSource};
use crate::classify::{Classifier, ClassifierError};
use crate::config::InspectionConfig;
use crate::db::ResultStore;
use crate::models::{NewInspectionRecord, Verdict};
use crate::plc::Actuator;
use crate::utils::retry::with_one_retry;

use super::events::{EventSink, LogLevel, SessionReport};

const ENABLE_LOGS: bool = true;
use crate::{log_error, log_info};

/// Fatal session failures. Non-fatal ones (store, PLC) are reported through
/// the sink and never surface here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(#[source] CaptureError),
    #[error("frame read failed: {0}")]
    FrameRead(#[source] CaptureError),
    #[error("classifier failure: {0}")]
    Classifier(#[source] ClassifierError),
    #[error("no frames processed")]
    NoFramesProcessed,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Completed(SessionReport),
    Failed(SessionError),
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed(_))
    }
}

#[derive(Debug, Default)]
struct FrameTally {
    frame_count: u32,
    single: u32,
    multiple: u32,
    none: u32,
    latencies: Vec<Duration>,
}

/// Run one inspection session to completion.
///
/// Samples frames until the budget expires or `cancel` fires (both soft:
/// checked at iteration boundaries, an in-flight inference finishes), scores
/// the sample against the pass threshold, persists the outcome with one
/// reconnect-and-retry, signals the PLC, and emits the terminal event last.
/// The source is closed on every exit path. A mid-loop read or inference
/// failure discards the partial sample and fails the session; store and PLC
/// failures do not.
pub fn run_session(
    session_id: &str,
    config: &InspectionConfig,
    source: &mut dyn FrameSource,
    classifier: &dyn Classifier,
    store: &dyn ResultStore,
    actuator: &dyn Actuator,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> SessionOutcome {
    log_info!("session {session_id}: starting inspection");
    sink.on_log("starting inspection", LogLevel::Info);

    if let Err(err) = source.open() {
        source.close();
        return fail(session_id, sink, SessionError::CaptureUnavailable(err));
    }

    let sampled = sample_frames(session_id, config, source, classifier, sink, cancel);
    source.close();

    let tally = match sampled {
        Ok(tally) => tally,
        Err(err) => return fail(session_id, sink, err),
    };

    if tally.frame_count == 0 {
        return fail(session_id, sink, SessionError::NoFramesProcessed);
    }

    let report = score(session_id, config, &tally);
    log_info!(
        "session {session_id}: {} frames, single {:.1}%, multiple {:.1}%, none {:.1}%, {}",
        report.frame_count,
        report.single_percent,
        report.multiple_percent,
        report.no_circlip_percent,
        report.verdict.as_str()
    );

    if report.verdict == Verdict::Fail {
        sink.on_alert("circlip missing or incorrect", LogLevel::Error);
        sink.on_log("circlip missing or incorrect", LogLevel::Error);
    }

    persist(store, sink, &report);
    signal_plc(actuator, sink, config, report.verdict);

    sink.on_completed(&report);
    SessionOutcome::Completed(report)
}

fn fail(session_id: &str, sink: &dyn EventSink, error: SessionError) -> SessionOutcome {
    log_error!("session {session_id}: {error}");
    sink.on_error(&error.to_string());
    // Failure is never silent: raise the alert channel too.
    sink.on_alert(&error.to_string(), LogLevel::Error);
    SessionOutcome::Failed(error)
}

fn sample_frames(
    session_id: &str,
    config: &InspectionConfig,
    source: &mut dyn FrameSource,
    classifier: &dyn Classifier,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> Result<FrameTally, SessionError> {
    let budget = config.frame_budget();
    let started = Instant::now();
    let mut tally = FrameTally::default();

    while started.elapsed() < budget {
        if cancel.is_cancelled() {
            log_info!(
                "session {session_id}: cancelled after {} frames",
                tally.frame_count
            );
            break;
        }

        let frame = source.read_frame().map_err(SessionError::FrameRead)?;
        sink.on_frame(&frame);

        let inference_started = Instant::now();
        let count = classifier
            .infer(&frame)
            .map_err(SessionError::Classifier)?;
        tally.latencies.push(inference_started.elapsed());

        match count {
            0 => tally.none += 1,
            1 => tally.single += 1,
            n => {
                tally.multiple += 1;
                sink.on_alert(
                    &format!("multiple circlips detected: {n}"),
                    LogLevel::Warning,
                );
            }
        }
        tally.frame_count += 1;
    }

    Ok(tally)
}

fn score(session_id: &str, config: &InspectionConfig, tally: &FrameTally) -> SessionReport {
    let total = f64::from(tally.frame_count);
    let single_percent = f64::from(tally.single) / total * 100.0;
    let multiple_percent = f64::from(tally.multiple) / total * 100.0;
    let no_circlip_percent = f64::from(tally.none) / total * 100.0;

    let verdict = if single_percent >= config.pass_threshold_percent {
        Verdict::Pass
    } else {
        Verdict::Fail
    };

    let mean_latency_ms = if tally.latencies.is_empty() {
        0.0
    } else {
        let total_ms: f64 = tally
            .latencies
            .iter()
            .map(|latency| latency.as_secs_f64() * 1_000.0)
            .sum();
        total_ms / tally.latencies.len() as f64
    };

    SessionReport {
        session_id: session_id.to_string(),
        frame_count: tally.frame_count,
        single_percent,
        multiple_percent,
        no_circlip_percent,
        verdict,
        mean_latency_ms,
    }
}

fn persist(store: &dyn ResultStore, sink: &dyn EventSink, report: &SessionReport) {
    let record = NewInspectionRecord {
        single_percent: report.single_percent,
        multiple_percent: report.multiple_percent,
        no_circlip_percent: report.no_circlip_percent,
        verdict: report.verdict,
    };

    let result = with_one_retry(
        || {
            sink.on_log("result insert failed, reconnecting store", LogLevel::Warning);
            if let Err(err) = store.reconnect() {
                sink.on_log(&format!("store reconnect failed: {err}"), LogLevel::Warning);
            }
        },
        || store.insert(&record),
    );

    match result {
        Ok(id) => sink.on_log(
            &format!("result stored (record {id}): {}", report.verdict.as_str()),
            LogLevel::Info,
        ),
        Err(err) => sink.on_log(
            &format!("failed to store result after retry: {err}"),
            LogLevel::Error,
        ),
    }
}

fn signal_plc(
    actuator: &dyn Actuator,
    sink: &dyn EventSink,
    config: &InspectionConfig,
    verdict: Verdict,
) {
    let value = verdict.register_value();
    match actuator.write(&config.plc.register, value) {
        Ok(()) => sink.on_log(
            &format!("sent {value} to PLC {}", config.plc.register),
            LogLevel::Info,
        ),
        Err(err) => sink.on_log(&err.to_string(), LogLevel::Error),
    }
}
