use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::capture::Frame;
use crate::models::Verdict;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// Terminal payload of a completed session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    pub frame_count: u32,
    pub single_percent: f64,
    pub multiple_percent: f64,
    pub no_circlip_percent: f64,
    pub verdict: Verdict,
    pub mean_latency_ms: f64,
}

/// Where the session reports progress, alerts and its outcome. Implementations
/// must never block the worker; delivery is best-effort and a dropped event
/// must not abort the session.
///
/// Events arrive in production order within one session; the completed/error
/// event is always last.
pub trait EventSink: Send + Sync {
    fn on_frame(&self, frame: &Frame);
    fn on_log(&self, message: &str, level: LogLevel);
    fn on_alert(&self, message: &str, level: LogLevel);
    fn on_error(&self, message: &str);
    fn on_completed(&self, report: &SessionReport);
}

#[derive(Debug, Clone)]
pub enum InspectionEvent {
    Frame(Frame),
    Log { message: String, level: LogLevel },
    Alert { message: String, level: LogLevel },
    Error { message: String },
    Completed(SessionReport),
}

/// Sink that forwards every event into an unbounded channel. Sending never
/// blocks; events sent after the receiver is gone are dropped.
pub struct ChannelSink {
    tx: UnboundedSender<InspectionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<InspectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn on_frame(&self, frame: &Frame) {
        let _ = self.tx.send(InspectionEvent::Frame(frame.clone()));
    }

    fn on_log(&self, message: &str, level: LogLevel) {
        let _ = self.tx.send(InspectionEvent::Log {
            message: message.to_string(),
            level,
        });
    }

    fn on_alert(&self, message: &str, level: LogLevel) {
        let _ = self.tx.send(InspectionEvent::Alert {
            message: message.to_string(),
            level,
        });
    }

    fn on_error(&self, message: &str) {
        let _ = self.tx.send(InspectionEvent::Error {
            message: message.to_string(),
        });
    }

    fn on_completed(&self, report: &SessionReport) {
        let _ = self.tx.send(InspectionEvent::Completed(report.clone()));
    }
}
