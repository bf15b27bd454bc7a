use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::capture::Frame;
use crate::session::events::{EventSink, LogLevel, SessionReport};

const ENABLE_LOGS: bool = true;
use crate::log_warn;

const BEEP_FREQUENCY_HZ: f32 = 1_000.0;
const BEEP_DURATION_MS: u64 = 1_000;

enum AlertCommand {
    Beep,
    Shutdown,
}

/// Plays the inspection alert tone. The non-Send rodio objects live on a
/// dedicated thread; callers fire commands and never wait.
pub struct AlertPlayer {
    tx: Sender<AlertCommand>,
}

impl AlertPlayer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<AlertCommand>();

        let spawned = thread::Builder::new()
            .name("alert-player".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AlertCommand::Beep => {
                            if sink.is_none() {
                                match OutputStream::try_default() {
                                    Ok((stream, handle)) => match Sink::try_new(&handle) {
                                        Ok(new_sink) => {
                                            _stream = Some(stream);
                                            sink = Some(new_sink);
                                        }
                                        Err(err) => {
                                            log_warn!("alert sink unavailable: {err}");
                                            continue;
                                        }
                                    },
                                    Err(err) => {
                                        log_warn!("audio output unavailable: {err}");
                                        continue;
                                    }
                                }
                            }

                            if let Some(sink) = &sink {
                                let tone = SineWave::new(BEEP_FREQUENCY_HZ)
                                    .take_duration(Duration::from_millis(BEEP_DURATION_MS))
                                    .amplify(0.8);
                                sink.append(tone);
                            }
                        }
                        AlertCommand::Shutdown => break,
                    }
                }
            });

        if let Err(err) = spawned {
            log_warn!("failed to spawn alert thread: {err}");
        }

        Self { tx }
    }

    /// Fire-and-forget; a dead audio thread just makes this a no-op.
    pub fn beep(&self) {
        let _ = self.tx.send(AlertCommand::Beep);
    }
}

impl Default for AlertPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AlertPlayer {
    fn drop(&mut self) {
        let _ = self.tx.send(AlertCommand::Shutdown);
    }
}

/// Sink decorator that sounds the alert tone on warning/error alerts before
/// forwarding every event to the wrapped sink.
pub struct AlertingSink {
    inner: Arc<dyn EventSink>,
    player: Arc<AlertPlayer>,
}

impl AlertingSink {
    pub fn new(inner: Arc<dyn EventSink>, player: Arc<AlertPlayer>) -> Self {
        Self { inner, player }
    }
}

impl EventSink for AlertingSink {
    fn on_frame(&self, frame: &Frame) {
        self.inner.on_frame(frame);
    }

    fn on_log(&self, message: &str, level: LogLevel) {
        self.inner.on_log(message, level);
    }

    fn on_alert(&self, message: &str, level: LogLevel) {
        if matches!(level, LogLevel::Warning | LogLevel::Error) {
            self.player.beep();
        }
        self.inner.on_alert(message, level);
    }

    fn on_error(&self, message: &str) {
        self.inner.on_error(message);
    }

    fn on_completed(&self, report: &SessionReport) {
        self.inner.on_completed(report);
    }
}
