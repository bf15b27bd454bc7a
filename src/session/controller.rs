use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::alert::{AlertPlayer, AlertingSink};
use crate::capture::FrameSource;
use crate::classify::Classifier;
use crate::config::InspectionConfig;
use crate::db::ResultStore;
use crate::plc::Actuator;

use super::events::EventSink;
use super::worker::{run_session, SessionOutcome};

const ENABLE_LOGS: bool = true;
use crate::log_info;

/// Supervises at most one running inspection session. The session body is
/// blocking (capture + inference), so it runs on a blocking worker; this
/// controller holds the join handle and the cancellation token, and refuses
/// to start a new session until the previous worker has terminated.
pub struct InspectionController {
    config: InspectionConfig,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn ResultStore>,
    actuator: Arc<dyn Actuator>,
    alert: Option<Arc<AlertPlayer>>,
    handle: Option<JoinHandle<SessionOutcome>>,
    cancel_token: Option<CancellationToken>,
}

impl InspectionController {
    pub fn new(
        config: InspectionConfig,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn ResultStore>,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        let alert = config
            .audible_alerts
            .then(|| Arc::new(AlertPlayer::new()));

        Self {
            config,
            classifier,
            store,
            actuator,
            alert,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn config(&self) -> &InspectionConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start a new session. Errors while a session is still running; a
    /// finished-but-unawaited handle is discarded (its outcome was already
    /// delivered through the sink).
    pub async fn start(
        &mut self,
        mut source: Box<dyn FrameSource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<String> {
        if self.is_running() {
            bail!("inspection already running");
        }
        self.handle = None;
        self.cancel_token = None;

        let session_id = Uuid::new_v4().to_string();
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let config = self.config.clone();
        let classifier = Arc::clone(&self.classifier);
        let store = Arc::clone(&self.store);
        let actuator = Arc::clone(&self.actuator);
        let sink = self.wrap_sink(sink);
        let id = session_id.clone();

        let handle = tokio::task::spawn_blocking(move || {
            run_session(
                &id,
                &config,
                source.as_mut(),
                classifier.as_ref(),
                store.as_ref(),
                actuator.as_ref(),
                sink.as_ref(),
                &token,
            )
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        log_info!("inspection session {session_id} started");
        Ok(session_id)
    }

    /// Cancel the running session (if any) and wait for its worker to
    /// terminate and release the frame source.
    pub async fn stop(&mut self) -> Result<Option<SessionOutcome>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => {
                let outcome = handle.await.context("inspection worker failed to join")?;
                Ok(Some(outcome))
            }
            None => Ok(None),
        }
    }

    /// Wait for the running session to end on its own (budget expiry).
    pub async fn wait(&mut self) -> Result<Option<SessionOutcome>> {
        self.cancel_token = None;
        match self.handle.take() {
            Some(handle) => Ok(Some(
                handle.await.context("inspection worker failed to join")?,
            )),
            None => Ok(None),
        }
    }

    /// The "try again" workflow: discard the most recently stored record,
    /// then immediately start a fresh session. Errors when the store holds
    /// no records.
    pub async fn try_again(
        &mut self,
        source: Box<dyn FrameSource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<String> {
        if self.is_running() {
            bail!("inspection already running");
        }

        let discarded = self
            .store
            .delete_most_recent()
            .context("failed to discard most recent record")?;
        log_info!("discarded record {discarded}, starting a new session");

        self.start(source, sink).await
    }

    fn wrap_sink(&self, sink: Arc<dyn EventSink>) -> Arc<dyn EventSink> {
        match &self.alert {
            Some(player) => Arc::new(AlertingSink::new(sink, Arc::clone(player))),
            None => sink,
        }
    }
}
