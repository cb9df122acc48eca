//! Unified evaluation trigger.
//!
//! On-demand requests and the schedule ticker post into the same channel; a
//! single loop drains it, so runs never overlap.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use promptgate_state::EvaluationReport;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::domain::{PipelineError, Result};
use crate::orchestrator::EvaluationOrchestrator;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    RunNow,
    Scheduled,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RunNow => "run_now",
            Self::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum TriggerMessage {
    /// Run now and send the finished report back.
    RunNow {
        reply: oneshot::Sender<Result<EvaluationReport>>,
    },
    /// Posted by the schedule ticker.
    Scheduled,
}

impl TriggerMessage {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::RunNow { .. } => TriggerKind::RunNow,
            Self::Scheduled => TriggerKind::Scheduled,
        }
    }
}

/// Owns the orchestrator on behalf of the trigger loop.
pub struct EvaluationService {
    orchestrator: Arc<EvaluationOrchestrator>,
}

impl EvaluationService {
    pub fn new(orchestrator: Arc<EvaluationOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn run(&self, kind: TriggerKind) -> Result<EvaluationReport> {
        info!(event = "trigger.run_started", trigger = %kind);
        let result = self.orchestrator.run_evaluation(kind.as_str()).await;
        match &result {
            Ok(report) => info!(
                event = "trigger.run_finished",
                trigger = %kind,
                report_id = %report.report_id,
                passed = report.aggregate.pass,
            ),
            Err(err) => error!(
                event = "trigger.run_failed",
                trigger = %kind,
                error = %err,
            ),
        }
        result
    }

    async fn handle(&self, message: TriggerMessage) {
        let kind = message.kind();
        let result = self.run(kind).await;
        if let TriggerMessage::RunNow { reply } = message {
            if reply.send(result).is_err() {
                debug!("run_now caller went away before the report was ready");
            }
        }
    }
}

/// Client side of a running trigger loop.
pub struct TriggerHandle {
    tx: mpsc::Sender<TriggerMessage>,
    stop: watch::Sender<bool>,
}

impl TriggerHandle {
    /// Queue an immediate run and wait for its report.
    pub async fn run_now(&self) -> Result<EvaluationReport> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TriggerMessage::RunNow { reply })
            .await
            .map_err(|_| PipelineError::ServiceStopped)?;
        rx.await.map_err(|_| PipelineError::ServiceStopped)?
    }

    /// Stop the loop and the ticker. A run in progress finishes first.
    pub fn shutdown(&self) {
        self.stop.send_replace(true);
    }
}

/// Start the trigger loop, plus a ticker posting [`TriggerMessage::Scheduled`]
/// every `schedule` (the first tick comes one full period after start).
pub fn spawn(
    service: EvaluationService,
    schedule: Option<Duration>,
) -> (TriggerHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (stop, stop_rx) = watch::channel(false);

    if let Some(period) = schedule {
        let ticker_tx = tx.clone();
        let mut ticker_stop = stop_rx.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if ticker_tx.send(TriggerMessage::Scheduled).await.is_err() {
                            break;
                        }
                    }
                    _ = ticker_stop.changed() => break,
                }
            }
            debug!("schedule ticker stopped");
        });
        info!(event = "trigger.schedule_armed", period_secs = period.as_secs());
    }

    let mut loop_stop = stop_rx;
    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = loop_stop.changed() => break,
                message = rx.recv() => match message {
                    Some(message) => service.handle(message).await,
                    None => break,
                },
            }
        }
        info!(event = "trigger.stopped");
    });

    (TriggerHandle { tx, stop }, join)
}
