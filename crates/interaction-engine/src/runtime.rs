//! Tokio host for an [`InteractionEngine`].
//!
//! One task owns the engine. Commands arrive over a bounded channel and the
//! task sleeps until the engine's next deadline in between.

use std::future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mutation_filter::{MutationRecord, MutationWatchRequest, WatchInfo};
use pagewire_core_types::{Category, Clock, SemanticEvent};
use serde_json::{Map, Value};
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::InteractionEngine;
use crate::errors::EngineError;
use crate::metrics::EngineStats;
use crate::raw::RawEvent;
use crate::subscription::Subscription;

/// Clock on tokio's timeline, so paused test time moves it too.
#[derive(Debug)]
pub struct TokioClock {
    origin: Instant,
    epoch_ms: i64,
}

impl TokioClock {
    pub fn new() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            epoch_ms,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.epoch_ms + self.origin.elapsed().as_millis() as i64
    }
}

enum Command {
    Start(Subscription),
    Stop,
    Raw(RawEvent),
    Mutations(Vec<MutationRecord>),
    Watch(
        MutationWatchRequest,
        oneshot::Sender<Result<WatchInfo, EngineError>>,
    ),
    Unwatch,
    Mark(String, Map<String, Value>),
    Buffer(
        Option<i64>,
        Option<Category>,
        oneshot::Sender<Vec<SemanticEvent>>,
    ),
    Stats(oneshot::Sender<EngineStats>),
}

/// Cloneable front door to a running engine.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| EngineError::RuntimeClosed)
    }

    pub async fn start(&self, subscription: Subscription) -> Result<(), EngineError> {
        self.send(Command::Start(subscription)).await
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        self.send(Command::Stop).await
    }

    pub async fn handle(&self, raw: RawEvent) -> Result<(), EngineError> {
        self.send(Command::Raw(raw)).await
    }

    pub async fn handle_mutations(&self, records: Vec<MutationRecord>) -> Result<(), EngineError> {
        self.send(Command::Mutations(records)).await
    }

    pub async fn watch_mutations(
        &self,
        request: MutationWatchRequest,
    ) -> Result<WatchInfo, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Watch(request, reply)).await?;
        rx.await.map_err(|_| EngineError::RuntimeClosed)?
    }

    pub async fn unwatch_mutations(&self) -> Result<(), EngineError> {
        self.send(Command::Unwatch).await
    }

    pub async fn mark(
        &self,
        label: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Result<(), EngineError> {
        self.send(Command::Mark(label.into(), payload)).await
    }

    pub async fn buffer(
        &self,
        since: Option<i64>,
        category: Option<Category>,
    ) -> Result<Vec<SemanticEvent>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Buffer(since, category, reply)).await?;
        rx.await.map_err(|_| EngineError::RuntimeClosed)
    }

    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats(reply)).await?;
        rx.await.map_err(|_| EngineError::RuntimeClosed)
    }
}

pub struct EngineRuntime {
    handle: EngineHandle,
    shutdown: CancellationToken,
    task: Option<JoinHandle<InteractionEngine>>,
}

impl EngineRuntime {
    /// Moves `engine` onto its own task. Must be called inside a tokio
    /// runtime.
    pub fn spawn(engine: InteractionEngine, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(engine, rx, shutdown.clone()));
        Self {
            handle: EngineHandle { tx },
            shutdown,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Stops the engine (flushing open aggregations) and hands it back.
    pub async fn shutdown(mut self) -> Option<InteractionEngine> {
        self.shutdown.cancel();
        let task = self.task.take()?;
        match task.await {
            Ok(engine) => Some(engine),
            Err(err) => {
                warn!(target: "interaction.engine", ?err, "engine task failed");
                None
            }
        }
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run(
    mut engine: InteractionEngine,
    mut rx: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
) -> InteractionEngine {
    debug!(target: "interaction.engine", "engine runtime started");
    loop {
        let wait = engine
            .next_deadline()
            .map(|at| Duration::from_millis((at - engine.now()).max(0) as u64));
        let timer = async move {
            match wait {
                Some(wait) => sleep(wait).await,
                None => future::pending::<()>().await,
            }
        };
        select! {
            _ = shutdown.cancelled() => {
                debug!(target: "interaction.engine", "engine runtime shutting down");
                rx.close();
                while let Ok(command) = rx.try_recv() {
                    apply(&mut engine, command);
                }
                break;
            }
            command = rx.recv() => {
                match command {
                    Some(command) => apply(&mut engine, command),
                    None => break,
                }
            }
            _ = timer => {
                engine.poll_timers();
            }
        }
    }
    engine.stop();
    debug!(target: "interaction.engine", "engine runtime exited");
    engine
}

fn apply(engine: &mut InteractionEngine, command: Command) {
    match command {
        Command::Start(subscription) => engine.start(subscription),
        Command::Stop => engine.stop(),
        Command::Raw(raw) => engine.handle(raw),
        Command::Mutations(records) => engine.handle_mutations(records),
        Command::Watch(request, reply) => {
            let _ = reply.send(engine.watch_mutations(request).map_err(EngineError::from));
        }
        Command::Unwatch => engine.unwatch_mutations(),
        Command::Mark(label, payload) => engine.mark(&label, payload),
        Command::Buffer(since, category, reply) => {
            let _ = reply.send(engine.buffer(since, category));
        }
        Command::Stats(reply) => {
            let _ = reply.send(engine.stats());
        }
    }
}
