//! Per-session worker queues behind `dotbot serve`.
//!
//! Each session id gets one worker task fed by an unbounded channel, so a
//! session's lines apply in arrival order while different sessions run in
//! parallel. A worker that sees no input for the idle period closes its
//! channel, drains what was already queued and exits; the next line for that
//! session starts a fresh worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{DiagramEngine, Reply};
use crate::render::LayoutEngine;

/// Receives every reply with its input line number and session id.
pub type ReplySink = Arc<dyn Fn(usize, &str, &Reply) + Send + Sync>;

type Message = (usize, String);

struct Queue {
    tx: mpsc::UnboundedSender<Message>,
    worker: JoinHandle<()>,
}

/// Routes incoming lines to one worker per session.
pub struct SessionQueues<E> {
    engine: Arc<DiagramEngine<E>>,
    idle: Duration,
    sink: ReplySink,
    queues: HashMap<String, Queue>,
}

impl<E: LayoutEngine + 'static> SessionQueues<E> {
    /// Workers exit after `idle` without input.
    pub fn new(engine: Arc<DiagramEngine<E>>, idle: Duration, sink: ReplySink) -> Self {
        Self {
            engine,
            idle,
            sink,
            queues: HashMap::new(),
        }
    }

    /// Queue `text` for `session_id`, starting a worker if none is running.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn dispatch(&mut self, line_no: usize, session_id: &str, text: &str) {
        self.prune();

        let mut message = (line_no, text.to_string());
        if let Some(queue) = self.queues.get(session_id) {
            match queue.tx.send(message) {
                Ok(()) => return,
                // The worker went idle and closed its channel.
                Err(mpsc::error::SendError(returned)) => message = returned,
            }
        }

        let previous = self.queues.remove(session_id).map(|queue| queue.worker);
        let (tx, rx) = mpsc::unbounded_channel();
        // Cannot fail: `rx` is alive until the worker below drops it.
        let _ = tx.send(message);
        let worker = tokio::spawn(session_worker(
            self.engine.clone(),
            session_id.to_string(),
            rx,
            previous,
            self.idle,
            self.sink.clone(),
        ));
        self.queues
            .insert(session_id.to_string(), Queue { tx, worker });
    }

    /// Number of sessions with a live worker.
    pub fn active(&mut self) -> usize {
        self.prune();
        self.queues.len()
    }

    /// Close every queue and wait for the workers to drain.
    pub async fn finish(self) {
        let workers: Vec<_> = self
            .queues
            .into_values()
            .map(|queue| queue.worker)
            .collect();
        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Session worker failed: {e}");
            }
        }
    }

    fn prune(&mut self) {
        self.queues.retain(|id, queue| {
            let running = !queue.worker.is_finished();
            if !running {
                debug!("Dropped queue for idle session '{id}'");
            }
            running
        });
    }
}

async fn session_worker<E: LayoutEngine>(
    engine: Arc<DiagramEngine<E>>,
    session_id: String,
    mut rx: mpsc::UnboundedReceiver<Message>,
    previous: Option<JoinHandle<()>>,
    idle: Duration,
    sink: ReplySink,
) {
    // Lines the previous worker drained on its way out come first.
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            warn!("Session worker for '{session_id}' failed: {e}");
        }
    }

    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some((line_no, text))) => {
                let reply = engine.handle(&session_id, &text).await;
                sink(line_no, &session_id, &reply);
            }
            Ok(None) => return,
            Err(_) => break,
        }
    }

    rx.close();
    while let Some((line_no, text)) = rx.recv().await {
        let reply = engine.handle(&session_id, &text).await;
        sink(line_no, &session_id, &reply);
    }
    debug!(
        "Worker for session '{session_id}' idle for {}ms; exiting",
        idle.as_millis()
    );
}
