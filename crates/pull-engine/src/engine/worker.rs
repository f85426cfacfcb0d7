use std::sync::Weak;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use super::EngineInner;
use super::registry::JobQueue;
use crate::cache::ResourceKey;
use crate::job::FetchJob;

/// Start the single worker that runs every job queued for `key`, one at a time.
///
/// `previous` is the worker of an earlier registration of the same key; the
/// new worker does not start until it has finished.
pub(crate) fn spawn_queue(
    runtime: &Handle,
    engine: Weak<EngineInner>,
    key: ResourceKey,
    generation: u64,
    previous: Option<JoinHandle<()>>,
) -> JobQueue {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = runtime.spawn(run_queue(engine, key, generation, rx, previous));
    JobQueue { tx, handle }
}

async fn run_queue(
    engine: Weak<EngineInner>,
    key: ResourceKey,
    generation: u64,
    mut rx: mpsc::UnboundedReceiver<FetchJob>,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        trace!(%key, "waiting for previous worker to drain");
        let _ = previous.await;
    }

    while let Some(job) = rx.recv().await {
        let Some(engine) = engine.upgrade() else {
            break;
        };
        engine.process(job, generation).await;
    }

    trace!(%key, generation, "job queue closed");
}
