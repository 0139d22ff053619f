//! FIFO recap job queue and the worker loops draining it.
//!
//! Jobs from every guild share one unbounded queue. Each worker takes the
//! next job, locks that job's guild for the whole build-and-post and hands
//! it to a [`JobHandler`]. Failures and panics stop at the worker boundary:
//! they are reported to the requester and the loop moves on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{BotError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecapKind {
    /// Every week so far, posted with a navigator
    Manual,
    /// Current week only, posted as a plain message
    Scheduled,
}

/// Who is waiting on a job's outcome
#[derive(Clone)]
pub enum Requester {
    /// A deferred slash command; follow-ups use its interaction token
    Interaction { user_id: UserId, token: String },
    Scheduler,
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Requester::Interaction { user_id, .. } => {
                f.debug_struct("Interaction").field("user_id", user_id).finish_non_exhaustive()
            }
            Requester::Scheduler => f.write_str("Scheduler"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecapJob {
    pub id: Uuid,
    pub guild_id: GuildId,
    /// Overrides the guild's configured channel
    pub channel_id: Option<ChannelId>,
    pub requester: Requester,
    pub kind: RecapKind,
    pub enqueued_at: DateTime<Utc>,
}

impl RecapJob {
    pub fn manual(guild_id: GuildId, channel_id: Option<ChannelId>, requester: Requester) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            channel_id,
            requester,
            kind: RecapKind::Manual,
            enqueued_at: Utc::now(),
        }
    }

    pub fn scheduled(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            channel_id: Some(channel_id),
            requester: Requester::Scheduler,
            kind: RecapKind::Scheduled,
            enqueued_at: Utc::now(),
        }
    }
}

/// Processes one dequeued job
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn process(&self, job: &RecapJob) -> Result<()>;

    /// Tell the requester a job failed. Must not fail itself.
    async fn report_failure(&self, job: &RecapJob, error: &BotError);
}

/// Sending half of the queue, cheap to clone
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<RecapJob>,
    pending: Arc<AtomicUsize>,
}

/// Receiving half, owned by the worker pool
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<RecapJob>,
    pending: Arc<AtomicUsize>,
}

pub fn job_queue() -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        JobQueue {
            tx,
            pending: pending.clone(),
        },
        JobReceiver { rx, pending },
    )
}

impl JobQueue {
    /// Append a job; returns its 1-based position among waiting jobs
    pub fn enqueue(&self, job: RecapJob) -> Result<usize> {
        let position = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        let job_id = job.id;
        let guild_id = job.guild_id;
        if self.tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(BotError::Internal {
                message: "recap workers have shut down".to_string(),
            });
        }
        debug!("Queued job {} for guild {} at position {}", job_id, guild_id, position);
        Ok(position)
    }

    /// Jobs waiting for a worker
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl JobReceiver {
    async fn recv(&mut self) -> Option<RecapJob> {
        let job = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }
}

/// One mutex per guild, created on first use and kept for the process lifetime
#[derive(Default)]
pub struct GuildLocks {
    locks: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl GuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, guild_id: GuildId) -> Arc<Mutex<()>> {
        self.locks.entry(guild_id).or_default().clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Fixed set of worker loops sharing one receiver
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        workers: usize,
        receiver: JobReceiver,
        handler: Arc<dyn JobHandler>,
        locks: Arc<GuildLocks>,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..workers.max(1))
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    receiver.clone(),
                    handler.clone(),
                    locks.clone(),
                ))
            })
            .collect::<Vec<_>>();
        info!("Started {} recap worker(s)", handles.len());
        Self { handles }
    }

    #[cfg(test)]
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Workers exit once all queue senders are dropped.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Recap worker ended abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<JobReceiver>>,
    handler: Arc<dyn JobHandler>,
    locks: Arc<GuildLocks>,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            debug!("Recap worker {} stopping: queue closed", worker_id);
            break;
        };
        run_job(worker_id, &job, handler.as_ref(), &locks).await;
    }
}

async fn run_job(worker_id: usize, job: &RecapJob, handler: &dyn JobHandler, locks: &GuildLocks) {
    let guild_lock = locks.lock_for(job.guild_id);
    let _guard = guild_lock.lock().await;

    let waited = Utc::now().signed_duration_since(job.enqueued_at);
    info!(
        "Worker {} processing {:?} job {} for guild {} (queued {}ms)",
        worker_id,
        job.kind,
        job.id,
        job.guild_id,
        waited.num_milliseconds()
    );

    let outcome = AssertUnwindSafe(handler.process(job)).catch_unwind().await;
    match outcome {
        Ok(Ok(())) => {
            info!("Job {} for guild {} completed", job.id, job.guild_id);
        }
        Ok(Err(e)) => {
            warn!("Job {} for guild {} failed: {}", job.id, job.guild_id, e);
            handler.report_failure(job, &e).await;
        }
        Err(_) => {
            error!("Job {} for guild {} panicked", job.id, job.guild_id);
            let e = BotError::Internal {
                message: "the recap job crashed unexpectedly".to_string(),
            };
            handler.report_failure(job, &e).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Records processing order and per-guild overlap
    #[derive(Default)]
    struct RecordingHandler {
        order: std::sync::Mutex<Vec<Uuid>>,
        active: std::sync::Mutex<HashMap<GuildId, usize>>,
        max_overlap: AtomicUsize,
        failures: std::sync::Mutex<Vec<(Uuid, String)>>,
        fail_guild: Option<GuildId>,
        panic_guild: Option<GuildId>,
        delay: Duration,
    }

    #[async_trait]
    impl JobHandler for RecordingHandler {
        async fn process(&self, job: &RecapJob) -> Result<()> {
            {
                let mut active = self.active.lock().unwrap();
                let count = active.entry(job.guild_id).or_default();
                *count += 1;
                self.max_overlap.fetch_max(*count, Ordering::SeqCst);
            }
            tokio::time::sleep(self.delay).await;
            {
                let mut active = self.active.lock().unwrap();
                *active.entry(job.guild_id).or_default() -= 1;
            }
            self.order.lock().unwrap().push(job.id);

            if Some(job.guild_id) == self.panic_guild {
                panic!("handler blew up");
            }
            if Some(job.guild_id) == self.fail_guild {
                return Err(BotError::UpstreamFailure {
                    message: "league unavailable".to_string(),
                });
            }
            Ok(())
        }

        async fn report_failure(&self, job: &RecapJob, error: &BotError) {
            self.failures.lock().unwrap().push((job.id, error.to_string()));
        }
    }

    fn job(guild: u64) -> RecapJob {
        RecapJob::manual(
            GuildId::new(guild),
            None,
            Requester::Interaction {
                user_id: UserId::new(1),
                token: "token".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_single_worker_is_fifo() {
        let handler = Arc::new(RecordingHandler::default());
        let (queue, receiver) = job_queue();

        let jobs: Vec<RecapJob> = (1..=5).map(job).collect();
        let expected: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
        for (i, j) in jobs.into_iter().enumerate() {
            assert_eq!(queue.enqueue(j).unwrap(), i + 1);
        }
        assert_eq!(queue.pending(), 5);

        let pool = WorkerPool::spawn(1, receiver, handler.clone(), Arc::new(GuildLocks::new()));
        drop(queue);
        pool.join().await;

        assert_eq!(*handler.order.lock().unwrap(), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_guild_jobs_never_overlap() {
        let handler = Arc::new(RecordingHandler {
            delay: Duration::from_millis(20),
            ..Default::default()
        });
        let locks = Arc::new(GuildLocks::new());
        let (queue, receiver) = job_queue();

        for _ in 0..4 {
            queue.enqueue(job(7)).unwrap();
            queue.enqueue(job(8)).unwrap();
        }

        let pool = WorkerPool::spawn(3, receiver, handler.clone(), locks.clone());
        assert_eq!(pool.size(), 3);
        drop(queue);
        pool.join().await;

        assert_eq!(handler.order.lock().unwrap().len(), 8);
        assert_eq!(handler.max_overlap.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_guilds_run_concurrently() {
        struct BarrierHandler {
            barrier: tokio::sync::Barrier,
            met: AtomicUsize,
        }

        #[async_trait]
        impl JobHandler for BarrierHandler {
            async fn process(&self, _job: &RecapJob) -> Result<()> {
                if tokio::time::timeout(Duration::from_secs(2), self.barrier.wait())
                    .await
                    .is_ok()
                {
                    self.met.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            }

            async fn report_failure(&self, _job: &RecapJob, _error: &BotError) {}
        }

        let handler = Arc::new(BarrierHandler {
            barrier: tokio::sync::Barrier::new(2),
            met: AtomicUsize::new(0),
        });
        let (queue, receiver) = job_queue();
        queue.enqueue(job(1)).unwrap();
        queue.enqueue(job(2)).unwrap();

        let pool = WorkerPool::spawn(2, receiver, handler.clone(), Arc::new(GuildLocks::new()));
        drop(queue);
        pool.join().await;

        assert_eq!(handler.met.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_worker_continues() {
        let handler = Arc::new(RecordingHandler {
            fail_guild: Some(GuildId::new(13)),
            ..Default::default()
        });
        let (queue, receiver) = job_queue();

        let failing = job(13);
        let failing_id = failing.id;
        queue.enqueue(failing).unwrap();
        queue.enqueue(job(14)).unwrap();

        let pool = WorkerPool::spawn(1, receiver, handler.clone(), Arc::new(GuildLocks::new()));
        drop(queue);
        pool.join().await;

        assert_eq!(handler.order.lock().unwrap().len(), 2);
        let failures = handler.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, failing_id);
        assert!(failures[0].1.contains("league unavailable"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let handler = Arc::new(RecordingHandler {
            panic_guild: Some(GuildId::new(66)),
            ..Default::default()
        });
        let (queue, receiver) = job_queue();
        queue.enqueue(job(66)).unwrap();
        queue.enqueue(job(67)).unwrap();

        let pool = WorkerPool::spawn(1, receiver, handler.clone(), Arc::new(GuildLocks::new()));
        drop(queue);
        pool.join().await;

        assert_eq!(handler.order.lock().unwrap().len(), 2);
        assert_eq!(handler.failures.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_fails() {
        let (queue, receiver) = job_queue();
        drop(receiver);
        assert!(matches!(queue.enqueue(job(1)), Err(BotError::Internal { .. })));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_requester_debug_hides_token() {
        let requester = Requester::Interaction {
            user_id: UserId::new(5),
            token: "secret-token".to_string(),
        };
        assert!(!format!("{:?}", requester).contains("secret-token"));
    }
}
