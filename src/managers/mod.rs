pub mod gate;
pub mod job_queue;
pub mod recap_service;

pub use gate::{create_shared_gate, SharedGate};
pub use job_queue::{job_queue, GuildLocks, JobQueue, WorkerPool};
pub use recap_service::RecapService;
