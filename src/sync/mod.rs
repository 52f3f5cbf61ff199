pub mod pipeline;
pub mod reconciler;
pub mod scheduler;

pub use pipeline::SyncService;
pub use scheduler::SyncScheduler;
