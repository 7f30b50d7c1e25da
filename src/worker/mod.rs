//! The offline router: route table, lifecycle, strategies and event loop

pub mod dispatch;
pub mod notification;
pub mod router;
pub mod routes;
pub mod state;

pub use dispatch::WorkerHandle;
pub use notification::{ClickOutcome, NotificationClick};
pub use router::{CacheRouter, FetchOutcome, ResponseSource, RouterSettings};
pub use state::{WorkerRecord, WorkerState};
